// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio layer for the click track.
//!
//! This module provides:
//! - Enveloped sine tones scheduled at exact clock times
//! - Audio output via cpal, with the device's frame count as the clock
//! - An offline device that records instead of playing, for tests

pub mod offline;
pub mod output;
pub mod render;

pub use offline::OfflineDevice;
pub use output::{AudioConfig, AudioOutput, ClickDevice};
pub use render::{ClickRenderer, ScheduledTone, Tone, ENVELOPE_FLOOR};

use std::sync::Arc;

use thiserror::Error;

use crate::timing::ClockSource;

/// Destination for scheduled tones.
///
/// Scheduling only hands the tone over; rendering happens later on the
/// audio thread, at the tone's own start time.
pub trait ToneOutput: Send + Sync {
    /// Queue a tone for playback at `tone.start`
    fn play(&self, tone: ScheduledTone);

    /// Set the output gain applied after all tones are mixed
    fn set_master_gain(&self, gain: f32);

    /// Current output gain
    fn master_gain(&self) -> f32;
}

/// A clock and a tone output sharing one audio timeline
pub trait AudioDevice: ClockSource + ToneOutput {}

impl<T: ClockSource + ToneOutput> AudioDevice for T {}

/// Audio error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudioError {
    /// Failed to initialize audio
    #[error("Audio initialization failed: {0}")]
    InitFailed(String),
    /// Failed to start audio stream
    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,
    /// Device was released
    #[error("Audio device has been closed")]
    Closed,
}

/// The device a session plays through.
///
/// Owns the cpal stream when one opened; otherwise falls back to an
/// [`OfflineDevice`] so the session keeps running without sound.
pub struct AudioBackend {
    device: Arc<dyn AudioDevice>,
    output: Option<AudioOutput>,
    offline: Option<Arc<OfflineDevice>>,
    error: Option<AudioError>,
}

impl AudioBackend {
    /// Silent backend on an offline clock
    pub fn simulated() -> Self {
        let offline = Arc::new(OfflineDevice::new());
        Self {
            device: offline.clone(),
            output: None,
            offline: Some(offline),
            error: None,
        }
    }

    /// Use an opened stream, or fall back to a silent one if it failed
    pub fn from_output(opened: Result<AudioOutput, AudioError>) -> Self {
        match opened {
            Ok(output) => Self {
                device: output.device(),
                output: Some(output),
                offline: None,
                error: None,
            },
            Err(e) => {
                tracing::error!("Audio initialization failed, continuing without sound: {}", e);
                Self {
                    error: Some(e),
                    ..Self::simulated()
                }
            }
        }
    }

    /// Open the configured output device
    pub fn open(config: AudioConfig) -> Self {
        Self::from_output(AudioOutput::open(config))
    }

    pub fn device(&self) -> Arc<dyn AudioDevice> {
        Arc::clone(&self.device)
    }

    /// Why the real device could not be used, if it could not
    pub fn error(&self) -> Option<&AudioError> {
        self.error.as_ref()
    }

    /// True when no sound reaches the speakers
    pub fn is_silent(&self) -> bool {
        self.output.is_none()
    }

    /// Move the offline clock forward. No-op on a real device.
    pub fn advance(&self, seconds: f64) {
        if let Some(offline) = &self.offline {
            offline.advance(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ClockState;

    #[test]
    fn test_error_messages() {
        assert_eq!(AudioError::NoDevice.to_string(), "No audio device available");
        assert_eq!(
            AudioError::InitFailed("blocked".to_string()).to_string(),
            "Audio initialization failed: blocked"
        );
    }

    #[test]
    fn test_failed_output_falls_back_to_offline() {
        let backend = AudioBackend::from_output(Err(AudioError::NoDevice));
        assert_eq!(backend.error(), Some(&AudioError::NoDevice));
        assert!(backend.is_silent());

        let device = backend.device();
        assert_eq!(device.state(), ClockState::Suspended);
        device.resume().unwrap();
        backend.advance(0.5);
        assert!((device.now() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_simulated_backend() {
        let backend = AudioBackend::simulated();
        assert!(backend.error().is_none());
        assert!(backend.is_silent());
    }
}
