// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! The output stream runs for the lifetime of [`AudioOutput`]. While the
//! device clock is suspended the callback writes silence and the clock stays
//! put; once resumed, every rendered block advances the clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::render::{ClickRenderer, ScheduledTone};
use super::{AudioError, ToneOutput};
use crate::timing::{ClockSource, ClockState, FrameClock};

/// Audio output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz (0 = device default)
    pub sample_rate: u32,
    /// Buffer size in frames (None = device default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
    /// Number of output channels
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            buffer_size: None,
            channels: 2,
        }
    }
}

impl AudioConfig {
    /// Buffer size clamped to what the stream accepts
    pub fn clamped_buffer_size(&self) -> Option<u32> {
        self.buffer_size.map(|size| size.clamp(64, 4096))
    }
}

/// The shared side of a cpal output: clock, tone queue and master gain.
///
/// Safe to hand to the scheduler thread; the stream itself stays with
/// [`AudioOutput`].
#[derive(Debug)]
pub struct ClickDevice {
    clock: FrameClock,
    tones: Sender<ScheduledTone>,
    /// f32 bits
    gain: AtomicU32,
}

impl ClickDevice {
    fn new(sample_rate: u32, tones: Sender<ScheduledTone>) -> Self {
        Self {
            clock: FrameClock::new(sample_rate),
            tones,
            gain: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Sample rate of the running stream
    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    /// Render callback body: fill `data`, then advance the clock
    fn fill(&self, renderer: &mut ClickRenderer, data: &mut [f32], channels: usize) {
        data.fill(0.0);
        if self.clock.state() != ClockState::Running {
            return;
        }
        let frames = (data.len() / channels.max(1)) as u64;
        renderer.render(data, channels, self.clock.frames(), self.master_gain());
        self.clock.advance(frames);
    }
}

impl ClockSource for ClickDevice {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> ClockState {
        self.clock.state()
    }

    fn resume(&self) -> Result<(), AudioError> {
        self.clock.resume()
    }

    fn close(&self) {
        self.clock.close();
    }
}

impl ToneOutput for ClickDevice {
    fn play(&self, tone: ScheduledTone) {
        if self.tones.send(tone).is_err() {
            debug!("Audio stream gone, dropping tone at {:.3}s", tone.start);
        }
    }

    fn set_master_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Release);
    }

    fn master_gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }
}

/// Audio output stream
pub struct AudioOutput {
    /// cpal stream
    _stream: Stream,
    /// Output device
    _device: Device,
    /// Shared clock and tone queue
    click: Arc<ClickDevice>,
    /// Configuration actually in use
    config: AudioConfig,
}

impl AudioOutput {
    /// Open the default output device and start a suspended click stream
    pub fn open(config: AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::InitFailed(format!("Failed to get default config: {}", e)))?;

        let sample_rate = if config.sample_rate == 0 {
            supported.sample_rate().0
        } else {
            config.sample_rate
        };

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: match config.clamped_buffer_size() {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let channels = config.channels as usize;
        let (tx, rx) = mpsc::channel();
        let click = Arc::new(ClickDevice::new(sample_rate, tx));
        let mut renderer = ClickRenderer::with_receiver(sample_rate, rx);

        let callback_device = Arc::clone(&click);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_device.fill(&mut renderer, data, channels);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None, // No timeout
            )
            .map_err(|e| AudioError::StreamFailed(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("Failed to start stream: {}", e)))?;

        info!(
            "Audio output open: {} Hz, {} channels, buffer {:?}",
            sample_rate, channels, stream_config.buffer_size
        );

        Ok(Self {
            _stream: stream,
            _device: device,
            click,
            config: AudioConfig {
                sample_rate,
                ..config
            },
        })
    }

    /// Shared clock and tone queue for the metronome
    pub fn device(&self) -> Arc<ClickDevice> {
        Arc::clone(&self.click)
    }

    /// Get current configuration
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Calculate latency in milliseconds, if the buffer size is fixed
    pub fn latency_ms(&self) -> Option<f64> {
        self.config
            .clamped_buffer_size()
            .map(|frames| frames as f64 / self.config.sample_rate as f64 * 1000.0)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.click.close();
    }
}

/// List available audio output devices
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Get default device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}
