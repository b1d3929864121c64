// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline audio device.
//!
//! Records scheduled tones instead of playing them. Its clock only moves
//! when [`OfflineDevice::advance`] is called, which makes scheduling fully
//! deterministic for tests, benchmarks and dry runs. Only the most recent
//! [`DEFAULT_HISTORY`] tones and gain changes are kept.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use super::render::ScheduledTone;
use super::{AudioError, ToneOutput};
use crate::timing::{ClockSource, ClockState};

/// A recording device with a manually advanced clock
#[derive(Debug)]
pub struct OfflineDevice {
    /// f64 bits of the current time in seconds
    now: AtomicU64,
    state: AtomicU8,
    /// f32 bits
    gain: AtomicU32,
    tones: Mutex<VecDeque<ScheduledTone>>,
    gain_changes: Mutex<VecDeque<f32>>,
    history: usize,
    /// When set, `resume` fails as a blocked device would
    blocked: bool,
}

/// Recorded entries kept per list before the oldest are dropped
pub const DEFAULT_HISTORY: usize = 4096;

const SUSPENDED: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

impl OfflineDevice {
    /// Create a suspended device at time zero
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Create a device that keeps at most `history` tones and gain changes
    pub fn with_history(history: usize) -> Self {
        let history = history.max(1);
        Self {
            now: AtomicU64::new(0.0f64.to_bits()),
            state: AtomicU8::new(SUSPENDED),
            gain: AtomicU32::new(0.0f32.to_bits()),
            tones: Mutex::new(VecDeque::new()),
            gain_changes: Mutex::new(VecDeque::new()),
            history,
            blocked: false,
        }
    }

    /// Create a device whose resume always fails
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::new()
        }
    }

    /// Move the clock forward. Ignored unless running.
    pub fn advance(&self, seconds: f64) {
        if self.state() != ClockState::Running || seconds <= 0.0 {
            return;
        }
        let next = self.now() + seconds;
        self.now.store(next.to_bits(), Ordering::Release);
    }

    /// Recorded tones, oldest first
    pub fn tones(&self) -> Vec<ScheduledTone> {
        self.tones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Remove and return the recorded tones
    pub fn take_tones(&self) -> Vec<ScheduledTone> {
        self.tones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Recorded master gain values, oldest first
    pub fn gain_changes(&self) -> Vec<f32> {
        self.gain_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }
}

fn push_bounded<T>(list: &Mutex<VecDeque<T>>, limit: usize, item: T) {
    let mut list = list.lock().unwrap_or_else(PoisonError::into_inner);
    while list.len() >= limit {
        list.pop_front();
    }
    list.push_back(item);
}

impl Default for OfflineDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for OfflineDevice {
    fn now(&self) -> f64 {
        f64::from_bits(self.now.load(Ordering::Acquire))
    }

    fn state(&self) -> ClockState {
        match self.state.load(Ordering::Acquire) {
            SUSPENDED => ClockState::Suspended,
            RUNNING => ClockState::Running,
            _ => ClockState::Closed,
        }
    }

    fn resume(&self) -> Result<(), AudioError> {
        if self.blocked {
            return Err(AudioError::InitFailed(
                "audio output blocked until user interaction".to_string(),
            ));
        }
        match self.state() {
            ClockState::Closed => Err(AudioError::Closed),
            _ => {
                self.state.store(RUNNING, Ordering::Release);
                Ok(())
            }
        }
    }

    fn close(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }
}

impl ToneOutput for OfflineDevice {
    fn play(&self, tone: ScheduledTone) {
        push_bounded(&self.tones, self.history, tone);
    }

    fn set_master_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Release);
        push_bounded(&self.gain_changes, self.history, gain);
    }

    fn master_gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Tone;

    #[test]
    fn test_clock_frozen_until_resumed() {
        let device = OfflineDevice::new();
        device.advance(1.0);
        assert_eq!(device.now(), 0.0);

        device.resume().unwrap();
        device.advance(0.25);
        device.advance(0.25);
        assert!((device.now() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_records_tones_and_gain() {
        let device = OfflineDevice::new();
        let tone = ScheduledTone::new(
            Tone {
                frequency: 800.0,
                duration: 0.03,
                amplitude: 0.4,
            },
            1.0,
        );
        device.play(tone);
        device.set_master_gain(1.5);

        assert_eq!(device.tones(), vec![tone]);
        assert_eq!(device.master_gain(), 1.5);
        assert_eq!(device.gain_changes(), vec![1.5]);

        assert_eq!(device.take_tones().len(), 1);
        assert!(device.tones().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let device = OfflineDevice::with_history(3);
        for i in 0..10 {
            device.play(ScheduledTone::new(
                Tone {
                    frequency: 800.0,
                    duration: 0.03,
                    amplitude: 0.4,
                },
                i as f64,
            ));
            device.set_master_gain(i as f32);
        }

        let starts: Vec<f64> = device.tones().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![7.0, 8.0, 9.0]);
        assert_eq!(device.gain_changes(), vec![7.0, 8.0, 9.0]);
        assert_eq!(device.master_gain(), 9.0);
    }

    #[test]
    fn test_blocked_device_fails_resume() {
        let device = OfflineDevice::blocked();
        assert!(device.resume().is_err());
        assert_eq!(device.state(), ClockState::Suspended);
    }

    #[test]
    fn test_closed_device() {
        let device = OfflineDevice::new();
        device.close();
        assert_eq!(device.resume(), Err(AudioError::Closed));
    }
}
