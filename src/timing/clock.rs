// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio clock implementation.
//!
//! All metronome scheduling is expressed in seconds on a clock that is
//! advanced by the audio device itself, one rendered block at a time.
//! Wall-clock timers are only used to wake the scheduler up; they never
//! decide when a click sounds.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::audio::AudioError;

/// Lifecycle state of an audio clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Created but not yet allowed to produce sound
    Suspended,
    /// Advancing with the audio hardware
    Running,
    /// Released; cannot be resumed
    Closed,
}

impl ClockState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClockState::Suspended,
            1 => ClockState::Running,
            _ => ClockState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ClockState::Suspended => 0,
            ClockState::Running => 1,
            ClockState::Closed => 2,
        }
    }
}

/// A monotonic, audio-backed time reference.
///
/// Implementations must never go backwards. Time only advances while the
/// clock is [`ClockState::Running`].
pub trait ClockSource: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> f64;

    /// Current lifecycle state
    fn state(&self) -> ClockState;

    /// Allow the clock to run. No-op if already running.
    fn resume(&self) -> Result<(), AudioError>;

    /// Release the clock. Further resumes fail.
    fn close(&self);
}

/// Clock driven by a count of rendered audio frames.
///
/// The audio callback calls [`FrameClock::advance`] after every block it
/// renders, so `now()` has the granularity of one block.
#[derive(Debug)]
pub struct FrameClock {
    /// Frames rendered since creation
    frames: AtomicU64,
    /// Sample rate in Hz
    sample_rate: u32,
    /// Encoded [`ClockState`]
    state: AtomicU8,
}

impl FrameClock {
    /// Create a suspended clock at frame zero
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: sample_rate.max(1),
            state: AtomicU8::new(ClockState::Suspended.as_u8()),
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Advance by a rendered block. Ignored unless running.
    pub fn advance(&self, frames: u64) {
        if self.state() == ClockState::Running {
            self.frames.fetch_add(frames, Ordering::AcqRel);
        }
    }

    /// Convert a clock time to an absolute frame index
    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

impl ClockSource for FrameClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    fn state(&self) -> ClockState {
        ClockState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn resume(&self) -> Result<(), AudioError> {
        let result = self.state.compare_exchange(
            ClockState::Suspended.as_u8(),
            ClockState::Running.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        match result {
            Ok(_) => Ok(()),
            Err(current) if ClockState::from_u8(current) == ClockState::Running => Ok(()),
            Err(_) => Err(AudioError::Closed),
        }
    }

    fn close(&self) {
        self.state.store(ClockState::Closed.as_u8(), Ordering::Release);
    }
}
