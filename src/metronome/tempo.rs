// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo and meter state.
//!
//! Out-of-range input is never an error: every setter clamps to the nearest
//! valid value and stores that.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Slowest supported tempo
pub const MIN_BPM: u32 = 30;
/// Fastest supported tempo
pub const MAX_BPM: u32 = 300;
/// Tempo at engine creation
pub const DEFAULT_BPM: u32 = 120;

/// Quietest volume
pub const MIN_VOLUME: f32 = 0.0;
/// Loudest volume
pub const MAX_VOLUME: f32 = 1.0;
/// Volume at engine creation
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Master gain multiplier, so full volume is genuinely loud
pub const VOLUME_BOOST: f32 = 3.0;

/// Clamp any integer tempo into the supported range
pub fn clamp_bpm(bpm: i64) -> u32 {
    bpm.clamp(MIN_BPM as i64, MAX_BPM as i64) as u32
}

/// Clamp a volume into [0, 1]. NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        MIN_VOLUME
    } else {
        volume.clamp(MIN_VOLUME, MAX_VOLUME)
    }
}

/// Supported time signatures.
///
/// Deserializing unknown notation yields 4/4 instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum TimeSignature {
    #[default]
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "3/4")]
    ThreeFour,
    #[serde(rename = "6/8")]
    SixEight,
    #[serde(rename = "2/4")]
    TwoFour,
}

impl TimeSignature {
    /// All signatures, in display order
    pub const ALL: [TimeSignature; 4] = [
        TimeSignature::FourFour,
        TimeSignature::ThreeFour,
        TimeSignature::SixEight,
        TimeSignature::TwoFour,
    ];

    /// Main beats per measure
    pub fn beats(self) -> u32 {
        match self {
            TimeSignature::FourFour => 4,
            TimeSignature::ThreeFour => 3,
            TimeSignature::SixEight => 6,
            TimeSignature::TwoFour => 2,
        }
    }

    /// Notation, e.g. "6/8"
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSignature::FourFour => "4/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::SixEight => "6/8",
            TimeSignature::TwoFour => "2/4",
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown time signature text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported time signature: {0}")]
pub struct ParseTimeSignatureError(pub String);

impl FromStr for TimeSignature {
    type Err = ParseTimeSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TimeSignature::ALL
            .into_iter()
            .find(|ts| ts.as_str() == s)
            .ok_or_else(|| ParseTimeSignatureError(s.to_string()))
    }
}

impl From<String> for TimeSignature {
    fn from(text: String) -> Self {
        text.parse().unwrap_or_else(|e: ParseTimeSignatureError| {
            warn!("{}, using {}", e, TimeSignature::default());
            TimeSignature::default()
        })
    }
}

/// Ticks per main beat.
///
/// Deserializing any other count picks the nearest supported one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub enum Subdivision {
    /// Quarter notes
    #[default]
    Quarter,
    /// Eighth notes
    Eighth,
    /// Sixteenth notes
    Sixteenth,
}

impl Subdivision {
    /// Sub-beats per main beat
    pub fn ticks_per_beat(self) -> u32 {
        match self {
            Subdivision::Quarter => 1,
            Subdivision::Eighth => 2,
            Subdivision::Sixteenth => 4,
        }
    }

    /// Next finer subdivision, wrapping back to quarters
    pub fn next(self) -> Self {
        match self {
            Subdivision::Quarter => Subdivision::Eighth,
            Subdivision::Eighth => Subdivision::Sixteenth,
            Subdivision::Sixteenth => Subdivision::Quarter,
        }
    }

    /// Closest supported subdivision; 3 rounds down to eighths
    pub fn nearest(ticks: i64) -> Self {
        match ticks {
            i64::MIN..=1 => Subdivision::Quarter,
            2..=3 => Subdivision::Eighth,
            _ => Subdivision::Sixteenth,
        }
    }

    /// Short label for display
    pub fn label(self) -> &'static str {
        match self {
            Subdivision::Quarter => "1/4",
            Subdivision::Eighth => "1/8",
            Subdivision::Sixteenth => "1/16",
        }
    }
}

/// Subdivision other than 1, 2 or 4
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported subdivision: {0} (expected 1, 2 or 4)")]
pub struct InvalidSubdivision(pub u32);

impl TryFrom<u32> for Subdivision {
    type Error = InvalidSubdivision;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Subdivision::Quarter),
            2 => Ok(Subdivision::Eighth),
            4 => Ok(Subdivision::Sixteenth),
            other => Err(InvalidSubdivision(other)),
        }
    }
}

impl From<i64> for Subdivision {
    fn from(ticks: i64) -> Self {
        let nearest = Subdivision::nearest(ticks);
        if ticks != nearest.ticks_per_beat() as i64 {
            warn!("Unsupported subdivision {}, using {}", ticks, nearest.ticks_per_beat());
        }
        nearest
    }
}

impl From<Subdivision> for u32 {
    fn from(value: Subdivision) -> Self {
        value.ticks_per_beat()
    }
}

/// Live tempo, meter, subdivision and volume.
///
/// The scheduler reads this on every loop iteration, never a copy taken
/// earlier, so a change applies from the next unscheduled sub-beat on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoState {
    bpm: u32,
    time_signature: TimeSignature,
    subdivision: Subdivision,
    volume: f32,
}

impl TempoState {
    /// Default state: 120 BPM, 4/4, quarters, half volume
    pub fn new() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            time_signature: TimeSignature::FourFour,
            subdivision: Subdivision::Quarter,
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Store the tempo clamped to 30..=300; returns the stored value
    pub fn set_bpm(&mut self, bpm: i64) -> u32 {
        self.bpm = clamp_bpm(bpm);
        self.bpm
    }

    /// Store the volume clamped to [0, 1]; returns the stored value
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        self.volume
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
    }

    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.subdivision = subdivision;
    }

    /// Gain applied to the output: volume × boost
    pub fn output_gain(&self) -> f32 {
        self.volume * VOLUME_BOOST
    }

    /// Sub-beats in one measure
    pub fn total_sub_beats(&self) -> u32 {
        self.time_signature.beats() * self.subdivision.ticks_per_beat()
    }

    /// Distance between consecutive sub-beats, in seconds
    pub fn seconds_per_sub_beat(&self) -> f64 {
        60.0 / self.bpm as f64 / self.subdivision.ticks_per_beat() as f64
    }
}

impl Default for TempoState {
    fn default() -> Self {
        Self::new()
    }
}
