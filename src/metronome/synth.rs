// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Click tone selection and scheduling.

use std::sync::Arc;

use crate::audio::{AudioDevice, ScheduledTone, Tone};

use super::reporter::BeatReporter;
use super::tempo::{Subdivision, TempoState};

/// First sub-beat of the measure
pub const ACCENT_TONE: Tone = Tone {
    frequency: 1500.0,
    duration: 0.06,
    amplitude: 1.0,
};

/// Other main beats
pub const MAIN_TONE: Tone = Tone {
    frequency: 800.0,
    duration: 0.03,
    amplitude: 0.4,
};

/// Eighth and sixteenth ticks between main beats
pub const SUB_TONE: Tone = Tone {
    frequency: 1200.0,
    duration: 0.02,
    amplitude: 0.2,
};

/// How a sub-beat sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneKind {
    /// Downbeat of the measure
    Accent,
    /// Any other main beat
    Main,
    /// A subdivision tick
    Sub,
}

impl ToneKind {
    /// Classify a sub-beat index within the measure
    pub fn classify(sub_beat: u32, subdivision: Subdivision) -> Self {
        if sub_beat == 0 {
            ToneKind::Accent
        } else if sub_beat % subdivision.ticks_per_beat() == 0 {
            ToneKind::Main
        } else {
            ToneKind::Sub
        }
    }

    /// The tone played for this kind
    pub fn tone(self) -> Tone {
        match self {
            ToneKind::Accent => ACCENT_TONE,
            ToneKind::Main => MAIN_TONE,
            ToneKind::Sub => SUB_TONE,
        }
    }

    /// Accent and main beats drive the beat indicator
    pub fn is_main_beat(self) -> bool {
        !matches!(self, ToneKind::Sub)
    }
}

/// Turns sub-beats into tones on the device timeline.
///
/// The tone is pinned to `target_time`, not to the moment this is called.
/// Main beats also schedule an indicator update for the same instant.
pub struct ToneSynthesizer {
    device: Arc<dyn AudioDevice>,
    reporter: BeatReporter,
}

impl ToneSynthesizer {
    pub fn new(device: Arc<dyn AudioDevice>, reporter: BeatReporter) -> Self {
        Self { device, reporter }
    }

    /// Schedule the tone for `sub_beat` at `target_time` seconds
    pub fn schedule_tone(&self, sub_beat: u32, target_time: f64, tempo: &TempoState) -> ToneKind {
        let subdivision = tempo.subdivision();
        let kind = ToneKind::classify(sub_beat, subdivision);

        self.device
            .play(ScheduledTone::new(kind.tone(), target_time));

        if kind.is_main_beat() {
            let beat = sub_beat / subdivision.ticks_per_beat();
            self.reporter.report(beat, target_time, self.device.now());
        }

        kind
    }
}

impl std::fmt::Debug for ToneSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToneSynthesizer")
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}
