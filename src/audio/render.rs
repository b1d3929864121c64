// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Click tone rendering.
//!
//! Each tone is a sine with a sharp attack and an exponential decay down to
//! [`ENVELOPE_FLOOR`] over its duration. Voices are positioned by absolute
//! frame index on the device clock, so a tone lands on the same sample no
//! matter which block it was queued in.

use std::f64::consts::TAU;
use std::sync::mpsc::Receiver;

/// Level the envelope decays to at the end of a tone
pub const ENVELOPE_FLOOR: f32 = 0.001;

/// Initial voice capacity, enough for several bars of sixteenths at 300 BPM
const VOICE_CAPACITY: usize = 64;

/// A short enveloped sine tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Frequency in Hz
    pub frequency: f32,
    /// Duration in seconds
    pub duration: f64,
    /// Peak amplitude, relative (1.0 = loudest click)
    pub amplitude: f32,
}

/// A tone pinned to a start time on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTone {
    /// The tone to play
    pub tone: Tone,
    /// Clock time in seconds at which the tone starts
    pub start: f64,
}

impl ScheduledTone {
    /// Create a scheduled tone
    pub fn new(tone: Tone, start: f64) -> Self {
        Self { tone, start }
    }

    /// Clock time at which the tone stops
    pub fn end(&self) -> f64 {
        self.start + self.tone.duration
    }
}

/// A tone being rendered
#[derive(Debug, Clone)]
struct Voice {
    start_frame: u64,
    end_frame: u64,
    /// Phase increment per frame
    phase_step: f64,
    amplitude: f64,
    /// Natural-log decay per frame
    decay: f64,
}

impl Voice {
    fn new(scheduled: &ScheduledTone, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        let start_frame = (scheduled.start.max(0.0) * rate).round() as u64;
        let length = ((scheduled.tone.duration * rate).round() as u64).max(1);
        let amplitude = scheduled.tone.amplitude as f64;

        let decay = if amplitude > ENVELOPE_FLOOR as f64 {
            (ENVELOPE_FLOOR as f64 / amplitude).ln() / length as f64
        } else {
            0.0
        };

        Self {
            start_frame,
            end_frame: start_frame + length,
            phase_step: TAU * scheduled.tone.frequency as f64 / rate,
            amplitude,
            decay,
        }
    }

    #[inline]
    fn sample(&self, frame: u64) -> f64 {
        if frame < self.start_frame || frame >= self.end_frame {
            return 0.0;
        }
        let n = (frame - self.start_frame) as f64;
        self.amplitude * (self.decay * n).exp() * (self.phase_step * n).sin()
    }
}

/// Mixes scheduled click tones into output buffers.
///
/// Runs on the audio thread. New tones arrive through an optional channel
/// and are picked up at the start of every block.
#[derive(Debug)]
pub struct ClickRenderer {
    sample_rate: u32,
    voices: Vec<Voice>,
    incoming: Option<Receiver<ScheduledTone>>,
}

impl ClickRenderer {
    /// Create a renderer with no input channel
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            voices: Vec::with_capacity(VOICE_CAPACITY),
            incoming: None,
        }
    }

    /// Create a renderer fed by a channel of scheduled tones
    pub fn with_receiver(sample_rate: u32, incoming: Receiver<ScheduledTone>) -> Self {
        Self {
            incoming: Some(incoming),
            ..Self::new(sample_rate)
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Add a tone directly
    pub fn add(&mut self, tone: ScheduledTone) {
        self.voices.push(Voice::new(&tone, self.sample_rate));
    }

    /// Number of voices not yet finished
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn drain_incoming(&mut self) {
        let Some(incoming) = self.incoming.as_ref() else {
            return;
        };
        let sample_rate = self.sample_rate;
        self.voices
            .extend(incoming.try_iter().map(|tone| Voice::new(&tone, sample_rate)));
    }

    /// Render one interleaved block starting at absolute frame `block_start`.
    ///
    /// The mix is added to whatever is already in `buffer`, scaled by
    /// `master_gain` and clamped to [-1, 1].
    pub fn render(&mut self, buffer: &mut [f32], channels: usize, block_start: u64, master_gain: f32) {
        self.drain_incoming();

        let channels = channels.max(1);
        let frames = buffer.len() / channels;
        let gain = master_gain as f64;

        if !self.voices.is_empty() {
            for (i, frame) in buffer.chunks_mut(channels).enumerate() {
                let position = block_start + i as u64;
                let mixed: f64 = self.voices.iter().map(|v| v.sample(position)).sum();
                let value = (mixed * gain) as f32;
                for sample in frame.iter_mut() {
                    *sample = (*sample + value).clamp(-1.0, 1.0);
                }
            }
        }

        let block_end = block_start + frames as u64;
        self.voices.retain(|v| v.end_frame > block_end);
    }
}
