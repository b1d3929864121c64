// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Post-processing of raw tempo analysis.
//!
//! Analysers often lock onto double time, so a result above 200 BPM is
//! halved when the half lands in a plausible 60..=180 range. This applies
//! to analysis only; tapped and typed tempos are just clamped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DetectionError;
use crate::metronome::clamp_bpm;

/// Tempos above this are treated as possible double-time detections
pub const DOUBLE_TIME_THRESHOLD: u32 = 200;
/// Accepted range for a halved tempo
pub const HALVED_RANGE: std::ops::RangeInclusive<u32> = 60..=180;
/// Confidence penalty applied after halving
pub const HALVING_PENALTY: f64 = 0.9;
/// Confidence when there are too few beats to judge
pub const DEFAULT_CONFIDENCE: f64 = 0.85;
/// Beats needed before confidence is computed from their spacing
pub const MIN_BEATS_FOR_CONFIDENCE: usize = 4;

/// Raw output of a tempo analyser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoAnalysis {
    /// Estimated tempo in BPM
    pub tempo: f64,
    /// Beat positions in seconds
    pub beats: Vec<f64>,
}

/// Tempo estimate after halving and clamping
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysedTempo {
    pub bpm: u32,
    /// 0.5..=0.99, rounded to two decimals
    pub confidence: f64,
}

/// Decodes and analyses the audio behind a source URL
#[async_trait]
pub trait TempoAnalyzer: Send + Sync {
    async fn analyze(&self, source_url: &str) -> Result<TempoAnalysis, DetectionError>;
}

/// Confidence from beat spacing: 1 minus the coefficient of variation of
/// the beat intervals, clamped to 0.5..=0.99
pub fn beat_confidence(beats: &[f64]) -> f64 {
    if beats.len() < MIN_BEATS_FOR_CONFIDENCE {
        return DEFAULT_CONFIDENCE;
    }

    let intervals: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    let variance = intervals.iter().map(|iv| (iv - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;

    if cv.is_finite() {
        (1.0 - cv).clamp(0.5, 0.99)
    } else {
        0.5
    }
}

/// Halve double-time results, clamp, and attach a confidence
pub fn post_process(analysis: &TempoAnalysis) -> AnalysedTempo {
    let mut bpm = round_half_up(analysis.tempo);
    let mut confidence = beat_confidence(&analysis.beats);

    if bpm > DOUBLE_TIME_THRESHOLD as i64 {
        let halved = round_half_up(bpm as f64 / 2.0);
        if (*HALVED_RANGE.start() as i64..=*HALVED_RANGE.end() as i64).contains(&halved) {
            bpm = halved;
            confidence *= HALVING_PENALTY;
        }
    }

    AnalysedTempo {
        bpm: clamp_bpm(bpm),
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

/// Round to nearest, ties toward +infinity
fn round_half_up(value: f64) -> i64 {
    if value.is_finite() {
        (value + 0.5).floor() as i64
    } else {
        0
    }
}
