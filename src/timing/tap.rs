// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tap tempo calculator.

use std::time::{Duration, Instant};

/// Tap tempo calculator.
///
/// Averages the intervals between recent taps. The result is not clamped
/// or corrected here; callers feed it through the metronome's BPM setter.
#[derive(Debug, Clone)]
pub struct TapTempo {
    /// Recent tap times
    taps: Vec<Instant>,
    /// Maximum number of taps to average
    max_taps: usize,
    /// Maximum time between taps before resetting
    timeout: Duration,
}

impl TapTempo {
    /// Create a new tap tempo calculator
    pub fn new(max_taps: usize, timeout_ms: u64) -> Self {
        Self {
            taps: Vec::with_capacity(max_taps),
            max_taps: max_taps.max(2),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Record a tap now and return the calculated BPM if enough taps
    pub fn tap(&mut self) -> Option<u32> {
        self.tap_at(Instant::now())
    }

    /// Record a tap at the given instant
    pub fn tap_at(&mut self, now: Instant) -> Option<u32> {
        // Reset if timeout exceeded
        if let Some(last) = self.taps.last() {
            if now.saturating_duration_since(*last) > self.timeout {
                self.taps.clear();
            }
        }

        self.taps.push(now);

        if self.taps.len() > self.max_taps {
            self.taps.remove(0);
        }

        self.bpm()
    }

    /// BPM from the taps recorded so far
    pub fn bpm(&self) -> Option<u32> {
        if self.taps.len() < 2 {
            return None;
        }

        let intervals = self.taps.len() - 1;
        let total = self.taps[intervals].saturating_duration_since(self.taps[0]);
        let avg_ms = total.as_secs_f64() * 1000.0 / intervals as f64;
        if avg_ms <= 0.0 {
            return None;
        }

        Some((60_000.0 / avg_ms).round() as u32)
    }

    /// Number of taps currently averaged
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Whether the tap sequence has gone stale
    pub fn is_expired(&self, now: Instant) -> bool {
        self.taps
            .last()
            .map(|last| now.saturating_duration_since(*last) > self.timeout)
            .unwrap_or(false)
    }

    /// Reset the tap tempo
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(8, 2000) // Average 8 taps, 2 second timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps_every(tap: &mut TapTempo, start: Instant, interval_ms: u64, count: u64) -> Option<u32> {
        let mut last = None;
        for i in 0..count {
            last = tap.tap_at(start + Duration::from_millis(i * interval_ms));
        }
        last
    }

    #[test]
    fn test_single_tap_has_no_bpm() {
        let mut tap = TapTempo::default();
        assert!(tap.tap_at(Instant::now()).is_none());
        assert_eq!(tap.tap_count(), 1);
    }

    #[test]
    fn test_500ms_taps_give_120() {
        let mut tap = TapTempo::default();
        let bpm = taps_every(&mut tap, Instant::now(), 500, 4);
        assert_eq!(bpm, Some(120));
    }

    #[test]
    fn test_rounding() {
        let mut tap = TapTempo::default();
        // 60000 / 333 = 180.18
        let bpm = taps_every(&mut tap, Instant::now(), 333, 3);
        assert_eq!(bpm, Some(180));
    }

    #[test]
    fn test_keeps_last_eight_taps() {
        let mut tap = TapTempo::default();
        let start = Instant::now();
        // Eight slow taps, then eight fast ones: only the fast ones remain
        taps_every(&mut tap, start, 1000, 8);
        let fast_start = start + Duration::from_millis(7500);
        let bpm = taps_every(&mut tap, fast_start, 500, 8);
        assert_eq!(tap.tap_count(), 8);
        assert_eq!(bpm, Some(120));
    }

    #[test]
    fn test_timeout_resets() {
        let mut tap = TapTempo::default();
        let start = Instant::now();
        taps_every(&mut tap, start, 500, 3);

        let late = start + Duration::from_millis(1000 + 2500);
        assert!(tap.is_expired(late));
        assert!(tap.tap_at(late).is_none());
        assert_eq!(tap.tap_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut tap = TapTempo::default();
        taps_every(&mut tap, Instant::now(), 500, 3);
        tap.reset();
        assert_eq!(tap.tap_count(), 0);
        assert!(tap.bpm().is_none());
    }
}
