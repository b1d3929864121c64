// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Look-ahead click scheduler.
//!
//! A coarse periodic timer wakes the scheduler; each wake queues every
//! sub-beat whose time falls inside the look-ahead window on the audio
//! clock. Jitter in the wake-up timer therefore never reaches the audio,
//! as long as it stays smaller than the window.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::tempo::TempoState;

/// How far ahead of the clock tones are queued, in seconds
pub const LOOKAHEAD_SECONDS: f64 = 0.1;

/// Period of the wake-up timer
pub const SCHEDULER_INTERVAL: Duration = Duration::from_millis(25);

/// Scheduler timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Look-ahead window in milliseconds
    pub lookahead_ms: u32,
    /// Wake-up period in milliseconds
    pub interval_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: (LOOKAHEAD_SECONDS * 1000.0) as u32,
            interval_ms: SCHEDULER_INTERVAL.as_millis() as u32,
        }
    }
}

impl SchedulerConfig {
    /// Look-ahead window in seconds
    pub fn lookahead(&self) -> f64 {
        self.lookahead_ms.max(1) as f64 / 1000.0
    }

    /// Wake-up period. Never longer than the window, or beats would be late.
    pub fn interval(&self) -> Duration {
        let interval = self.interval_ms.clamp(1, self.lookahead_ms.max(1));
        Duration::from_millis(interval as u64)
    }
}

/// Position of the next unscheduled sub-beat
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScheduleCursor {
    /// Clock time of the next sub-beat, in seconds
    pub next_note_time: f64,
    /// Sub-beat index within the measure, `< total_sub_beats`
    pub current_sub_beat: u32,
}

/// The look-ahead loop
#[derive(Debug, Clone)]
pub struct LookAheadScheduler {
    cursor: ScheduleCursor,
    lookahead: f64,
}

impl LookAheadScheduler {
    pub fn new() -> Self {
        Self::with_lookahead(LOOKAHEAD_SECONDS)
    }

    /// Create a scheduler with a custom window in seconds
    pub fn with_lookahead(lookahead: f64) -> Self {
        Self {
            cursor: ScheduleCursor::default(),
            lookahead,
        }
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn cursor(&self) -> ScheduleCursor {
        self.cursor
    }

    /// Start a new measure at `now`
    pub fn reset(&mut self, now: f64) {
        self.cursor = ScheduleCursor {
            next_note_time: now,
            current_sub_beat: 0,
        };
    }

    /// Return to sub-beat 0 without moving the next note time
    pub fn restart_measure(&mut self) {
        self.cursor.current_sub_beat = 0;
    }

    /// Queue every sub-beat with a time before `now + lookahead`.
    ///
    /// `schedule` receives the sub-beat index and its clock time. Tempo and
    /// meter are re-read on every iteration. Returns the number of sub-beats
    /// queued.
    pub fn tick<F>(&mut self, now: f64, tempo: &TempoState, mut schedule: F) -> usize
    where
        F: FnMut(u32, f64),
    {
        let horizon = now + self.lookahead;
        let mut scheduled = 0;

        while self.cursor.next_note_time < horizon {
            let total = tempo.total_sub_beats();
            // A meter change can leave the index past the end of a shorter measure
            if self.cursor.current_sub_beat >= total {
                self.cursor.current_sub_beat = 0;
            }

            schedule(self.cursor.current_sub_beat, self.cursor.next_note_time);
            scheduled += 1;

            self.cursor.next_note_time += tempo.seconds_per_sub_beat();
            self.cursor.current_sub_beat = (self.cursor.current_sub_beat + 1) % total;
        }

        scheduled
    }
}

impl Default for LookAheadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metronome::tempo::{Subdivision, TimeSignature};

    fn collect(scheduler: &mut LookAheadScheduler, now: f64, tempo: &TempoState) -> Vec<(u32, f64)> {
        let mut out = Vec::new();
        scheduler.tick(now, tempo, |sub, at| out.push((sub, at)));
        out
    }

    #[test]
    fn test_start_at_zero_schedules_one_beat() {
        let tempo = TempoState::new();
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);

        assert_eq!(collect(&mut scheduler, 0.0, &tempo), vec![(0, 0.0)]);
        assert_eq!(scheduler.cursor().current_sub_beat, 1);
        assert!((scheduler.cursor().next_note_time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_window_edge_is_exclusive() {
        let tempo = TempoState::new();
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);
        collect(&mut scheduler, 0.0, &tempo);

        // 0.375 + 0.1 < 0.5: next beat not yet due
        assert!(collect(&mut scheduler, 0.375, &tempo).is_empty());

        let due = collect(&mut scheduler, 0.40625, &tempo);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, 1);
        assert!((due[0].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sixteenths_in_window() {
        let mut tempo = TempoState::new();
        tempo.set_subdivision(Subdivision::Sixteenth);
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(10.0);

        // 0.125 s spacing: only the first fits in a 0.1 s window
        let due = collect(&mut scheduler, 10.0, &tempo);
        assert_eq!(due, vec![(0, 10.0)]);

        let due = collect(&mut scheduler, 10.2, &tempo);
        let subs: Vec<u32> = due.iter().map(|(s, _)| *s).collect();
        assert_eq!(subs, vec![1, 2]);
        assert!((due[1].1 - 10.25).abs() < 1e-12);
    }

    #[test]
    fn test_sub_beat_wraps_at_measure_end() {
        let mut tempo = TempoState::new();
        tempo.set_time_signature(TimeSignature::ThreeFour);
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);

        let due = collect(&mut scheduler, 2.0, &tempo);
        let subs: Vec<u32> = due.iter().map(|(s, _)| *s).collect();
        assert_eq!(subs, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_tempo_change_applies_to_next_unscheduled_beat() {
        let mut tempo = TempoState::new();
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);
        collect(&mut scheduler, 0.0, &tempo);

        // Already-queued spacing of 0.5 stays; later spacing follows 60 BPM
        tempo.set_bpm(60);
        let due = collect(&mut scheduler, 1.5, &tempo);
        let times: Vec<f64> = due.iter().map(|(_, t)| *t).collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 0.5).abs() < 1e-12);
        assert!((times[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_stalled_timer_catches_up() {
        let tempo = TempoState::new();
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);

        // Nothing ran for 5 seconds: every missed beat is queued in a burst
        let due = collect(&mut scheduler, 5.0, &tempo);
        assert_eq!(due.len(), 11);
        assert!(due.windows(2).all(|w| w[1].1 > w[0].1));
    }

    #[test]
    fn test_shorter_meter_resets_out_of_range_index() {
        let mut tempo = TempoState::new();
        tempo.set_subdivision(Subdivision::Sixteenth);
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);
        collect(&mut scheduler, 1.0, &tempo);
        assert!(scheduler.cursor().current_sub_beat >= 4);

        tempo.set_subdivision(Subdivision::Quarter);
        let due = collect(&mut scheduler, 2.0, &tempo);
        assert_eq!(due[0].0, 0);
        assert!(scheduler.cursor().current_sub_beat < tempo.total_sub_beats());
    }

    #[test]
    fn test_restart_measure_keeps_time() {
        let tempo = TempoState::new();
        let mut scheduler = LookAheadScheduler::new();
        scheduler.reset(0.0);
        collect(&mut scheduler, 1.0, &tempo);

        let before = scheduler.cursor().next_note_time;
        scheduler.restart_measure();
        assert_eq!(scheduler.cursor().current_sub_beat, 0);
        assert_eq!(scheduler.cursor().next_note_time, before);
    }

    #[test]
    fn test_scheduler_config() {
        let config = SchedulerConfig::default();
        assert!((config.lookahead() - 0.1).abs() < 1e-12);
        assert_eq!(config.interval(), Duration::from_millis(25));

        let config = SchedulerConfig {
            lookahead_ms: 20,
            interval_ms: 50,
        };
        assert_eq!(config.interval(), Duration::from_millis(20));
    }
}
