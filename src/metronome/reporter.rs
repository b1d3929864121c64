// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Visual beat reporting.
//!
//! Tones are queued up to a look-ahead window early, so the indicator update
//! for each main beat is delayed by the distance between the tone's clock
//! time and the clock's current time. Every reset bumps an epoch; updates
//! stamped with an older epoch are dropped when they fire.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::trace;

/// Delayed beat-indicator updates
#[derive(Debug, Clone)]
pub struct BeatReporter {
    current_beat: Arc<AtomicU32>,
    epoch: Arc<AtomicU64>,
    runtime: Handle,
}

impl BeatReporter {
    pub fn new(runtime: Handle) -> Self {
        Self {
            current_beat: Arc::new(AtomicU32::new(0)),
            epoch: Arc::new(AtomicU64::new(0)),
            runtime,
        }
    }

    /// Main beat index last shown
    pub fn current_beat(&self) -> u32 {
        self.current_beat.load(Ordering::Acquire)
    }

    /// Show `beat` when the clock reaches `target_time`.
    ///
    /// Returns false, without scheduling anything, if the target has
    /// already passed.
    pub fn report(&self, beat: u32, target_time: f64, now: f64) -> bool {
        let delay = target_time - now;
        if !(delay >= 0.0) {
            return false;
        }
        self.report_after(beat, Duration::from_secs_f64(delay));
        true
    }

    /// Show `beat` after `delay`
    pub fn report_after(&self, beat: u32, delay: Duration) {
        let stamp = self.epoch.load(Ordering::Acquire);
        let epoch = Arc::clone(&self.epoch);
        let current_beat = Arc::clone(&self.current_beat);

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if epoch.load(Ordering::Acquire) == stamp {
                current_beat.store(beat, Ordering::Release);
            } else {
                trace!("Dropping stale beat update {}", beat);
            }
        });
    }

    /// Show beat 0 now and cancel every pending update
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.current_beat.store(0, Ordering::Release);
    }
}
