// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport state and the scheduler wake-up timer.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Playing or stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(self) -> bool {
        self == TransportState::Playing
    }
}

/// A repeating task on the runtime.
///
/// The first call happens one period after spawning. The task ends when the
/// callback returns false, or when the timer is cancelled or dropped.
#[derive(Debug)]
pub struct PeriodicTimer {
    handle: JoinHandle<()>,
}

impl PeriodicTimer {
    pub fn spawn<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Whether the task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the timer. No further callbacks run after the task is next polled.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _timer = PeriodicTimer::spawn(&Handle::current(), Duration::from_millis(25), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(95)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_callbacks() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let timer = PeriodicTimer::spawn(&Handle::current(), Duration::from_millis(25), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        timer.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_end_timer() {
        let timer = PeriodicTimer::spawn(&Handle::current(), Duration::from_millis(25), || false);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(timer.is_finished());
    }

    #[test]
    fn test_transport_state() {
        assert_eq!(TransportState::default(), TransportState::Stopped);
        assert!(TransportState::Playing.is_playing());
    }
}
