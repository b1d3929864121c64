// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Metronome engine.
//!
//! Owns the tempo state, the look-ahead scheduler and the wake-up timer, and
//! drives an [`AudioDevice`] through them. All methods take `&self`; state
//! lives behind a mutex shared with the timer task.

pub mod reporter;
pub mod scheduler;
pub mod synth;
pub mod tempo;
pub mod transport;

pub use reporter::BeatReporter;
pub use scheduler::{
    LookAheadScheduler, ScheduleCursor, SchedulerConfig, LOOKAHEAD_SECONDS, SCHEDULER_INTERVAL,
};
pub use synth::{ToneKind, ToneSynthesizer};
pub use tempo::{
    clamp_bpm, clamp_volume, Subdivision, TempoState, TimeSignature, DEFAULT_BPM, MAX_BPM, MIN_BPM,
};
pub use transport::{PeriodicTimer, TransportState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::audio::{AudioDevice, AudioError};

/// Metronome errors
#[derive(Debug, Error)]
pub enum MetronomeError {
    #[error("audio initialization failed: {0}")]
    Audio(#[from] AudioError),
    #[error("no async runtime available for the scheduler timer")]
    NoRuntime,
}

/// Read-only view of the engine for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetronomeSnapshot {
    pub bpm: u32,
    pub is_playing: bool,
    /// Main beat index, `< time_signature.beats()`
    pub current_beat: u32,
    pub volume: f32,
    pub time_signature: TimeSignature,
    pub subdivision: Subdivision,
}

struct EngineState {
    tempo: TempoState,
    scheduler: LookAheadScheduler,
    transport: TransportState,
    timer: Option<PeriodicTimer>,
    disposed: bool,
}

struct Engine {
    device: Arc<dyn AudioDevice>,
    synth: ToneSynthesizer,
    reporter: BeatReporter,
    interval: Duration,
    state: Mutex<EngineState>,
}

impl Engine {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One scheduler pass against the current clock time
    fn run_scheduler(&self, state: &mut EngineState) -> usize {
        if !state.transport.is_playing() {
            return 0;
        }
        let now = self.device.now();
        let EngineState {
            tempo, scheduler, ..
        } = state;
        let tempo: &TempoState = tempo;
        let synth = &self.synth;
        scheduler.tick(now, tempo, |sub_beat, at| {
            synth.schedule_tone(sub_beat, at, tempo);
        })
    }

    fn timer_tick(&self) -> usize {
        let mut state = self.lock();
        self.run_scheduler(&mut state)
    }
}

/// The metronome
pub struct Metronome {
    engine: Arc<Engine>,
    runtime: Handle,
}

impl Metronome {
    /// Create a stopped metronome on the current tokio runtime
    pub fn new(device: Arc<dyn AudioDevice>) -> Result<Self, MetronomeError> {
        let runtime = Handle::try_current().map_err(|_| MetronomeError::NoRuntime)?;
        Ok(Self::with_runtime(device, runtime))
    }

    /// Create a stopped metronome whose timer runs on `runtime`
    pub fn with_runtime(device: Arc<dyn AudioDevice>, runtime: Handle) -> Self {
        Self::with_config(device, runtime, &SchedulerConfig::default())
    }

    /// Create a stopped metronome with custom scheduler timing
    pub fn with_config(
        device: Arc<dyn AudioDevice>,
        runtime: Handle,
        config: &SchedulerConfig,
    ) -> Self {
        let tempo = TempoState::new();
        device.set_master_gain(tempo.output_gain());

        let reporter = BeatReporter::new(runtime.clone());
        let synth = ToneSynthesizer::new(Arc::clone(&device), reporter.clone());

        let engine = Engine {
            device,
            synth,
            reporter,
            interval: config.interval(),
            state: Mutex::new(EngineState {
                tempo,
                scheduler: LookAheadScheduler::with_lookahead(config.lookahead()),
                transport: TransportState::Stopped,
                timer: None,
                disposed: false,
            }),
        };

        Self {
            engine: Arc::new(engine),
            runtime,
        }
    }

    /// Current display state
    pub fn snapshot(&self) -> MetronomeSnapshot {
        let state = self.engine.lock();
        MetronomeSnapshot {
            bpm: state.tempo.bpm(),
            is_playing: state.transport.is_playing(),
            current_beat: self.engine.reporter.current_beat(),
            volume: state.tempo.volume(),
            time_signature: state.tempo.time_signature(),
            subdivision: state.tempo.subdivision(),
        }
    }

    pub fn tempo(&self) -> TempoState {
        self.engine.lock().tempo
    }

    pub fn is_playing(&self) -> bool {
        self.engine.lock().transport.is_playing()
    }

    pub fn current_beat(&self) -> u32 {
        self.engine.reporter.current_beat()
    }

    pub fn cursor(&self) -> ScheduleCursor {
        self.engine.lock().scheduler.cursor()
    }

    /// Resume a suspended audio clock, e.g. on the first user interaction
    pub fn warm_up(&self) -> Result<(), AudioError> {
        self.engine.device.resume()
    }

    /// Start playback. No-op if already playing.
    ///
    /// The first sub-beat lands at the clock's current time. If the clock
    /// cannot be resumed the metronome stays stopped.
    pub fn start(&self) {
        let mut state = self.engine.lock();
        if state.transport.is_playing() {
            return;
        }
        if state.disposed {
            warn!("Start ignored: metronome disposed");
            return;
        }

        if let Err(e) = self.engine.device.resume() {
            warn!("Cannot start metronome: {}", e);
            return;
        }

        let now = self.engine.device.now();
        state.scheduler.reset(now);
        state.transport = TransportState::Playing;
        self.engine.reporter.reset();

        let scheduled = self.engine.run_scheduler(&mut state);

        let weak: Weak<Engine> = Arc::downgrade(&self.engine);
        state.timer = Some(PeriodicTimer::spawn(
            &self.runtime,
            self.engine.interval,
            move || match weak.upgrade() {
                Some(engine) => {
                    engine.timer_tick();
                    true
                }
                None => false,
            },
        ));

        info!(
            "Metronome started at {:.3}s, {} BPM {}",
            now,
            state.tempo.bpm(),
            state.tempo.time_signature()
        );
        debug!("Initial pass queued {} sub-beats", scheduled);
    }

    /// Stop playback. Tones already queued still sound.
    pub fn stop(&self) {
        let mut state = self.engine.lock();
        if !state.transport.is_playing() {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        state.transport = TransportState::Stopped;
        self.engine.reporter.reset();
        info!("Metronome stopped");
    }

    /// Start if stopped, stop if playing
    pub fn toggle(&self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Set the tempo, clamped to 30..=300. Returns the stored value.
    pub fn set_bpm(&self, bpm: i64) -> u32 {
        let stored = self.engine.lock().tempo.set_bpm(bpm);
        debug!("Tempo set to {} (requested {})", stored, bpm);
        stored
    }

    /// Set the volume, clamped to [0, 1], and apply it to the output gain
    pub fn set_volume(&self, volume: f32) -> f32 {
        let mut state = self.engine.lock();
        let stored = state.tempo.set_volume(volume);
        self.engine.device.set_master_gain(state.tempo.output_gain());
        stored
    }

    /// Change the meter. While playing, the next queued sub-beat starts a
    /// new measure.
    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        let mut state = self.engine.lock();
        state.tempo.set_time_signature(time_signature);
        self.restart_measure(&mut state);
        debug!("Time signature set to {}", time_signature);
    }

    /// Change the subdivision. While playing, the next queued sub-beat
    /// starts a new measure.
    pub fn set_subdivision(&self, subdivision: Subdivision) {
        let mut state = self.engine.lock();
        state.tempo.set_subdivision(subdivision);
        self.restart_measure(&mut state);
        debug!("Subdivision set to {}", subdivision.label());
    }

    fn restart_measure(&self, state: &mut EngineState) {
        if state.transport.is_playing() {
            state.scheduler.restart_measure();
            self.engine.reporter.reset();
        }
    }

    /// Apply a detected tempo, if there is one
    pub fn apply_detected_bpm(&self, bpm: Option<u32>) -> Option<u32> {
        let bpm = bpm?;
        let stored = self.set_bpm(bpm as i64);
        info!("Applied detected tempo {} BPM", stored);
        Some(stored)
    }

    /// Run one scheduler pass now. Returns the number of sub-beats queued.
    pub fn tick(&self) -> usize {
        self.engine.timer_tick()
    }

    /// Stop the timer and release the audio device. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.engine.lock();
        if state.disposed {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        state.transport = TransportState::Stopped;
        state.disposed = true;
        self.engine.reporter.reset();
        self.engine.device.close();
        debug!("Metronome disposed");
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Metronome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metronome")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{OfflineDevice, ToneOutput};
    use crate::timing::{ClockSource, ClockState};

    /// 1/32 s, exact in binary
    const STEP: f64 = 0.03125;

    fn setup() -> (Arc<OfflineDevice>, Metronome) {
        let device = Arc::new(OfflineDevice::new());
        let metronome = Metronome::new(device.clone()).unwrap();
        (device, metronome)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (device, metronome) = setup();
        let snap = metronome.snapshot();
        assert_eq!(snap.bpm, 120);
        assert!(!snap.is_playing);
        assert_eq!(snap.current_beat, 0);
        assert_eq!(snap.volume, 0.5);
        assert_eq!(snap.time_signature, TimeSignature::FourFour);
        assert_eq!(snap.subdivision, Subdivision::Quarter);
        assert_eq!(device.master_gain(), 1.5);
        assert_eq!(device.state(), ClockState::Suspended);
    }

    #[test]
    fn test_new_without_runtime() {
        let device = Arc::new(OfflineDevice::new());
        assert!(matches!(
            Metronome::new(device),
            Err(MetronomeError::NoRuntime)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_queues_downbeat_immediately() {
        let (device, metronome) = setup();
        metronome.start();

        assert!(metronome.is_playing());
        assert_eq!(device.state(), ClockState::Running);
        let tones = device.tones();
        assert_eq!(tones.len(), 1);
        assert_eq!(tones[0].start, 0.0);
        assert_eq!(tones[0].tone.frequency, 1500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_noop() {
        let (device, metronome) = setup();
        metronome.start();
        device.advance(0.2);
        metronome.start();
        assert_eq!(device.tones().len(), 1);
        assert_eq!(metronome.cursor().next_note_time, 0.5);

        // One tick stream: beats stay on the original grid, none doubled
        for _ in 0..40 {
            device.advance(STEP);
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        let starts: Vec<f64> = device.tones().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(metronome.cursor().next_note_time, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_stopped_is_noop() {
        let (device, metronome) = setup();
        let before = (metronome.snapshot(), metronome.cursor(), metronome.current_beat());
        metronome.stop();
        assert_eq!(
            (metronome.snapshot(), metronome.cursor(), metronome.current_beat()),
            before
        );
        assert_eq!(device.state(), ClockState::Suspended);

        metronome.start();
        device.advance(0.6);
        tokio::time::sleep(Duration::from_millis(25)).await;
        metronome.stop();
        let stopped = (metronome.snapshot(), metronome.cursor(), metronome.current_beat());
        let tones = device.tones().len();

        metronome.stop();
        assert_eq!(
            (metronome.snapshot(), metronome.cursor(), metronome.current_beat()),
            stopped
        );
        assert_eq!(device.tones().len(), tones);
        assert!(!metronome.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_device_stays_stopped() {
        let device = Arc::new(OfflineDevice::blocked());
        let metronome = Metronome::new(device.clone()).unwrap();
        metronome.start();
        assert!(!metronome.is_playing());
        assert!(device.tones().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_queues_beats_as_clock_advances() {
        let (device, metronome) = setup();
        metronome.start();

        // 13 steps put the clock at 0.40625, inside the window of beat 1
        for _ in 0..13 {
            device.advance(STEP);
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;

        let starts: Vec<f64> = device.tones().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 0.5]);
        assert_eq!(device.tones()[1].tone.frequency, 800.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_beat_indicator_follows_audio_time() {
        let (device, metronome) = setup();
        metronome.start();
        for _ in 0..13 {
            device.advance(STEP);
        }
        assert_eq!(metronome.tick(), 1);

        // Beat 1 sounds 0.09375 s after the current clock time
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(metronome.current_beat(), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(metronome.current_beat(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_resets_and_silences_timer() {
        let (device, metronome) = setup();
        metronome.start();
        for _ in 0..13 {
            device.advance(STEP);
        }
        metronome.tick();
        metronome.stop();

        assert!(!metronome.is_playing());
        assert_eq!(metronome.current_beat(), 0);

        let queued = device.tones().len();
        for _ in 0..40 {
            device.advance(STEP);
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(device.tones().len(), queued);
        // Pending indicator update was dropped
        assert_eq!(metronome.current_beat(), 0);
        assert_eq!(metronome.tick(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_begins_new_measure() {
        let (device, metronome) = setup();
        metronome.start();
        for _ in 0..32 {
            device.advance(STEP);
        }
        metronome.tick();
        metronome.stop();

        device.take_tones();
        metronome.start();
        let tones = device.tones();
        assert_eq!(tones.len(), 1);
        assert_eq!(tones[0].start, 1.0);
        assert_eq!(tones[0].tone.frequency, 1500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let (_device, metronome) = setup();
        metronome.toggle();
        assert!(metronome.is_playing());
        metronome.toggle();
        assert!(!metronome.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_setters_clamp() {
        let (device, metronome) = setup();
        assert_eq!(metronome.set_bpm(500), 300);
        assert_eq!(metronome.set_bpm(10), 30);
        assert_eq!(metronome.set_volume(2.0), 1.0);
        assert_eq!(device.master_gain(), 3.0);
        assert_eq!(metronome.set_volume(0.0), 0.0);
        assert_eq!(device.master_gain(), 0.0);
        assert_eq!(metronome.snapshot().bpm, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bpm_change_while_playing() {
        let (device, metronome) = setup();
        metronome.start();
        metronome.set_bpm(60);

        // Beat 1 was already due at 0.5 in the cursor; spacing after it is 1 s
        for _ in 0..48 {
            device.advance(STEP);
        }
        metronome.tick();
        let starts: Vec<f64> = device.tones().iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_meter_change_while_playing_restarts_measure() {
        let (device, metronome) = setup();
        metronome.start();
        for _ in 0..13 {
            device.advance(STEP);
        }
        metronome.tick();
        assert_eq!(metronome.cursor().current_sub_beat, 2);

        metronome.set_time_signature(TimeSignature::ThreeFour);
        assert_eq!(metronome.cursor().current_sub_beat, 0);
        assert_eq!(metronome.current_beat(), 0);

        for _ in 0..16 {
            device.advance(STEP);
        }
        metronome.tick();
        let last = device.tones().last().copied().unwrap();
        assert_eq!(last.start, 1.0);
        assert_eq!(last.tone.frequency, 1500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_meter_change_while_stopped_keeps_cursor() {
        let (_device, metronome) = setup();
        metronome.set_subdivision(Subdivision::Sixteenth);
        assert_eq!(metronome.tempo().total_sub_beats(), 16);
        assert_eq!(metronome.cursor(), ScheduleCursor::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_detected_bpm() {
        let (_device, metronome) = setup();
        assert_eq!(metronome.apply_detected_bpm(None), None);
        assert_eq!(metronome.snapshot().bpm, 120);
        assert_eq!(metronome.apply_detected_bpm(Some(95)), Some(95));
        assert_eq!(metronome.apply_detected_bpm(Some(400)), Some(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_closes_device() {
        let (device, metronome) = setup();
        metronome.start();
        metronome.dispose();
        metronome.dispose();

        assert!(!metronome.is_playing());
        assert_eq!(device.state(), ClockState::Closed);

        metronome.start();
        assert!(!metronome.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_device() {
        let (device, metronome) = setup();
        metronome.start();
        drop(metronome);
        assert_eq!(device.state(), ClockState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_serializes() {
        let (_device, metronome) = setup();
        let yaml = serde_yaml::to_string(&metronome.snapshot()).unwrap();
        assert!(yaml.contains("bpm: 120"));
        assert!(yaml.contains("4/4"));
        assert!(yaml.contains("subdivision: 1"));
    }
}
