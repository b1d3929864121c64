// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Practice session: applies control actions to the metronome and player.
//!
//! Everything the terminal front end does, minus the terminal.

use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::{debug, info, warn};

use super::UiState;
use crate::config::PracticeConfig;
use crate::control::{ControlAction, KeyboardController};
use crate::detection::{BpmEstimate, TempoEvent, TempoRequests, Vote};
use crate::metronome::{Metronome, MetronomeSnapshot, TimeSignature, MAX_BPM, MIN_BPM};
use crate::player::{watch_url, SimulatedPlayer, SyncController, SyncMode, VideoPlayer};
use crate::timing::TapTempo;

/// Longest typed tempo
const TEMPO_ENTRY_DIGITS: usize = 3;

pub struct PracticeSession<P> {
    sync: SyncController<P>,
    keyboard: KeyboardController,
    tap: TapTempo,
    ui: UiState,
    detection: Option<TempoRequests>,
    /// Audio output resumed by the first key press
    warmed_up: bool,
}

impl<P: VideoPlayer> PracticeSession<P> {
    pub fn new(metronome: Arc<Metronome>, player: P) -> Self {
        Self {
            sync: SyncController::new(metronome, player),
            keyboard: KeyboardController::with_defaults(),
            tap: TapTempo::default(),
            ui: UiState::default(),
            detection: None,
            warmed_up: false,
        }
    }

    /// Detect tempos for loaded videos and accept typed tempos and votes
    pub fn with_detection(mut self, requests: TempoRequests) -> Self {
        self.detection = Some(requests);
        self
    }

    pub fn metronome(&self) -> &Metronome {
        self.sync.metronome()
    }

    pub fn snapshot(&self) -> MetronomeSnapshot {
        self.sync.metronome().snapshot()
    }

    pub fn mode(&self) -> SyncMode {
        self.sync.mode()
    }

    pub fn sync(&self) -> &SyncController<P> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncController<P> {
        &mut self.sync
    }

    pub fn keyboard(&self) -> &KeyboardController {
        &self.keyboard
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    /// Look up and apply a key press. Returns the action, if any was bound.
    ///
    /// While a tempo is being typed, keys edit the entry instead.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        self.warm_up();
        if self.ui.tempo_entry.is_some() {
            self.edit_tempo_entry(code);
            return None;
        }
        let action = self.keyboard.action_for(code, modifiers)?;
        self.apply(&action);
        Some(action)
    }

    /// Resume the audio output once, on the first user input
    fn warm_up(&mut self) {
        if self.warmed_up {
            return;
        }
        self.warmed_up = true;
        if let Err(e) = self.sync.metronome().warm_up() {
            warn!("Audio warm-up failed: {}", e);
        }
    }

    fn edit_tempo_entry(&mut self, code: KeyCode) {
        let Some(entry) = self.ui.tempo_entry.as_mut() else {
            return;
        };
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() && entry.len() < TEMPO_ENTRY_DIGITS => entry.push(c),
            KeyCode::Backspace => {
                entry.pop();
            }
            KeyCode::Enter => {
                let typed = entry.clone();
                self.ui.tempo_entry = None;
                self.submit_tempo(&typed);
            }
            KeyCode::Esc => {
                self.ui.tempo_entry = None;
                self.ui.set_status("Tempo entry cancelled");
            }
            _ => {}
        }
    }

    /// Set a typed tempo and save it for the loaded video
    fn submit_tempo(&mut self, typed: &str) {
        let bpm = match typed.parse::<i64>() {
            Ok(bpm) if (MIN_BPM as i64..=MAX_BPM as i64).contains(&bpm) => bpm,
            _ => {
                self.ui
                    .set_status(format!("Tempo must be {}-{} BPM", MIN_BPM, MAX_BPM));
                return;
            }
        };

        let bpm = self.sync.metronome().set_bpm(bpm);
        self.ui.set_status(format!("{} BPM", bpm));
        if let (Some(requests), Some(id)) = (&self.detection, &self.ui.video_id) {
            requests.submit_manual(&watch_url(id), None, bpm as i64);
        }
    }

    fn vote(&mut self, up: bool) {
        let (Some(requests), Some(id), Some(detected)) =
            (&self.detection, &self.ui.video_id, &self.ui.detected)
        else {
            self.ui.set_status("No detected tempo to vote on");
            return;
        };

        let vote = if up {
            Vote::Up
        } else {
            let current = self.sync.metronome().tempo().bpm();
            Vote::Down {
                corrected_bpm: (current != detected.bpm).then_some(current),
            }
        };
        requests.vote(&watch_url(id), vote);
    }

    /// Apply an action. Returns false once the session should end.
    pub fn apply(&mut self, action: &ControlAction) -> bool {
        debug!("Action {:?}", action);
        let metronome = Arc::clone(self.sync.metronome());

        match action {
            ControlAction::TogglePlay => {
                if self.ui.video_id.is_some() {
                    self.sync.toggle();
                } else if self.sync.is_playing() {
                    self.sync.pause();
                } else {
                    self.sync.metronome_only();
                }
            }
            ControlAction::PlayTogether => {
                if self.ui.video_id.is_some() {
                    self.sync.play_together();
                } else {
                    self.ui.set_status("No video loaded");
                }
            }
            ControlAction::MetronomeOnly => self.sync.metronome_only(),
            ControlAction::Pause => self.sync.pause(),
            ControlAction::Stop => self.sync.stop(),
            ControlAction::AdjustTempo(delta) => {
                let bpm = metronome.set_bpm(metronome.tempo().bpm() as i64 + delta);
                self.ui.set_status(format!("{} BPM", bpm));
            }
            ControlAction::TapTempo => self.tap_at(Instant::now()),
            ControlAction::CycleTimeSignature => {
                let next = next_time_signature(metronome.tempo().time_signature());
                metronome.set_time_signature(next);
                self.ui.set_status(format!("Time signature {}", next));
            }
            ControlAction::CycleSubdivision => {
                let next = metronome.tempo().subdivision().next();
                metronome.set_subdivision(next);
                self.ui.set_status(format!("Subdivision {}", next.label()));
            }
            ControlAction::EnterTempo => {
                self.ui.tempo_entry = Some(String::new());
            }
            ControlAction::VoteUp => self.vote(true),
            ControlAction::VoteDown => self.vote(false),
            ControlAction::AdjustVolume(delta) => {
                let volume = metronome.set_volume(metronome.tempo().volume() + delta);
                self.ui.set_status(format!("Volume {}%", (volume * 100.0).round() as u32));
            }
            ControlAction::ToggleHelp => self.ui.show_help = !self.ui.show_help,
            ControlAction::Quit => {
                self.sync.stop();
                return false;
            }
        }
        true
    }

    /// Register a tap at `now`; two or more taps set the tempo
    pub fn tap_at(&mut self, now: Instant) {
        match self.tap.tap_at(now) {
            Some(bpm) => {
                let bpm = self.sync.metronome().set_bpm(bpm as i64);
                self.ui.set_status(format!("Tap tempo {} BPM", bpm));
            }
            None => self.ui.set_status("Tap again..."),
        }
        self.ui.tap_count = self.tap.tap_count();
    }

    /// Load a video by URL or id and start looking up its tempo
    pub fn load_video(&mut self, url_or_id: &str) -> bool {
        match self.sync.load_video(url_or_id) {
            Some(id) => {
                self.ui.set_status(format!("Loaded video {}", id));
                self.ui.detected = None;
                if let Some(requests) = &self.detection {
                    requests.detect(&watch_url(&id));
                }
                self.ui.video_id = Some(id);
                true
            }
            None => {
                self.ui.set_status(format!("Not a video link: {}", url_or_id));
                false
            }
        }
    }

    /// Use a detected tempo
    pub fn apply_estimate(&mut self, estimate: &BpmEstimate) {
        if let Some(bpm) = self.sync.metronome().apply_detected_bpm(Some(estimate.bpm)) {
            let mut message = format!("Detected {} BPM ({})", bpm, estimate.source);
            if let Some(info) = &estimate.song_info {
                message.push_str(&format!(" {}", info));
            }
            self.ui.set_status(message);
        }
        self.ui.detected = Some(estimate.clone());
    }

    /// Apply a reloaded configuration
    pub fn apply_config(&mut self, config: &PracticeConfig) {
        config.metronome.apply(self.sync.metronome());

        let mut keyboard = KeyboardController::with_defaults();
        keyboard.apply_overrides(&config.keyboard);
        self.keyboard = keyboard;

        info!("Applied configuration");
        self.ui.set_status("Configuration reloaded");
    }

    /// Forward a player notification
    pub fn on_player_state(&mut self, state: crate::player::PlayerState) {
        self.sync.on_player_state(state);
    }

    /// Apply a finished detection request
    pub fn on_tempo_event(&mut self, event: TempoEvent) {
        let current = self.ui.video_id.as_deref().map(watch_url);
        match event {
            TempoEvent::Detected { video_url, .. } if current.as_ref() != Some(&video_url) => {
                debug!("Ignoring tempo for {}", video_url);
            }
            TempoEvent::Detected {
                estimate: Some(estimate),
                ..
            } => self.apply_estimate(&estimate),
            TempoEvent::Detected { estimate: None, .. } => {
                self.ui.set_status("No tempo found, press e to type one");
            }
            TempoEvent::Saved { video_url, estimate } => {
                if current.as_ref() == Some(&video_url) {
                    self.ui.detected = Some(estimate.clone());
                }
                self.ui.set_status(format!("Saved {} BPM", estimate.bpm));
            }
            TempoEvent::Voted(record) => {
                if let Some(detected) = self.ui.detected.as_mut() {
                    if current.as_ref() == Some(&record.video_url) {
                        detected.bpm = record.bpm;
                        detected.source = record.source();
                    }
                }
                self.ui.set_status(format!(
                    "Thanks! {} up, {} down",
                    record.upvotes, record.downvotes
                ));
            }
            TempoEvent::Failed(message) => self.ui.set_status(message),
        }
    }

    /// Expire stale status text and tap sequences, and apply finished
    /// detection requests
    pub fn update(&mut self, now: Instant) {
        let mut events = Vec::new();
        if let Some(requests) = self.detection.as_mut() {
            while let Some(event) = requests.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            self.on_tempo_event(event);
        }

        self.ui.clear_expired_status();
        if self.tap.is_expired(now) {
            self.tap.reset();
            self.ui.tap_count = 0;
        }
    }
}

impl PracticeSession<SimulatedPlayer> {
    /// Advance the simulated video and forward its notifications
    pub fn advance_player(&mut self, seconds: f64) {
        self.sync.player_mut().advance(seconds);
        let notifications = self.sync.player_mut().take_notifications();
        for state in notifications {
            self.sync.on_player_state(state);
        }
    }
}

fn next_time_signature(current: TimeSignature) -> TimeSignature {
    let index = TimeSignature::ALL
        .iter()
        .position(|ts| *ts == current)
        .unwrap_or(0);
    TimeSignature::ALL[(index + 1) % TimeSignature::ALL.len()]
}
