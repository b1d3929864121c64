// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keeps the metronome in step with the video player.
//!
//! "Play together" only starts the video; the metronome starts when the
//! player reports `Playing`, so buffering delays do not put the click ahead
//! of the music.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{PlayerState, VideoPlayer};
use crate::metronome::Metronome;

/// What the host asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Idle,
    /// Video and metronome together
    Together,
    /// Metronome without video
    MetronomeOnly,
}

/// Host glue between a player and the metronome
pub struct SyncController<P> {
    metronome: Arc<Metronome>,
    player: P,
    mode: SyncMode,
}

impl<P: VideoPlayer> SyncController<P> {
    pub fn new(metronome: Arc<Metronome>, player: P) -> Self {
        Self {
            metronome,
            player,
            mode: SyncMode::Idle,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Whether the host considers playback active
    pub fn is_playing(&self) -> bool {
        self.mode != SyncMode::Idle
    }

    pub fn metronome(&self) -> &Arc<Metronome> {
        &self.metronome
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Start the video; the metronome follows on the `Playing` notification
    pub fn play_together(&mut self) {
        self.mode = SyncMode::Together;
        self.player.play();
        info!("Play together requested");
    }

    /// Start only the metronome
    pub fn metronome_only(&mut self) {
        self.mode = SyncMode::MetronomeOnly;
        self.metronome.start();
        info!("Metronome-only playback");
    }

    pub fn pause(&mut self) {
        self.metronome.stop();
        if self.mode != SyncMode::MetronomeOnly {
            self.player.pause();
        }
        self.mode = SyncMode::Idle;
    }

    pub fn stop(&mut self) {
        self.metronome.stop();
        if self.mode != SyncMode::MetronomeOnly {
            self.player.stop();
        }
        self.mode = SyncMode::Idle;
    }

    /// Pause if playing, otherwise play together
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play_together();
        }
    }

    /// React to a state-change notification from the player
    pub fn on_player_state(&mut self, state: PlayerState) {
        debug!("Player reported {:?} in {:?}", state, self.mode);
        match state {
            PlayerState::Playing if self.is_playing() => self.metronome.start(),
            PlayerState::Paused => self.metronome.stop(),
            PlayerState::Ended => {
                self.metronome.stop();
                self.mode = SyncMode::Idle;
            }
            _ => {}
        }
    }

    /// Load a video, stopping anything that is playing
    pub fn load_video(&mut self, url_or_id: &str) -> Option<String> {
        if self.is_playing() {
            self.stop();
        }
        match self.player.load(url_or_id) {
            Ok(id) => {
                info!("Loaded video {}", id);
                Some(id)
            }
            Err(e) => {
                warn!("Cannot load video: {}", e);
                None
            }
        }
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for SyncController<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("player", &self.player)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
