// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! A player without video.
//!
//! Keeps position and state like a real embedded player and queues the
//! state-change notifications the real one would emit, for the host to
//! forward to [`super::SyncController::on_player_state`].

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::debug;

use super::loader::ApiSource;
use super::video::extract_video_id;
use super::{PlayerError, PlayerState, VideoPlayer};

/// Player API for [`SimulatedPlayer`]; there is no script to fetch
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedApi;

#[async_trait]
impl ApiSource for SimulatedApi {
    async fn load(&self) -> Result<(), PlayerError> {
        debug!("Simulated player API loaded");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    video_id: Option<String>,
    state: PlayerState,
    position: f64,
    duration: f64,
    volume: u8,
    notifications: VecDeque<PlayerState>,
}

impl SimulatedPlayer {
    /// A player whose videos last `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            video_id: None,
            state: PlayerState::Unstarted,
            position: 0.0,
            duration: duration.max(0.0),
            volume: 100,
            notifications: VecDeque::new(),
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Move playback forward; emits `Ended` when the video runs out
    pub fn advance(&mut self, seconds: f64) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.position = (self.position + seconds.max(0.0)).min(self.duration);
        if self.position >= self.duration {
            self.set_state(PlayerState::Ended);
        }
    }

    /// Drain pending state-change notifications
    pub fn take_notifications(&mut self) -> Vec<PlayerState> {
        self.notifications.drain(..).collect()
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            debug!("Player state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.notifications.push_back(state);
        }
    }
}

impl VideoPlayer for SimulatedPlayer {
    fn load(&mut self, url_or_id: &str) -> Result<String, PlayerError> {
        let id = extract_video_id(url_or_id)
            .ok_or_else(|| PlayerError::InvalidUrl(url_or_id.to_string()))?;
        self.video_id = Some(id.clone());
        self.position = 0.0;
        self.set_state(PlayerState::Cued);
        Ok(id)
    }

    fn play(&mut self) {
        if self.video_id.is_none() {
            return;
        }
        if self.state == PlayerState::Ended {
            self.position = 0.0;
        }
        self.set_state(PlayerState::Playing);
    }

    fn pause(&mut self) {
        if self.state == PlayerState::Playing || self.state == PlayerState::Buffering {
            self.set_state(PlayerState::Paused);
        }
    }

    fn stop(&mut self) {
        if self.video_id.is_none() {
            return;
        }
        self.position = 0.0;
        self.set_state(PlayerState::Unstarted);
    }

    fn seek_to(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{EmbedApiLoader, LoaderState};

    #[tokio::test]
    async fn test_simulated_api_loads_once() {
        let loader = EmbedApiLoader::new(SimulatedApi);
        assert_eq!(loader.state(), LoaderState::Uninitialized);
        loader.ensure_loaded().await.unwrap();
        assert_eq!(loader.state(), LoaderState::Ready);
        loader.ensure_loaded().await.unwrap();
    }

    #[test]
    fn test_load_rejects_bad_urls() {
        let mut player = SimulatedPlayer::new(60.0);
        assert!(matches!(
            player.load("https://example.com/video"),
            Err(PlayerError::InvalidUrl(_))
        ));
        player.play();
        assert_eq!(player.state(), PlayerState::Unstarted);
    }

    #[test]
    fn test_playback_notifications() {
        let mut player = SimulatedPlayer::new(10.0);
        assert_eq!(
            player.load("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        player.play();
        player.advance(4.0);
        player.pause();
        player.advance(4.0);
        assert_eq!(player.current_time(), 4.0);

        player.play();
        player.advance(20.0);
        assert_eq!(
            player.take_notifications(),
            vec![
                PlayerState::Cued,
                PlayerState::Playing,
                PlayerState::Paused,
                PlayerState::Playing,
                PlayerState::Ended
            ]
        );
        assert_eq!(player.current_time(), 10.0);
    }

    #[test]
    fn test_volume_and_seek_clamp() {
        let mut player = SimulatedPlayer::new(10.0);
        player.set_volume(250);
        assert_eq!(player.volume(), 100);
        player.seek_to(99.0);
        assert_eq!(player.current_time(), 10.0);
    }
}
