// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Video player integration.
//!
//! This module provides:
//! - Player state codes and error codes of the embedded player
//! - The `VideoPlayer` seam and a simulated player
//! - Video id extraction and thumbnail URLs
//! - One-time API loading
//! - Play-together / metronome-only sync control

pub mod loader;
pub mod simulated;
pub mod sync;
pub mod video;

pub use loader::{ApiSource, EmbedApiLoader, LoaderState};
pub use simulated::{SimulatedApi, SimulatedPlayer};
pub use sync::{SyncController, SyncMode};
pub use video::{
    extract_video_id, is_valid_video_id, thumbnail_url, watch_url, ThumbnailQuality, VIDEO_ID_LEN,
};

use thiserror::Error;

/// Player state as reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map a numeric state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(PlayerState::Unstarted),
            0 => Some(PlayerState::Ended),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            3 => Some(PlayerState::Buffering),
            5 => Some(PlayerState::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
        }
    }
}

/// Player errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("failed to load player API: {0}")]
    ApiLoad(String),
    #[error("not a video URL or id: {0}")]
    InvalidUrl(String),
    #[error("{}", embed_message(.0))]
    Embed(i32),
}

fn embed_message(code: &i32) -> String {
    embed_error_message(*code)
}

/// Human-readable text for an embedded player error code
pub fn embed_error_message(code: i32) -> String {
    match code {
        2 => "Invalid video ID".to_string(),
        5 => "HTML5 player error".to_string(),
        100 => "Video not found or private".to_string(),
        101 | 150 => "Video embedding not allowed".to_string(),
        other => format!("Unknown error ({})", other),
    }
}

/// Control surface of an embedded video player
pub trait VideoPlayer: Send {
    /// Load a video by URL or id. Does not start playback.
    fn load(&mut self, url_or_id: &str) -> Result<String, PlayerError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, seconds: f64);
    /// Volume 0..=100
    fn set_volume(&mut self, volume: u8);
    fn state(&self) -> PlayerState;
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
}
