// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Saved tempos and community votes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BpmSource, DetectionError};
use crate::metronome::{MAX_BPM, MIN_BPM};

/// Upvotes needed before a saved tempo counts as verified
pub const VERIFIED_UPVOTES: u32 = 3;

/// Stored tempo for one video URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub video_url: String,
    pub video_title: Option<String>,
    pub bpm: u32,
    pub upvotes: u32,
    pub downvotes: u32,
}

impl VoteRecord {
    pub fn new(video_url: impl Into<String>, video_title: Option<String>, bpm: u32) -> Self {
        Self {
            video_url: video_url.into(),
            video_title,
            bpm,
            upvotes: 0,
            downvotes: 0,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.upvotes >= VERIFIED_UPVOTES
    }

    /// How this record should be labelled
    pub fn source(&self) -> BpmSource {
        if self.is_verified() {
            BpmSource::Verified
        } else {
            BpmSource::Community
        }
    }
}

/// A vote cast on a saved tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    /// Disagree, optionally suggesting the right tempo
    Down { corrected_bpm: Option<u32> },
}

/// Persistent tempo store
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Saved tempo for a video, if any
    async fn saved(&self, video_url: &str) -> Result<Option<VoteRecord>, DetectionError>;

    /// Insert or replace the tempo for a video, keeping its vote counts
    async fn save(
        &self,
        video_url: &str,
        video_title: Option<&str>,
        bpm: u32,
    ) -> Result<(), DetectionError>;

    /// Record a vote and return the updated record
    async fn vote(&self, video_url: &str, vote: Vote) -> Result<VoteRecord, DetectionError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    records: Mutex<HashMap<String, VoteRecord>>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn saved(&self, video_url: &str) -> Result<Option<VoteRecord>, DetectionError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(video_url).cloned())
    }

    async fn save(
        &self,
        video_url: &str,
        video_title: Option<&str>,
        bpm: u32,
    ) -> Result<(), DetectionError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .entry(video_url.to_string())
            .or_insert_with(|| VoteRecord::new(video_url, None, bpm));
        record.bpm = bpm;
        if let Some(title) = video_title {
            record.video_title = Some(title.to_string());
        }
        debug!("Saved {} BPM for {}", bpm, video_url);
        Ok(())
    }

    async fn vote(&self, video_url: &str, vote: Vote) -> Result<VoteRecord, DetectionError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .get_mut(video_url)
            .ok_or_else(|| DetectionError::NotFound(video_url.to_string()))?;

        match vote {
            Vote::Up => record.upvotes += 1,
            Vote::Down { corrected_bpm } => {
                record.downvotes += 1;
                match corrected_bpm {
                    Some(bpm) if (MIN_BPM..=MAX_BPM).contains(&bpm) => record.bpm = bpm,
                    Some(bpm) => warn!("Ignoring out-of-range correction {} BPM", bpm),
                    None => {}
                }
            }
        }

        Ok(record.clone())
    }
}
