// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo discovery for practice videos.
//!
//! Nothing here touches the metronome directly. The host takes the
//! resulting [`BpmEstimate`] and hands its tempo to
//! [`crate::metronome::Metronome::apply_detected_bpm`].

pub mod analysis;
pub mod pipeline;
pub mod proxy;
pub mod requests;
pub mod title;
pub mod votes;

pub use analysis::{beat_confidence, post_process, AnalysedTempo, TempoAnalysis, TempoAnalyzer};
pub use pipeline::{BpmPipeline, CatalogTrack, PipelineConfig, TitleLookup};
pub use proxy::is_valid_source_url;
pub use requests::{TempoEvent, TempoRequests, TempoSource, Unavailable};
pub use title::clean_title;
pub use votes::{MemoryVoteStore, Vote, VoteRecord, VoteStore};

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a tempo came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmSource {
    /// Saved value confirmed by enough upvotes
    Verified,
    /// Music catalog lookup by title
    Catalog,
    /// Audio analysis
    Audio,
    /// Saved value from another user
    Community,
    /// Typed in by the user
    Manual,
}

impl BpmSource {
    pub fn label(self) -> &'static str {
        match self {
            BpmSource::Verified => "verified",
            BpmSource::Catalog => "catalog",
            BpmSource::Audio => "audio analysis",
            BpmSource::Community => "community",
            BpmSource::Manual => "manual",
        }
    }
}

impl fmt::Display for BpmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A detected tempo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BpmEstimate {
    /// Always within 30..=300
    pub bpm: u32,
    pub source: BpmSource,
    /// Only set by audio analysis
    pub confidence: Option<f64>,
    /// "Artist - Title" or a saved video title
    pub song_info: Option<String>,
}

/// Detection errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    #[error("{step} timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },
    #[error("not an allowed source URL: {0}")]
    InvalidUrl(String),
    #[error("no saved tempo for {0}")]
    NotFound(String),
    #[error("service error: {0}")]
    Service(String),
}
