// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Detection requests from synchronous callers.
//!
//! The terminal front end cannot await, so requests are spawned on the
//! runtime and their results come back as [`TempoEvent`]s, drained once per
//! frame.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::analysis::{TempoAnalysis, TempoAnalyzer};
use super::pipeline::{BpmPipeline, CatalogTrack, TitleLookup};
use super::proxy::is_valid_source_url;
use super::votes::{Vote, VoteRecord, VoteStore};
use super::{BpmEstimate, DetectionError};

/// Object-safe view of a [`BpmPipeline`]
#[async_trait]
pub trait TempoSource: Send + Sync {
    async fn detect(&self, video_url: &str) -> Option<BpmEstimate>;

    async fn submit_manual(
        &self,
        video_url: &str,
        video_title: Option<&str>,
        bpm: i64,
    ) -> Option<BpmEstimate>;

    async fn vote(&self, video_url: &str, vote: Vote) -> Result<VoteRecord, DetectionError>;
}

#[async_trait]
impl<V, T, A> TempoSource for BpmPipeline<V, T, A>
where
    V: VoteStore,
    T: TitleLookup,
    A: TempoAnalyzer,
{
    async fn detect(&self, video_url: &str) -> Option<BpmEstimate> {
        BpmPipeline::detect(self, video_url).await
    }

    async fn submit_manual(
        &self,
        video_url: &str,
        video_title: Option<&str>,
        bpm: i64,
    ) -> Option<BpmEstimate> {
        BpmPipeline::submit_manual(self, video_url, video_title, bpm).await
    }

    async fn vote(&self, video_url: &str, vote: Vote) -> Result<VoteRecord, DetectionError> {
        BpmPipeline::vote(self, video_url, vote).await
    }
}

/// Result of a spawned request
#[derive(Debug, Clone, PartialEq)]
pub enum TempoEvent {
    /// Detection finished; `None` when every step came up empty
    Detected {
        video_url: String,
        estimate: Option<BpmEstimate>,
    },
    /// A typed tempo was saved for the video
    Saved {
        video_url: String,
        estimate: BpmEstimate,
    },
    /// A vote was recorded
    Voted(VoteRecord),
    /// A request could not be carried out
    Failed(String),
}

/// Spawns detection work and collects the results
pub struct TempoRequests {
    source: Arc<dyn TempoSource>,
    runtime: Handle,
    tx: UnboundedSender<TempoEvent>,
    rx: UnboundedReceiver<TempoEvent>,
}

impl TempoRequests {
    pub fn new(source: Arc<dyn TempoSource>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            tx,
            rx,
        }
    }

    /// Look up a tempo for `video_url`
    pub fn detect(&self, video_url: &str) {
        if !is_valid_source_url(video_url) {
            warn!("Not detecting tempo for {}", video_url);
            let _ = self
                .tx
                .send(TempoEvent::Failed(DetectionError::InvalidUrl(video_url.to_string()).to_string()));
            return;
        }
        debug!("Detecting tempo for {}", video_url);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let video_url = video_url.to_string();
        self.runtime.spawn(async move {
            let estimate = source.detect(&video_url).await;
            let _ = tx.send(TempoEvent::Detected { video_url, estimate });
        });
    }

    /// Save a typed tempo for `video_url`
    pub fn submit_manual(&self, video_url: &str, video_title: Option<String>, bpm: i64) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let video_url = video_url.to_string();
        self.runtime.spawn(async move {
            let event = match source
                .submit_manual(&video_url, video_title.as_deref(), bpm)
                .await
            {
                Some(estimate) => TempoEvent::Saved { video_url, estimate },
                None => TempoEvent::Failed(format!("{} BPM is out of range", bpm)),
            };
            let _ = tx.send(event);
        });
    }

    /// Vote on the saved tempo for `video_url`
    pub fn vote(&self, video_url: &str, vote: Vote) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let video_url = video_url.to_string();
        self.runtime.spawn(async move {
            let event = match source.vote(&video_url, vote).await {
                Ok(record) => TempoEvent::Voted(record),
                Err(e) => TempoEvent::Failed(format!("Vote failed: {}", e)),
            };
            let _ = tx.send(event);
        });
    }

    /// Next finished request, without blocking
    pub fn try_recv(&mut self) -> Option<TempoEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next finished request
    pub async fn recv(&mut self) -> Option<TempoEvent> {
        self.rx.recv().await
    }
}

/// Stand-in for the title service and the audio analyser when neither is
/// configured. Title lookups find nothing; analysis always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl TitleLookup for Unavailable {
    async fn video_title(&self, _video_url: &str) -> Result<Option<String>, DetectionError> {
        Ok(None)
    }

    async fn search(&self, _query: &str) -> Result<Option<CatalogTrack>, DetectionError> {
        Ok(None)
    }
}

#[async_trait]
impl TempoAnalyzer for Unavailable {
    async fn analyze(&self, _source_url: &str) -> Result<TempoAnalysis, DetectionError> {
        Err(DetectionError::Service("audio analysis is not configured".to_string()))
    }
}
