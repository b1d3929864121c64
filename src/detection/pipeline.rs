// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo discovery for a video.
//!
//! Tries, in order: a saved community tempo, a catalog lookup by cleaned
//! video title, and audio analysis. Every step runs under its own deadline;
//! a failing step is logged and the next one is tried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::analysis::{post_process, TempoAnalyzer};
use super::title::clean_title;
use super::votes::{Vote, VoteRecord, VoteStore};
use super::{BpmEstimate, BpmSource, DetectionError};
use crate::metronome::{clamp_bpm, MAX_BPM, MIN_BPM};

/// A catalog entry found by title search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub artist: String,
    pub title: String,
    /// Catalog tempo; 0 when unknown
    pub bpm: f64,
}

/// Video title lookup and catalog search
#[async_trait]
pub trait TitleLookup: Send + Sync {
    /// Title of the video behind `video_url`
    async fn video_title(&self, video_url: &str) -> Result<Option<String>, DetectionError>;

    /// Best catalog match for a search query
    async fn search(&self, query: &str) -> Result<Option<CatalogTrack>, DetectionError>;
}

/// Step deadlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for title lookup plus catalog search
    pub title_timeout_secs: u64,
    /// Deadline for audio analysis
    pub analysis_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title_timeout_secs: 10,
            analysis_timeout_secs: 8,
        }
    }
}

async fn within<F, T>(step: &'static str, limit: Duration, fut: F) -> Result<T, DetectionError>
where
    F: Future<Output = Result<T, DetectionError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DetectionError::Timeout { step, after: limit })?
}

/// The detection pipeline
#[derive(Debug)]
pub struct BpmPipeline<V, T, A> {
    votes: V,
    titles: T,
    analyzer: A,
    config: PipelineConfig,
}

impl<V, T, A> BpmPipeline<V, T, A>
where
    V: VoteStore,
    T: TitleLookup,
    A: TempoAnalyzer,
{
    pub fn new(votes: V, titles: T, analyzer: A) -> Self {
        Self::with_config(votes, titles, analyzer, PipelineConfig::default())
    }

    pub fn with_config(votes: V, titles: T, analyzer: A, config: PipelineConfig) -> Self {
        Self {
            votes,
            titles,
            analyzer,
            config,
        }
    }

    pub fn votes(&self) -> &V {
        &self.votes
    }

    /// Find a tempo for `video_url`, or nothing
    pub async fn detect(&self, video_url: &str) -> Option<BpmEstimate> {
        match self.saved(video_url).await {
            Ok(Some(estimate)) => return Some(estimate),
            Ok(None) => debug!("No saved tempo for {}", video_url),
            Err(e) => warn!("Saved tempo lookup failed: {}", e),
        }

        let limit = Duration::from_secs(self.config.title_timeout_secs);
        match within("title lookup", limit, self.catalog(video_url)).await {
            Ok(Some(estimate)) => return Some(estimate),
            Ok(None) => debug!("Catalog has no tempo for {}", video_url),
            Err(e) => warn!("Title lookup failed: {}", e),
        }

        let limit = Duration::from_secs(self.config.analysis_timeout_secs);
        match within("audio analysis", limit, self.analyzer.analyze(video_url)).await {
            Ok(analysis) => {
                let result = post_process(&analysis);
                info!(
                    "Analysed tempo {} BPM (confidence {:.2})",
                    result.bpm, result.confidence
                );
                Some(BpmEstimate {
                    bpm: result.bpm,
                    source: BpmSource::Audio,
                    confidence: Some(result.confidence),
                    song_info: None,
                })
            }
            Err(e) => {
                warn!("Audio analysis failed: {}", e);
                None
            }
        }
    }

    async fn saved(&self, video_url: &str) -> Result<Option<BpmEstimate>, DetectionError> {
        Ok(self.votes.saved(video_url).await?.map(|record| {
            info!("Using saved tempo {} BPM", record.bpm);
            BpmEstimate {
                bpm: clamp_bpm(record.bpm as i64),
                source: record.source(),
                confidence: None,
                song_info: record.video_title.clone(),
            }
        }))
    }

    async fn catalog(&self, video_url: &str) -> Result<Option<BpmEstimate>, DetectionError> {
        let Some(title) = self.titles.video_title(video_url).await? else {
            return Ok(None);
        };
        let query = clean_title(&title);
        if query.is_empty() {
            return Ok(None);
        }
        debug!("Searching catalog for {:?}", query);

        let Some(track) = self.titles.search(&query).await? else {
            return Ok(None);
        };
        if !(track.bpm > 0.0) {
            debug!("Catalog match {} - {} has no tempo", track.artist, track.title);
            return Ok(None);
        }

        let bpm = clamp_bpm(track.bpm.round() as i64);
        info!("Catalog tempo {} BPM for {} - {}", bpm, track.artist, track.title);
        Ok(Some(BpmEstimate {
            bpm,
            source: BpmSource::Catalog,
            confidence: None,
            song_info: Some(format!("{} - {}", track.artist, track.title)),
        }))
    }

    /// Accept a typed tempo and remember it for the video.
    ///
    /// Values outside 30..=300 are rejected, not clamped.
    pub async fn submit_manual(
        &self,
        video_url: &str,
        video_title: Option<&str>,
        bpm: i64,
    ) -> Option<BpmEstimate> {
        if !(MIN_BPM as i64..=MAX_BPM as i64).contains(&bpm) {
            warn!("Manual tempo {} out of range", bpm);
            return None;
        }
        let bpm = bpm as u32;

        if let Err(e) = self.votes.save(video_url, video_title, bpm).await {
            warn!("Failed to save manual tempo: {}", e);
        }

        Some(BpmEstimate {
            bpm,
            source: BpmSource::Manual,
            confidence: None,
            song_info: video_title.map(str::to_string),
        })
    }

    /// Vote on the saved tempo for `video_url`
    pub async fn vote(&self, video_url: &str, vote: Vote) -> Result<VoteRecord, DetectionError> {
        let record = self.votes.vote(video_url, vote).await?;
        info!(
            "Votes for {}: {} up, {} down, {} BPM",
            video_url, record.upvotes, record.downvotes, record.bpm
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::analysis::TempoAnalysis;
    use crate::detection::votes::MemoryVoteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[derive(Default)]
    struct FakeCatalog {
        title: Option<String>,
        track: Option<CatalogTrack>,
        hang: bool,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl TitleLookup for FakeCatalog {
        async fn video_title(&self, _video_url: &str) -> Result<Option<String>, DetectionError> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(self.title.clone())
        }

        async fn search(&self, query: &str) -> Result<Option<CatalogTrack>, DetectionError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            assert!(!query.contains("Official"));
            Ok(self.track.clone())
        }
    }

    struct FakeAnalyzer(Result<TempoAnalysis, DetectionError>);

    #[async_trait]
    impl TempoAnalyzer for FakeAnalyzer {
        async fn analyze(&self, _source_url: &str) -> Result<TempoAnalysis, DetectionError> {
            self.0.clone()
        }
    }

    fn catalog_with(bpm: f64) -> FakeCatalog {
        FakeCatalog {
            title: Some("Artist - Song (Official Video)".to_string()),
            track: Some(CatalogTrack {
                artist: "Artist".to_string(),
                title: "Song".to_string(),
                bpm,
            }),
            ..Default::default()
        }
    }

    fn analyzer_with(tempo: f64) -> FakeAnalyzer {
        FakeAnalyzer(Ok(TempoAnalysis {
            tempo,
            beats: vec![],
        }))
    }

    #[tokio::test]
    async fn test_saved_tempo_wins() {
        let votes = MemoryVoteStore::new();
        votes.save(URL, Some("Saved"), 101).await.unwrap();
        let pipeline = BpmPipeline::new(votes, catalog_with(130.0), analyzer_with(90.0));

        let estimate = pipeline.detect(URL).await.unwrap();
        assert_eq!(estimate.bpm, 101);
        assert_eq!(estimate.source, BpmSource::Community);
        assert_eq!(pipeline.titles.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_verified_saved_tempo() {
        let votes = MemoryVoteStore::new();
        votes.save(URL, None, 101).await.unwrap();
        for _ in 0..3 {
            votes.vote(URL, Vote::Up).await.unwrap();
        }
        let pipeline = BpmPipeline::new(votes, catalog_with(130.0), analyzer_with(90.0));
        assert_eq!(
            pipeline.detect(URL).await.unwrap().source,
            BpmSource::Verified
        );
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let pipeline = BpmPipeline::new(
            MemoryVoteStore::new(),
            catalog_with(127.6),
            analyzer_with(90.0),
        );
        let estimate = pipeline.detect(URL).await.unwrap();
        assert_eq!(estimate.bpm, 128);
        assert_eq!(estimate.source, BpmSource::Catalog);
        assert_eq!(estimate.song_info.as_deref(), Some("Artist - Song"));
    }

    #[tokio::test]
    async fn test_catalog_without_tempo_falls_back_to_analysis() {
        let pipeline = BpmPipeline::new(
            MemoryVoteStore::new(),
            catalog_with(0.0),
            analyzer_with(244.0),
        );
        let estimate = pipeline.detect(URL).await.unwrap();
        assert_eq!(estimate.bpm, 122);
        assert_eq!(estimate.source, BpmSource::Audio);
        assert!(estimate.confidence.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_title_lookup_times_out() {
        let catalog = FakeCatalog {
            hang: true,
            ..catalog_with(130.0)
        };
        let pipeline = BpmPipeline::new(MemoryVoteStore::new(), catalog, analyzer_with(96.0));
        let estimate = pipeline.detect(URL).await.unwrap();
        assert_eq!(estimate.source, BpmSource::Audio);
        assert_eq!(estimate.bpm, 96);
    }

    #[tokio::test]
    async fn test_everything_fails() {
        let pipeline = BpmPipeline::new(
            MemoryVoteStore::new(),
            FakeCatalog::default(),
            FakeAnalyzer(Err(DetectionError::Service("decode failed".to_string()))),
        );
        assert_eq!(pipeline.detect(URL).await, None);
    }

    #[tokio::test]
    async fn test_manual_entry() {
        let pipeline = BpmPipeline::new(
            MemoryVoteStore::new(),
            FakeCatalog::default(),
            analyzer_with(90.0),
        );
        assert_eq!(pipeline.submit_manual(URL, Some("Song"), 301).await, None);
        assert!(pipeline.votes().is_empty());

        let estimate = pipeline.submit_manual(URL, Some("Song"), 88).await.unwrap();
        assert_eq!(estimate.bpm, 88);
        assert_eq!(estimate.source, BpmSource::Manual);

        // The typed value becomes the saved tempo
        assert_eq!(pipeline.detect(URL).await.unwrap().bpm, 88);
    }

    #[tokio::test]
    async fn test_votes_through_pipeline() {
        let pipeline = BpmPipeline::new(
            MemoryVoteStore::new(),
            FakeCatalog::default(),
            analyzer_with(90.0),
        );
        assert_eq!(
            pipeline.vote(URL, Vote::Up).await,
            Err(DetectionError::NotFound(URL.to_string()))
        );

        pipeline.submit_manual(URL, None, 100).await.unwrap();
        let record = pipeline
            .vote(URL, Vote::Down { corrected_bpm: Some(104) })
            .await
            .unwrap();
        assert_eq!((record.bpm, record.downvotes), (104, 1));
        assert_eq!(pipeline.detect(URL).await.unwrap().bpm, 104);
    }
}
