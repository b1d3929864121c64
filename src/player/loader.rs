// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! One-time loading of the embedded player API.
//!
//! Every caller awaits the same in-flight load. A failed load leaves the
//! loader uninitialized so the next caller can try again.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::PlayerError;

/// Where the player API comes from
#[async_trait]
pub trait ApiSource: Send + Sync {
    async fn load(&self) -> Result<(), PlayerError>;
}

/// Loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Uninitialized,
    Loading,
    Ready,
}

/// Shared, retryable loader
#[derive(Debug)]
pub struct EmbedApiLoader<S> {
    source: S,
    ready: OnceCell<()>,
    loading: AtomicBool,
}

/// Clears the loading flag even if the load future is dropped mid-way
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: ApiSource> EmbedApiLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            ready: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LoaderState {
        if self.ready.initialized() {
            LoaderState::Ready
        } else if self.loading.load(Ordering::Acquire) {
            LoaderState::Loading
        } else {
            LoaderState::Uninitialized
        }
    }

    /// Load the API once. Resolves immediately when already loaded.
    pub async fn ensure_loaded(&self) -> Result<(), PlayerError> {
        self.ready
            .get_or_try_init(|| async {
                self.loading.store(true, Ordering::Release);
                let _guard = LoadingGuard(&self.loading);
                debug!("Loading player API");

                match self.source.load().await {
                    Ok(()) => {
                        info!("Player API ready");
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Player API failed to load: {}", e);
                        Err(e)
                    }
                }
            })
            .await
            .map(|_| ())
    }
}
