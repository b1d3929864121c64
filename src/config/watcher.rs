// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File watcher for hot-reload configuration.
//!
//! Watches the directory holding the practice file so editors that replace
//! the file on save are still seen, and reloads the file once writes have
//! settled.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::PracticeConfig;

/// Default quiet period before a reload
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// How often the reload thread checks for a settled file
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a reload, delivered to the UI thread
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// The file changed and parsed cleanly
    Reloaded(Box<PracticeConfig>),
    /// The file changed but could not be loaded; keep the previous settings
    Error(String),
}

/// Whether `path` has an extension the loader understands
fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml" | "toml")
    )
}

fn reload(path: &Path) -> ConfigEvent {
    match PracticeConfig::load(path) {
        Ok(config) => ConfigEvent::Reloaded(Box::new(config)),
        Err(e) => {
            warn!("Config reload failed: {:#}", e);
            ConfigEvent::Error(format!("Failed to load {:?}: {:#}", path, e))
        }
    }
}

/// Collapses a burst of writes into one reload
#[derive(Debug, Clone, Copy)]
struct Debounce {
    quiet: Duration,
    pending_since: Option<Instant>,
}

impl Debounce {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending_since: None,
        }
    }

    /// Record a write; restarts the quiet period
    fn touch(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// True once per burst, after the file has been quiet long enough
    fn fire(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.duration_since(since) >= self.quiet => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// Runs on its own thread until either side of the channels goes away
fn reload_loop(
    path: PathBuf,
    file_name: OsString,
    mut debounce: Debounce,
    changes: Receiver<Event>,
    events: Sender<ConfigEvent>,
) {
    loop {
        match changes.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                let touches_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if touches_file && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    debounce.touch(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        if debounce.fire(Instant::now()) {
            debug!("Reloading {:?}", path);
            if events.send(reload(&path)).is_err() {
                return;
            }
        }
    }
}

/// Watches one practice file and reloads it after edits settle
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<ConfigEvent>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watch a single practice file
    ///
    /// # Arguments
    /// * `path` - The configuration file
    /// * `debounce_ms` - Quiet period in milliseconds (default: 500)
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !is_config_file(&path) {
            bail!("Unsupported config file {:?} (expected .yaml, .yml or .toml)", path);
        }
        let Some(file_name) = path.file_name().map(|name| name.to_os_string()) else {
            bail!("Config path {:?} has no file name", path);
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (change_tx, change_rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = change_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", dir))?;

        let (event_tx, event_rx) = mpsc::channel();
        let debounce = Debounce::new(Duration::from_millis(debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)));
        let thread_path = path.clone();
        thread::Builder::new()
            .name("config-reload".into())
            .spawn(move || reload_loop(thread_path, file_name, debounce, change_rx, event_tx))
            .context("Failed to start config reload thread")?;

        Ok(Self {
            _watcher: watcher,
            events: event_rx,
            path,
        })
    }

    /// Next pending event, without blocking
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.events.try_recv().ok()
    }

    /// Every pending event
    pub fn recv_all(&self) -> Vec<ConfigEvent> {
        self.events.try_iter().collect()
    }

    pub fn watched_path(&self) -> &Path {
        &self.path
    }
}

/// Load a practice file without applying it
pub fn validate_config<P: AsRef<Path>>(path: P) -> Result<PracticeConfig> {
    PracticeConfig::load(path)
}
