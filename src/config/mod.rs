// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for drumsync.
//!
//! A practice file holds the starting metronome settings, audio output
//! options, scheduler timing, detection deadlines and keyboard overrides.
//! Files ending in `.toml` are TOML; anything else is read as YAML.

pub mod watcher;

pub use watcher::{validate_config, ConfigEvent, ConfigWatcher};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::AudioConfig;
use crate::detection::PipelineConfig;
use crate::metronome::{
    Metronome, MetronomeSnapshot, SchedulerConfig, Subdivision, TimeSignature, DEFAULT_BPM,
};

/// File formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Root of a practice configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeConfig {
    /// Log filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Starting metronome settings
    #[serde(default)]
    pub metronome: MetronomeSettings,
    /// Audio output
    #[serde(default)]
    pub audio: AudioConfig,
    /// Look-ahead scheduler timing
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Tempo detection deadlines
    #[serde(default)]
    pub detection: PipelineConfig,
    /// Key overrides, e.g. `space: toggle_play`
    #[serde(default)]
    pub keyboard: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metronome: MetronomeSettings::default(),
            audio: AudioConfig::default(),
            scheduler: SchedulerConfig::default(),
            detection: PipelineConfig::default(),
            keyboard: HashMap::new(),
        }
    }
}

impl PracticeConfig {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => Self::from_toml(&contents)?,
            ConfigFormat::Yaml => Self::from_yaml(&contents)?,
        };
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults if it is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Save to a file, in the format its extension selects
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => self.to_toml()?,
            ConfigFormat::Yaml => self.to_yaml()?,
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }
}

/// Metronome settings as written in a file.
///
/// Values are passed through the engine's setters, so out-of-range tempos
/// and volumes are clamped rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetronomeSettings {
    pub bpm: i64,
    pub time_signature: TimeSignature,
    pub subdivision: Subdivision,
    pub volume: f32,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM as i64,
            time_signature: TimeSignature::default(),
            subdivision: Subdivision::default(),
            volume: 0.5,
        }
    }
}

impl MetronomeSettings {
    /// Push these settings into a running or stopped metronome
    pub fn apply(&self, metronome: &Metronome) {
        metronome.set_bpm(self.bpm);
        metronome.set_volume(self.volume);

        let current = metronome.tempo();
        if current.time_signature() != self.time_signature {
            metronome.set_time_signature(self.time_signature);
        }
        if current.subdivision() != self.subdivision {
            metronome.set_subdivision(self.subdivision);
        }
    }

    /// Capture the settings of a metronome
    pub fn from_snapshot(snapshot: &MetronomeSnapshot) -> Self {
        Self {
            bpm: snapshot.bpm as i64,
            time_signature: snapshot.time_signature,
            subdivision: snapshot.subdivision,
            volume: snapshot.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::audio::OfflineDevice;

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
log_level: debug
metronome:
  bpm: 96
  time_signature: "6/8"
  subdivision: 2
  volume: 0.8
audio:
  sample_rate: 48000
  buffer_size: 256
keyboard:
  t: tap_tempo
"#;

        let config = PracticeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.metronome.bpm, 96);
        assert_eq!(config.metronome.time_signature, TimeSignature::SixEight);
        assert_eq!(config.metronome.subdivision, Subdivision::Eighth);
        assert_eq!(config.metronome.volume, 0.8);
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.buffer_size, Some(256));
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.keyboard.get("t"), Some(&"tap_tempo".to_string()));
    }

    #[test]
    fn test_parse_toml_config() {
        let text = r#"
log_level = "warn"

[metronome]
bpm = 140
time_signature = "3/4"

[scheduler]
lookahead_ms = 120

[detection]
analysis_timeout_secs = 5
"#;

        let config = PracticeConfig::from_toml(text).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.metronome.bpm, 140);
        assert_eq!(config.metronome.time_signature, TimeSignature::ThreeFour);
        assert_eq!(config.metronome.subdivision, Subdivision::Quarter);
        assert_eq!(config.scheduler.lookahead_ms, 120);
        assert_eq!(config.scheduler.interval_ms, 25);
        assert_eq!(config.detection.analysis_timeout_secs, 5);
        assert_eq!(config.detection.title_timeout_secs, 10);
    }

    #[test]
    fn test_out_of_range_values_use_nearest() {
        let config =
            PracticeConfig::from_yaml("metronome:\n  subdivision: 3\n  time_signature: \"5/4\"\n")
                .unwrap();
        assert_eq!(config.metronome.subdivision, Subdivision::Eighth);
        assert_eq!(config.metronome.time_signature, TimeSignature::FourFour);

        let config = PracticeConfig::from_toml(
            "[metronome]\nsubdivision = 8\ntime_signature = \"7/8\"\nbpm = 90\n",
        )
        .unwrap();
        assert_eq!(config.metronome.subdivision, Subdivision::Sixteenth);
        assert_eq!(config.metronome.time_signature, TimeSignature::FourFour);
        assert_eq!(config.metronome.bpm, 90);
    }

    #[test]
    fn test_default_values() {
        let config = PracticeConfig::from_yaml("{}").unwrap();
        assert_eq!(config, PracticeConfig::default());
        assert_eq!(config.metronome.bpm, 120);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_round_trip_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut original = PracticeConfig::default();
        original.metronome.bpm = 174;
        original.metronome.subdivision = Subdivision::Sixteenth;
        original.keyboard.insert("space".to_string(), "toggle_play".to_string());

        for name in ["practice.yaml", "practice.toml"] {
            let path = dir.path().join(name);
            original.save(&path).unwrap();
            let loaded = PracticeConfig::load(&path).unwrap();
            assert_eq!(loaded, original, "{}", name);
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PracticeConfig::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, PracticeConfig::default());
        assert!(PracticeConfig::load(dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("noext")), ConfigFormat::Yaml);
    }

    #[tokio::test]
    async fn test_apply_clamps_through_setters() {
        let device = Arc::new(OfflineDevice::new());
        let metronome = Metronome::new(device).unwrap();

        let settings = MetronomeSettings {
            bpm: 999,
            time_signature: TimeSignature::TwoFour,
            subdivision: Subdivision::Eighth,
            volume: 1.7,
        };
        settings.apply(&metronome);

        let snapshot = metronome.snapshot();
        assert_eq!(snapshot.bpm, 300);
        assert_eq!(snapshot.volume, 1.0);
        assert_eq!(snapshot.time_signature, TimeSignature::TwoFour);
        assert_eq!(snapshot.subdivision, Subdivision::Eighth);

        let captured = MetronomeSettings::from_snapshot(&snapshot);
        assert_eq!(captured.bpm, 300);
    }
}
