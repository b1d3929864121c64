// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! drumsync - a look-ahead metronome for drum practice along with videos.
//!
//! The click is scheduled slightly ahead of time against the audio device's
//! own clock, so timer jitter never reaches the output. Around the engine
//! sit a video player seam, tempo detection helpers, configuration with hot
//! reload and a terminal front end.

pub mod audio;
pub mod config;
pub mod control;
pub mod detection;
pub mod metronome;
pub mod player;
pub mod timing;
pub mod ui;

pub use metronome::{Metronome, MetronomeError, MetronomeSnapshot};
