// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for keyboard input.
//!
//! Keys map to [`ControlAction`]s; the terminal front end applies them to the
//! metronome and the sync controller.

pub mod keyboard;

pub use keyboard::{KeyBinding, KeyCategory, KeyboardController, Shortcut};

/// Action that can be triggered by controls
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    // Transport
    /// Toggle play/pause
    TogglePlay,
    /// Play video and metronome together
    PlayTogether,
    /// Start the metronome without the video
    MetronomeOnly,
    /// Pause playback
    Pause,
    /// Stop playback
    Stop,

    // Tempo
    /// Adjust tempo by delta BPM
    AdjustTempo(i64),
    /// Tap tempo
    TapTempo,
    /// Cycle 4/4, 3/4, 6/8, 2/4
    CycleTimeSignature,
    /// Cycle quarters, eighths, sixteenths
    CycleSubdivision,
    /// Type a tempo and save it for the loaded video
    EnterTempo,
    /// Agree with the detected tempo
    VoteUp,
    /// Disagree with the detected tempo, suggesting the current one
    VoteDown,

    // Output
    /// Adjust volume by delta
    AdjustVolume(f32),

    // UI
    /// Toggle help display
    ToggleHelp,
    /// Quit application
    Quit,
}

impl ControlAction {
    /// Check if this is a transport action
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ControlAction::TogglePlay
                | ControlAction::PlayTogether
                | ControlAction::MetronomeOnly
                | ControlAction::Pause
                | ControlAction::Stop
        )
    }

    /// Check if this is a tempo or meter action
    pub fn is_tempo(&self) -> bool {
        matches!(
            self,
            ControlAction::AdjustTempo(_)
                | ControlAction::TapTempo
                | ControlAction::CycleTimeSignature
                | ControlAction::CycleSubdivision
                | ControlAction::EnterTempo
                | ControlAction::VoteUp
                | ControlAction::VoteDown
        )
    }

    /// Parse an action name as written in a config file.
    ///
    /// Accepts the plain names (`toggle_play`, `tap_tempo`, ...) plus
    /// `tempo+N`, `tempo-N`, `volume+N` and `volume-N`, where volume steps are
    /// percent.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let action = match name.as_str() {
            "toggle_play" => ControlAction::TogglePlay,
            "play_together" => ControlAction::PlayTogether,
            "metronome_only" => ControlAction::MetronomeOnly,
            "pause" => ControlAction::Pause,
            "stop" => ControlAction::Stop,
            "tap_tempo" => ControlAction::TapTempo,
            "cycle_time_signature" => ControlAction::CycleTimeSignature,
            "cycle_subdivision" => ControlAction::CycleSubdivision,
            "enter_tempo" => ControlAction::EnterTempo,
            "vote_up" => ControlAction::VoteUp,
            "vote_down" => ControlAction::VoteDown,
            "toggle_help" => ControlAction::ToggleHelp,
            "quit" => ControlAction::Quit,
            other => {
                if let Some(step) = other.strip_prefix("tempo") {
                    return parse_step(step).map(ControlAction::AdjustTempo);
                }
                if let Some(step) = other.strip_prefix("volume") {
                    return parse_step(step)
                        .map(|percent| ControlAction::AdjustVolume(percent as f32 / 100.0));
                }
                return None;
            }
        };
        Some(action)
    }
}

/// "+5" or "-10"; the sign is required
fn parse_step(step: &str) -> Option<i64> {
    if !step.starts_with(&['+', '-'][..]) {
        return None;
    }
    step.parse().ok().filter(|n: &i64| *n != 0)
}
