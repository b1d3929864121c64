// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the audio-hardware clock used for all scheduling
//! math, plus the tap tempo calculator.

pub mod clock;
pub mod tap;

pub use clock::{ClockSource, ClockState, FrameClock};
pub use tap::TapTempo;
