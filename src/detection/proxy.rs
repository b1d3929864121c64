// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Source URL check for tempo detection.
//!
//! Audio for analysis is fetched by an external proxy that only accepts
//! video host URLs; requests for anything else are refused before they
//! leave the process.

use crate::player::video::UrlParts;

/// Hosts audio may be fetched from
pub const ALLOWED_HOSTS: [&str; 4] = ["www.youtube.com", "youtube.com", "m.youtube.com", "youtu.be"];

/// Whether `url` is an absolute URL on an allowed host
pub fn is_valid_source_url(url: &str) -> bool {
    UrlParts::parse(url.trim())
        .map(|parts| ALLOWED_HOSTS.contains(&parts.host.as_str()))
        .unwrap_or(false)
}
