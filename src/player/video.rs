// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Video ids, watch URLs and thumbnails.

/// Length of every video id
pub const VIDEO_ID_LEN: usize = 11;

/// Check that `id` is exactly 11 characters of `[A-Za-z0-9_-]`
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN && id.bytes().all(is_id_byte)
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// The first 11 characters of `s`, if they form a valid id
fn id_prefix(s: &str) -> Option<&str> {
    s.get(..VIDEO_ID_LEN).filter(|id| is_valid_video_id(id))
}

/// The pieces of an absolute URL this crate cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UrlParts<'a> {
    /// Lower-cased host name, without port or credentials
    pub host: String,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// Parse `scheme://authority/path?query#fragment`
    pub fn parse(input: &'a str) -> Option<Self> {
        let (scheme, rest) = input.split_once("://")?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return None;
        }

        let rest = rest.split('#').next().unwrap_or_default();
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        let host_port = authority.rsplit('@').next().unwrap_or_default();
        let host = host_port.split(':').next().unwrap_or_default();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return None;
        }

        let (path, query) = match tail.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (tail, None),
        };

        Some(Self {
            host: host.to_ascii_lowercase(),
            path,
            query,
        })
    }

    /// First value of query parameter `key`
    pub fn query_param(&self, key: &str) -> Option<&'a str> {
        self.query?
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Extract a video id from a bare id or any common watch URL form.
///
/// Accepts `watch?v=ID`, `/embed/ID`, `/v/ID` on youtube.com hosts and
/// `youtu.be/ID`. Returns None for anything else.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_valid_video_id(trimmed) {
        return Some(trimmed.to_string());
    }

    let id = match UrlParts::parse(trimmed) {
        Some(url) => from_url(&url),
        None => from_loose_text(trimmed),
    };
    id.map(str::to_string)
}

fn from_url<'a>(url: &UrlParts<'a>) -> Option<&'a str> {
    if url.host.contains("youtube.com") {
        if let Some(id) = url.query_param("v").filter(|v| is_valid_video_id(v)) {
            return Some(id);
        }
        for marker in ["/embed/", "/v/"] {
            if let Some(id) = url
                .path
                .find(marker)
                .and_then(|at| id_prefix(&url.path[at + marker.len()..]))
            {
                return Some(id);
            }
        }
    }

    if url.host == "youtu.be" {
        let first = url.path.trim_start_matches('/').split('/').next()?;
        if is_valid_video_id(first) {
            return Some(first);
        }
    }

    None
}

/// Scheme-less input such as `youtu.be/ID` or `www.youtube.com/watch?v=ID`
fn from_loose_text(text: &str) -> Option<&str> {
    const MARKERS: [&str; 4] = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/embed/",
        "youtube.com/v/",
    ];

    // Earliest occurrence of any marker wins
    MARKERS
        .iter()
        .filter_map(|marker| text.find(marker).map(|at| (at, at + marker.len())))
        .min_by_key(|(at, _)| *at)
        .and_then(|(_, start)| id_prefix(&text[start..]))
}

/// Canonical watch URL for an id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Thumbnail sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailQuality {
    Default,
    Medium,
    #[default]
    High,
    Standard,
    MaxRes,
}

impl ThumbnailQuality {
    fn file_stem(self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default",
            ThumbnailQuality::Medium => "mqdefault",
            ThumbnailQuality::High => "hqdefault",
            ThumbnailQuality::Standard => "sddefault",
            ThumbnailQuality::MaxRes => "maxresdefault",
        }
    }
}

/// Thumbnail image URL for an id
pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!(
        "https://img.youtube.com/vi/{}/{}.jpg",
        video_id,
        quality.file_stem()
    )
}
