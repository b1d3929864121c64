// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Video title cleanup for catalog search.
//!
//! Strips the usual upload decorations ("(Official Video)", "[MV]",
//! "(Lyrics)", ...) and anything after a `|`. Matching ignores ASCII case
//! and allows any run of whitespace where a space may appear.

/// One element of a decoration pattern
#[derive(Debug, Clone, Copy)]
enum Piece {
    /// Literal text, ASCII case-insensitive
    Lit(&'static str),
    /// Zero or more whitespace characters
    Ws,
    /// The inner pieces, or nothing
    Opt(&'static [Piece]),
}

use Piece::{Lit, Opt, Ws};

const MUSIC: &[Piece] = &[Lit("music"), Ws];
const PLURAL: &[Piece] = &[Lit("s")];

const DECORATIONS: &[&[Piece]] = &[
    &[Lit("(official"), Ws, Opt(MUSIC), Lit("video)")],
    &[Lit("(official"), Ws, Lit("audio)")],
    &[Lit("[official"), Ws, Opt(MUSIC), Lit("video]")],
    &[Lit("[mv]")],
    &[Lit("(mv)")],
    &[Lit("(lyric"), Opt(PLURAL), Lit(")")],
    &[Lit("[lyric"), Opt(PLURAL), Lit("]")],
    &[Lit("(가사)")],
    &[Lit("official"), Ws, Lit("mv")],
    &[Lit("m/v")],
];

/// End offset if `pieces` match `text` starting at `pos`
fn match_at(text: &str, pos: usize, pieces: &[Piece]) -> Option<usize> {
    let Some((first, rest)) = pieces.split_first() else {
        return Some(pos);
    };

    match first {
        Lit(lit) => {
            let candidate = text.as_bytes().get(pos..pos + lit.len())?;
            if candidate.eq_ignore_ascii_case(lit.as_bytes()) {
                match_at(text, pos + lit.len(), rest)
            } else {
                None
            }
        }
        Ws => {
            let skipped: usize = text[pos..]
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            match_at(text, pos + skipped, rest)
        }
        Opt(inner) => match_at(text, pos, inner)
            .and_then(|end| match_at(text, end, rest))
            .or_else(|| match_at(text, pos, rest)),
    }
}

/// Remove every non-overlapping occurrence of `pieces`, scanning left to right
fn strip(text: &str, pieces: &[Piece]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < text.len() {
        match match_at(text, pos, pieces) {
            Some(end) if end > pos => pos = end,
            _ => {
                let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[pos..pos + ch_len]);
                pos += ch_len;
            }
        }
    }

    out
}

/// Clean a video title into a catalog search query
pub fn clean_title(title: &str) -> String {
    let mut cleaned = DECORATIONS
        .iter()
        .fold(title.to_string(), |acc, pieces| strip(&acc, pieces));

    if let Some(bar) = cleaned.find('|') {
        cleaned.truncate(bar);
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_official_video_variants() {
        assert_eq!(clean_title("Song (Official Video)"), "Song");
        assert_eq!(clean_title("Song (official music video)"), "Song");
        assert_eq!(clean_title("Song (OfficialMusicVideo)"), "Song");
        assert_eq!(clean_title("Song [Official  Music Video] extra"), "Song extra");
        assert_eq!(clean_title("Song (Official Audio)"), "Song");
    }

    #[test]
    fn test_mv_and_lyrics() {
        assert_eq!(clean_title("[MV] Artist - Song"), "Artist - Song");
        assert_eq!(clean_title("Artist - Song (mv)"), "Artist - Song");
        assert_eq!(clean_title("Artist - Song (Lyrics)"), "Artist - Song");
        assert_eq!(clean_title("Artist - Song [Lyric]"), "Artist - Song");
        assert_eq!(clean_title("Artist - Song (가사)"), "Artist - Song");
        assert_eq!(clean_title("Artist 'Song' Official MV"), "Artist 'Song'");
        assert_eq!(clean_title("Artist - Song M/V"), "Artist - Song");
    }

    #[test]
    fn test_pipe_suffix_and_whitespace() {
        assert_eq!(
            clean_title("  Artist   -  Song | Live at Venue | 2024"),
            "Artist - Song"
        );
        assert_eq!(clean_title("| nothing before"), "");
    }

    #[test]
    fn test_plain_title_unchanged() {
        assert_eq!(clean_title("Toto - Rosanna"), "Toto - Rosanna");
        assert_eq!(clean_title("Video Killed the Radio Star"), "Video Killed the Radio Star");
    }
}
