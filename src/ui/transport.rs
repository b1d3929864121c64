// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport and beat indicator widgets.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

use crate::metronome::MetronomeSnapshot;
use crate::player::SyncMode;

/// Transport widget for displaying playback state
pub struct TransportWidget<'a> {
    snapshot: &'a MetronomeSnapshot,
    mode: SyncMode,
    block: Option<Block<'a>>,
}

impl<'a> TransportWidget<'a> {
    /// Create a new transport widget
    pub fn new(snapshot: &'a MetronomeSnapshot, mode: SyncMode) -> Self {
        Self {
            snapshot,
            mode,
            block: None,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Play indicator text for the transport line
pub(crate) fn play_label(playing: bool, mode: SyncMode) -> &'static str {
    match (playing, mode) {
        (true, SyncMode::MetronomeOnly) => "▶ CLICK",
        (true, _) => "▶ PLAY",
        (false, SyncMode::Together) => "… WAIT",
        (false, _) => "■ STOP",
    }
}

impl Widget for TransportWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(10), // Play/Stop indicator
                Constraint::Length(2),  // Spacer
                Constraint::Length(10), // Tempo
                Constraint::Length(2),  // Spacer
                Constraint::Length(6),  // Time signature
                Constraint::Length(2),  // Spacer
                Constraint::Length(6),  // Subdivision
                Constraint::Length(2),  // Spacer
                Constraint::Min(0),     // Volume
            ])
            .split(area);

        let label = play_label(self.snapshot.is_playing, self.mode);
        let style = if self.snapshot.is_playing {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        };
        Paragraph::new(label).style(style).render(chunks[0], buf);

        Paragraph::new(format!("{} BPM", self.snapshot.bpm))
            .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
            .render(chunks[2], buf);

        Paragraph::new(self.snapshot.time_signature.as_str())
            .style(Style::default().fg(Color::White))
            .render(chunks[4], buf);

        Paragraph::new(self.snapshot.subdivision.label())
            .style(Style::default().fg(Color::Cyan))
            .render(chunks[6], buf);

        Paragraph::new(format!("Vol {:>3}%", (self.snapshot.volume * 100.0).round() as u32))
            .style(Style::default().fg(Color::Gray))
            .render(chunks[8], buf);
    }
}

/// One cell per main beat, the current one lit
pub struct BeatIndicatorWidget {
    beats: u32,
    current: u32,
    active: bool,
}

impl BeatIndicatorWidget {
    pub fn new(snapshot: &MetronomeSnapshot) -> Self {
        Self {
            beats: snapshot.time_signature.beats(),
            current: snapshot.current_beat,
            active: snapshot.is_playing,
        }
    }

    fn cell_style(&self, beat: u32) -> Style {
        if !self.active || beat != self.current {
            Style::default().fg(Color::DarkGray)
        } else if beat == 0 {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        }
    }

    /// Indicator as text spans, e.g. `[1] [2] [3] [4]`
    pub fn spans(&self) -> Vec<Span<'static>> {
        let mut spans = Vec::with_capacity(self.beats as usize * 2);
        for beat in 0..self.beats {
            if beat > 0 {
                spans.push(Span::raw(" "));
            }
            let text = if self.active && beat == self.current {
                format!("[{}]", beat + 1)
            } else {
                format!(" {} ", beat + 1)
            };
            spans.push(Span::styled(text, self.cell_style(beat)));
        }
        spans
    }
}

impl Widget for BeatIndicatorWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(Line::from(self.spans())).render(area, buf);
    }
}
