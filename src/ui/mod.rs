// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for drumsync.
//!
//! Provides a ratatui-based terminal interface with the transport line, a
//! beat indicator, video and tempo status, and a help overlay.

mod session;
mod transport;

pub use session::PracticeSession;
pub use transport::{BeatIndicatorWidget, TransportWidget};

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tracing::warn;

use crate::config::{ConfigEvent, ConfigWatcher};
use crate::control::{ControlAction, KeyboardController};
use crate::detection::BpmEstimate;
use crate::player::VideoPlayer;

/// How long a status message stays up
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// UI-only state
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Help text visible
    pub show_help: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
    /// Taps in the current tap-tempo sequence
    pub tap_count: usize,
    /// Loaded video
    pub video_id: Option<String>,
    /// Last detected tempo
    pub detected: Option<BpmEstimate>,
    /// Digits typed so far while entering a tempo
    pub tempo_entry: Option<String>,
}

impl UiState {
    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }
}

/// Terminal UI application
pub struct App {
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Target frame rate
    frame_rate: u32,
    /// Whether to continue running
    running: bool,
}

impl App {
    /// Take over the terminal
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            frame_rate: 60,
            running: true,
        })
    }

    /// Set frame rate
    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = fps.clamp(1, 120);
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop the app
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Run until the user quits.
    ///
    /// `on_frame` is called once per frame with the time since the previous
    /// frame, for hosts that drive simulated clocks or players.
    pub fn run<P, F>(
        &mut self,
        session: &mut PracticeSession<P>,
        watcher: Option<&ConfigWatcher>,
        mut on_frame: F,
    ) -> io::Result<()>
    where
        P: VideoPlayer,
        F: FnMut(&mut PracticeSession<P>, Duration),
    {
        let mut last_frame = Instant::now();

        while self.running {
            self.draw(session)?;

            if let Some(Event::Key(key)) = self.poll_event()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(ControlAction::Quit) = session.handle_key(key.code, key.modifiers) {
                        self.quit();
                    }
                }
            }

            if let Some(watcher) = watcher {
                for event in watcher.recv_all() {
                    match event {
                        ConfigEvent::Reloaded(config) => session.apply_config(&config),
                        ConfigEvent::Error(message) => {
                            warn!("{}", message);
                            session.ui_mut().set_status("Config error, keeping previous settings");
                        }
                    }
                }
            }

            let now = Instant::now();
            on_frame(session, now.duration_since(last_frame));
            last_frame = now;
            session.update(now);
        }

        Ok(())
    }

    /// Poll for events with timeout
    pub fn poll_event(&self) -> io::Result<Option<Event>> {
        let timeout = Duration::from_millis(1000 / self.frame_rate as u64);
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }

    /// Draw the UI
    pub fn draw<P: VideoPlayer>(&mut self, session: &PracticeSession<P>) -> io::Result<()> {
        let snapshot = session.snapshot();
        let mode = session.mode();
        let ui = session.ui();
        let keyboard = session.keyboard();
        let player = session.sync().player();

        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Transport
                    Constraint::Length(3), // Beats
                    Constraint::Length(5), // Video
                    Constraint::Min(0),    // Spacer
                    Constraint::Length(1), // Status bar
                ])
                .split(area);

            frame.render_widget(
                TransportWidget::new(&snapshot, mode)
                    .block(Block::default().borders(Borders::ALL).title(" Metronome ")),
                chunks[0],
            );

            let beats_block = Block::default().borders(Borders::ALL).title(" Beat ");
            let beats_area = beats_block.inner(chunks[1]);
            frame.render_widget(beats_block, chunks[1]);
            frame.render_widget(BeatIndicatorWidget::new(&snapshot), beats_area);

            render_video(frame, chunks[2], ui, player);
            render_status_bar(frame, chunks[4], ui);

            if ui.show_help {
                render_help_overlay(frame, area, keyboard);
            }
        })?;

        Ok(())
    }

    /// Cleanup terminal on drop
    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Format seconds as m:ss
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Render video and detection section
fn render_video<P: VideoPlayer>(frame: &mut Frame, area: Rect, ui: &UiState, player: &P) {
    let block = Block::default().borders(Borders::ALL).title(" Video ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    match &ui.video_id {
        Some(id) => lines.push(Line::from(vec![
            Span::styled(id.clone(), Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                "  {:?}  {} / {}",
                player.state(),
                format_time(player.current_time()),
                format_time(player.duration())
            )),
        ])),
        None => lines.push(Line::from(Span::styled(
            "No video loaded",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    if let Some(estimate) = &ui.detected {
        let mut text = format!("Tempo {} BPM from {}", estimate.bpm, estimate.source);
        if let Some(confidence) = estimate.confidence {
            text.push_str(&format!(" ({:.0}% confident)", confidence * 100.0));
        }
        lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Magenta))));
        if let Some(info) = &estimate.song_info {
            lines.push(Line::from(info.clone()));
        }
    }

    if ui.tap_count > 0 {
        lines.push(Line::from(Span::styled(
            format!("Tap tempo: {} taps", ui.tap_count),
            Style::default().fg(Color::Yellow),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render status bar
fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if let Some(entry) = &state.tempo_entry {
        Span::styled(
            format!(" Tempo: {}_  (Enter to set, Esc to cancel)", entry),
            Style::default().fg(Color::Cyan),
        )
    } else if let Some(ref msg) = state.status_message {
        Span::styled(msg, Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " Space: Play/Pause | Enter: With Video | m: Click Only | ↑/↓: Tempo | t: Tap | h: Help | q: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}

/// Help lines from the live key bindings, one section per category
fn help_lines(keyboard: &KeyboardController) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (category, bindings) in keyboard.sections() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            category.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for binding in bindings {
            lines.push(Line::from(format!(
                "  {:<12}{}",
                binding.shortcut.to_string(),
                binding.description
            )));
        }
    }
    lines
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect, keyboard: &KeyboardController) {
    let lines = help_lines(keyboard);

    let width = 44.min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);
    frame.render_widget(Paragraph::new(lines), inner);
}
