//! Main Application
//!
//! The App is a thin display client over the embedded Companion:
//! 1. Terminal events become `SurfaceEvent`s
//! 2. `CompanionMessage`s fold into `DisplayState`
//! 3. Rendering draws the display state, nothing else
//!
//! The frame loop polls the Companion every tick, which is what drives
//! stream chunks, playback events, and capture results through the core.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthChar;

use cookie_core::{
    Companion, CompanionConfig, CompanionMessage, HttpBackend, MessageRole, NullRecognizer,
    SurfaceEvent, Theme, ThemeStore, VoiceCoordinator,
};

use crate::avatar::{AvatarFace, FACE_HEIGHT};
use crate::display::DisplayState;
use crate::speech::CommandSynthesizer;
use crate::theme::Palette;

/// Input box height (separator + text lines)
const INPUT_HEIGHT: u16 = 3;

/// Main application state
pub struct App {
    /// Is the app still running?
    running: bool,
    /// The embedded Companion
    companion: Companion<HttpBackend>,
    /// Receiver for messages from the Companion
    rx: mpsc::Receiver<CompanionMessage>,
    /// Display state derived from CompanionMessages
    display: DisplayState,
    /// User input buffer
    input_buffer: String,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered transcript lines (for scroll bounds)
    total_lines: usize,
    /// Theme preference store
    theme_store: ThemeStore,
    /// Active theme
    theme: Theme,
    /// Whether the mic control is shown at all
    mic_supported: bool,
    /// Avatar face animation state
    face: AvatarFace,
    /// Animation tick counter
    tick: usize,
    /// Last frame time
    last_frame: Instant,
    /// Terminal size
    size: (u16, u16),
}

impl App {
    /// Create a new App instance
    pub fn new() -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;

        let (tx, rx) = mpsc::channel(100);
        let voice = VoiceCoordinator::new(
            Box::new(CommandSynthesizer::detect()),
            Box::new(NullRecognizer),
        );
        let companion = Companion::new(
            HttpBackend::from_env(),
            CompanionConfig::from_env(),
            voice,
            tx,
        );
        let mic_supported = companion.mic_supported();

        let theme_store = ThemeStore::from_default_location();
        let theme = theme_store.load();

        Ok(Self {
            running: true,
            companion,
            rx,
            display: DisplayState::new(),
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            theme_store,
            theme,
            mic_supported,
            face: AvatarFace::new(),
            tick: 0,
            last_frame: Instant::now(),
            size,
        })
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~10 FPS is plenty for terminal animation.
        let frame_duration = Duration::from_millis(100);
        let mut event_stream = EventStream::new();

        self.companion.start().await?;
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Mouse(mouse) => self.handle_mouse(mouse),
                            Event::Resize(w, h) => self.size = (w, h),
                            _ => {}
                        }
                    }
                }

                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            // Drive the core: stream chunks, playback, capture results.
            self.companion.poll().await?;
            self.process_messages();
            self.update();
            self.render(terminal)?;

            if self.display.quit_requested {
                self.running = false;
            }

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Fold all pending companion messages into display state
    fn process_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.display.apply_message(msg);
        }
    }

    /// Handle keyboard input
    async fn handle_key(&mut self, key: event::KeyEvent) {
        match key.code {
            KeyCode::Esc => self.request_quit().await,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_quit().await;
            }

            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.theme = self.theme.toggled();
                self.theme_store.save(self.theme);
            }

            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.mic_supported {
                    let _ = self.companion.handle_event(SurfaceEvent::MicToggled).await;
                }
            }

            KeyCode::Enter => {
                // Input is held back while a turn is in flight; the core
                // would reject it anyway, this just keeps the text.
                if !self.display.state.in_flight() && !self.input_buffer.trim().is_empty() {
                    let content = std::mem::take(&mut self.input_buffer);
                    let _ = self
                        .companion
                        .handle_event(SurfaceEvent::UserMessage { content })
                        .await;
                    self.scroll_offset = 0;
                }
            }

            KeyCode::Char(c) => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }

            KeyCode::PageUp => {
                let page = (self.transcript_height() / 2).max(1) as usize;
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page).min(max_scroll);
            }
            KeyCode::PageDown => {
                let page = (self.transcript_height() / 2).max(1) as usize;
                self.scroll_offset = self.scroll_offset.saturating_sub(page);
            }

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: event::MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + 3).min(max_scroll);
            }
            MouseEventKind::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3);
            }
            _ => {}
        }
    }

    /// Ask the companion to shut down
    async fn request_quit(&mut self) {
        let _ = self.companion.handle_event(SurfaceEvent::QuitRequested).await;
        self.running = false;
    }

    /// Update animations
    fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        self.face.update(delta);
        self.tick = self.tick.wrapping_add(1);
    }

    /// Height available to the transcript
    fn transcript_height(&self) -> u16 {
        let banner = u16::from(self.display.banner.is_some());
        self.size
            .1
            .saturating_sub(FACE_HEIGHT + banner + INPUT_HEIGHT + 1)
    }

    /// Render the UI
    fn render(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let palette = Palette::for_theme(self.theme);

        // Build transcript lines up front so scroll bounds are known.
        let width = self.size.0.saturating_sub(2).max(10) as usize;
        let transcript = self.transcript_lines(width, &palette);
        self.total_lines = transcript.len();

        let height = self.transcript_height() as usize;
        let max_scroll = self.total_lines.saturating_sub(height);
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }
        let visible_end = self.total_lines.saturating_sub(self.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);
        let visible: Vec<Line> = transcript
            .into_iter()
            .skip(visible_start)
            .take(height)
            .collect();

        let face_lines = self.face.lines(self.display.mood, self.display.vocalizing);
        let face_style = Style::default().fg(palette.mood_tint(self.display.mood));

        let banner = self.display.banner.clone();
        let status = self.status_line();
        let input = self.input_line(width);

        terminal.draw(|frame| {
            let banner_height = u16::from(banner.is_some());
            let [face_area, banner_area, transcript_area, input_area, status_area] =
                Layout::vertical([
                    Constraint::Length(FACE_HEIGHT),
                    Constraint::Length(banner_height),
                    Constraint::Min(3),
                    Constraint::Length(INPUT_HEIGHT),
                    Constraint::Length(1),
                ])
                .areas(frame.area());

            let face: Vec<Line> = face_lines
                .iter()
                .map(|l| Line::styled(l.clone(), face_style))
                .collect();
            frame.render_widget(
                Paragraph::new(face).alignment(Alignment::Center),
                face_area,
            );

            if let Some(banner) = banner {
                frame.render_widget(
                    Paragraph::new(banner.message.as_str())
                        .style(Style::default().fg(palette.banner(banner.level)))
                        .alignment(Alignment::Center),
                    banner_area,
                );
            }

            frame.render_widget(Paragraph::new(visible), transcript_area);

            frame.render_widget(
                Paragraph::new(input)
                    .style(Style::default().fg(palette.user))
                    .block(
                        Block::default()
                            .borders(Borders::TOP)
                            .border_style(Style::default().fg(palette.dim)),
                    ),
                input_area,
            );

            frame.render_widget(
                Paragraph::new(status).style(Style::default().fg(palette.dim)),
                status_area,
            );
        })?;

        Ok(())
    }

    /// Build the wrapped, styled transcript
    fn transcript_lines(&self, width: usize, palette: &Palette) -> Vec<Line<'static>> {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &self.display.messages {
            let style = match msg.role {
                MessageRole::User => Style::default().fg(palette.user),
                MessageRole::Assistant => Style::default().fg(palette.assistant),
            };

            let content = if msg.streaming {
                format!("{}{}_", msg.prefix(), msg.content)
            } else {
                format!("{}{}", msg.prefix(), msg.content)
            };

            for wrapped in textwrap::wrap(&content, width) {
                lines.push(Line::styled(wrapped.into_owned(), style));
            }
            lines.push(Line::raw(""));
        }

        // Typing indicator while a turn waits on its first chunk.
        if self.display.awaiting_first_chunk() {
            let dots = ".".repeat(self.tick / 3 % 3 + 1);
            lines.push(Line::styled(
                format!("Cookie: {dots}"),
                Style::default().fg(palette.dim),
            ));
        }

        lines
    }

    /// Build the input line, keeping the cursor end visible
    fn input_line(&self, width: usize) -> String {
        let full = format!("You: {}_", self.input_buffer);
        tail_fitting(&full, width)
    }

    /// Build the status line
    fn status_line(&self) -> String {
        let mut status = format!(" {}", self.display.state.description());
        if self.companion.is_listening() {
            status.push_str(" [listening]");
        }
        status.push_str(" | Enter send | Ctrl+T theme");
        if self.mic_supported {
            status.push_str(" | Ctrl+R mic");
        }
        status.push_str(" | Esc quit");
        if self.scroll_offset > 0 {
            status.push_str(&format!(" [^{} lines]", self.scroll_offset));
        }
        status
    }
}

/// Take the widest suffix of `s` that fits in `max_width` columns
fn tail_fitting(s: &str, max_width: usize) -> String {
    let mut taken = 0usize;
    let mut chars: Vec<char> = Vec::new();
    for c in s.chars().rev() {
        let w = c.width().unwrap_or(0);
        if taken + w > max_width {
            break;
        }
        taken += w;
        chars.push(c);
    }
    chars.into_iter().rev().collect()
}
