//! Recording session screen.
//!
//! [`SessionView`] is the state the controller writes through the [`View`]
//! trait. [`SessionTui`] owns the terminal, draws that state with a live level
//! meter, and turns key presses into [`SessionCommand`]s.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Sparkline, Wrap},
};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::controller::{Location, View};

const BG: Color = Color::Rgb(0, 0, 0);
const FG: Color = Color::Rgb(206, 224, 220);
const DIM: Color = Color::Rgb(100, 100, 100);
const ACTIVE: Color = Color::Rgb(80, 200, 120);
const RECORDING: Color = Color::Red;

/// What the user asked for on this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Continue,
    StartRecording,
    StopRecording,
    ChooseFile(PathBuf),
    Upload,
    Play,
    DismissAlert,
    Quit,
}

/// Session state shown on screen.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    /// Upload control enabled (and highlighted as active)
    pub upload_ready: bool,
    pub playback: Option<PathBuf>,
    /// Label of the chosen file, cleared with the file input
    pub file_input: Option<String>,
    pub result: Option<String>,
    pub probabilities: Vec<(String, f64)>,
    pub alert: Option<String>,
    /// Transient status line (errors that have no dedicated place)
    pub status: Option<String>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            start_enabled: true,
            stop_enabled: false,
            upload_ready: false,
            playback: None,
            file_input: None,
            result: None,
            probabilities: Vec::new(),
            alert: None,
            status: None,
        }
    }
}

impl View for SessionView {
    fn set_recording_controls(&mut self, start_enabled: bool, stop_enabled: bool) {
        self.start_enabled = start_enabled;
        self.stop_enabled = stop_enabled;
    }

    fn set_upload_ready(&mut self, ready: bool) {
        self.upload_ready = ready;
    }

    fn set_playback(&mut self, path: &Path) {
        self.playback = Some(path.to_path_buf());
    }

    fn clear_file_input(&mut self) {
        self.file_input = None;
    }

    fn show_result(&mut self, text: &str) {
        self.result = Some(text.to_string());
        self.probabilities.clear();
    }

    fn show_probabilities(&mut self, probabilities: &[(String, f64)]) {
        self.probabilities = probabilities.to_vec();
    }

    fn alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }

    fn navigate(&mut self, location: Location) {
        tracing::debug!("Session already open, ignoring navigation to {}", location.path());
    }
}

/// Extra facts about the session that are not part of [`SessionView`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStatus {
    pub recording: bool,
    pub recorded_secs: Option<f32>,
    pub uploads_in_flight: usize,
}

/// Terminal UI for the recording session.
pub struct SessionTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    levels: Vec<u64>,
    last_level: u8,
    reference_level_db: i8,
    /// Present while the user is typing a file path
    path_input: Option<Input>,
}

impl SessionTui {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new(reference_level_db: i8) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let width = terminal.size()?.width as usize;

        Ok(Self {
            terminal,
            levels: vec![0; width],
            last_level: 0,
            reference_level_db,
            path_input: None,
        })
    }

    /// Feeds the newest mono samples into the level meter.
    pub fn push_samples(&mut self, samples: &[i16], sample_rate: u32) {
        let level = level_percent(samples, sample_rate, self.reference_level_db);
        self.last_level = level;
        self.levels.push(level as u64);
        let width = self.terminal.size().map(|s| s.width as usize).unwrap_or(80);
        if self.levels.len() > width {
            let excess = self.levels.len() - width;
            self.levels.drain(..excess);
        }
    }

    /// Draws one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(&mut self, view: &SessionView, status: SessionStatus) -> anyhow::Result<()> {
        let levels = &self.levels;
        let last_level = self.last_level;
        let path_input = self.path_input.as_ref();

        self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Block::default().style(Style::default().bg(BG)), area);

            let [meter_area, controls_area, source_area, result_area, footer_area] =
                Layout::vertical([
                    Constraint::Min(3),
                    Constraint::Length(1),
                    Constraint::Length(2),
                    Constraint::Length(3 + view.probabilities.len().min(8) as u16),
                    Constraint::Length(1),
                ])
                .areas(area);

            let meter_style = if status.recording {
                Style::default().fg(FG).bg(BG)
            } else {
                Style::default().fg(DIM).bg(BG)
            };
            frame.render_widget(
                Sparkline::default().data(levels).max(100).style(meter_style),
                meter_area,
            );

            frame.render_widget(Paragraph::new(controls_line(view, status)), controls_area);
            frame.render_widget(Paragraph::new(source_lines(view, status)), source_area);

            let result_block = Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(DIM))
                .title(" result ");
            frame.render_widget(
                Paragraph::new(result_lines(view))
                    .block(result_block)
                    .wrap(Wrap { trim: true }),
                result_area,
            );

            let footer = match &view.status {
                Some(message) => Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Yellow),
                )),
                None if status.recording => Line::from(vec![
                    Span::styled("● ", Style::default().fg(RECORDING)),
                    Span::raw(format!("{last_level}%")),
                ]),
                None => Line::from(Span::styled(
                    "r start · s stop · f file · u upload · p play · q quit",
                    Style::default().fg(DIM),
                )),
            };
            frame.render_widget(Paragraph::new(footer), footer_area);

            if let Some(input) = path_input {
                let popup = centered(area, 70, 3);
                frame.render_widget(Clear, popup);
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(" audio file path (Enter to choose, Esc to cancel) ");
                let inner = block.inner(popup);
                frame.render_widget(Paragraph::new(input.value()).block(block), popup);
                frame.set_cursor_position(Position::new(
                    inner.x + input.cursor() as u16,
                    inner.y,
                ));
            } else if let Some(message) = &view.alert {
                let popup = centered(area, 60, 5);
                frame.render_widget(Clear, popup);
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::from(message.as_str()),
                        Line::from(Span::styled("press any key", Style::default().fg(DIM))),
                    ])
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title(" alert ")),
                    popup,
                );
            }
        })?;

        Ok(())
    }

    /// Reads at most one key press.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, alert_open: bool) -> anyhow::Result<SessionCommand> {
        if !event::poll(Duration::from_millis(50))? {
            return Ok(SessionCommand::Continue);
        }

        let ev = event::read()?;
        let Event::Key(key) = ev else {
            return Ok(SessionCommand::Continue);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(SessionCommand::Continue);
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            tracing::debug!("Ctrl+C pressed: leaving session");
            return Ok(SessionCommand::Quit);
        }

        if let Some(input) = self.path_input.as_mut() {
            return Ok(match key.code {
                KeyCode::Enter => {
                    let value = input.value().trim().to_string();
                    self.path_input = None;
                    if value.is_empty() {
                        SessionCommand::Continue
                    } else {
                        SessionCommand::ChooseFile(expand_home(&value))
                    }
                }
                KeyCode::Esc => {
                    self.path_input = None;
                    SessionCommand::Continue
                }
                _ => {
                    input.handle_event(&ev);
                    SessionCommand::Continue
                }
            });
        }

        if alert_open {
            return Ok(SessionCommand::DismissAlert);
        }

        Ok(match key.code {
            KeyCode::Char('r') => SessionCommand::StartRecording,
            KeyCode::Char('s') => SessionCommand::StopRecording,
            KeyCode::Char('f') => {
                self.path_input = Some(Input::default());
                SessionCommand::Continue
            }
            KeyCode::Char('u') | KeyCode::Enter => SessionCommand::Upload,
            KeyCode::Char('p') => SessionCommand::Play,
            KeyCode::Char('q') | KeyCode::Esc => SessionCommand::Quit,
            _ => SessionCommand::Continue,
        })
    }

    /// Leaves the alternate screen and restores the terminal.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for SessionTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn control_span(label: &str, enabled: bool, highlight: Color) -> Span<'static> {
    if enabled {
        Span::styled(
            format!("[{label}]"),
            Style::default().fg(highlight).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {label} "), Style::default().fg(DIM))
    }
}

fn controls_line(view: &SessionView, status: SessionStatus) -> Line<'static> {
    let mut spans = vec![
        control_span("r start", view.start_enabled, FG),
        Span::raw("  "),
        control_span("s stop", view.stop_enabled, RECORDING),
        Span::raw("  "),
        control_span("f file", true, FG),
        Span::raw("  "),
        control_span("u upload", view.upload_ready, ACTIVE),
        Span::raw("  "),
        control_span("p play", view.playback.is_some(), FG),
    ];
    if status.uploads_in_flight > 0 {
        spans.push(Span::styled(
            format!("   uploading ({})…", status.uploads_in_flight),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn source_lines(view: &SessionView, status: SessionStatus) -> Vec<Line<'static>> {
    let recording = match (status.recording, status.recorded_secs) {
        (true, _) => "recording…".to_string(),
        (false, Some(secs)) => format!(
            "{secs:.1}s{}",
            view.playback
                .as_ref()
                .map(|p| format!("  ({})", p.display()))
                .unwrap_or_default()
        ),
        (false, None) => "none".to_string(),
    };
    let file = view.file_input.clone().unwrap_or_else(|| "none".to_string());

    vec![
        Line::from(vec![
            Span::styled("recording: ", Style::default().fg(DIM)),
            Span::raw(recording),
        ]),
        Line::from(vec![
            Span::styled("file:      ", Style::default().fg(DIM)),
            Span::raw(file),
        ]),
    ]
}

fn result_lines(view: &SessionView) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        view.result.clone().unwrap_or_default(),
        Style::default().fg(FG).add_modifier(Modifier::BOLD),
    ))];
    for (label, pct) in view.probabilities.iter().take(8) {
        let filled = (pct.clamp(0.0, 100.0) / 5.0).round() as usize;
        lines.push(Line::from(vec![
            Span::styled(format!("{label:>10} "), Style::default().fg(DIM)),
            Span::styled("█".repeat(filled), Style::default().fg(ACTIVE)),
            Span::raw(format!(" {pct:.2}%")),
        ]));
    }
    lines
}

/// A `width`% wide, `height` rows tall rectangle centered in `area`.
fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = area.width * width_pct / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Level of the last 50ms of audio as 0-100%, relative to `reference_level_db`.
///
/// RMS is converted to dBFS and mapped so that `reference_level_db - 40` is 0%
/// and `reference_level_db` is 100%. Silence reads as 0.
pub fn level_percent(samples: &[i16], sample_rate: u32, reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let window = ((sample_rate / 20) as usize).clamp(1, samples.len());
    let recent = &samples[samples.len() - window..];

    let sum_of_squares: f64 = recent.iter().map(|&s| (s as f64).powi(2)).sum();
    let rms = (sum_of_squares / recent.len() as f64).sqrt();
    if rms <= 0.0 {
        return 0;
    }

    let db_fs = 20.0 * (rms / i16::MAX as f64).log10();
    let floor_db = reference_level_db as f64 - 40.0;
    ((db_fs - floor_db) / 40.0 * 100.0).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_of_silence_is_zero() {
        assert_eq!(level_percent(&[], 16000, -20), 0);
        assert_eq!(level_percent(&[0; 800], 16000, -20), 0);
    }

    #[test]
    fn test_full_scale_is_capped() {
        assert_eq!(level_percent(&[i16::MAX; 800], 16000, -20), 100);
    }

    #[test]
    fn test_level_uses_recent_window() {
        let mut samples = vec![i16::MAX; 1600];
        samples.extend(vec![0; 800]);
        assert_eq!(level_percent(&samples, 16000, -20), 0);
    }

    #[test]
    fn test_reference_level_maps_to_full() {
        // -20 dBFS is a tenth of full scale.
        let amplitude = (i16::MAX as f64 / 10.0) as i16;
        let level = level_percent(&vec![amplitude; 800], 16000, -20);
        assert!(level >= 99, "level was {level}");
        let quieter = level_percent(&vec![amplitude / 10; 800], 16000, -20);
        assert!((49..=51).contains(&quieter), "level was {quieter}");
    }

    #[test]
    fn test_session_view_tracks_controller_calls() {
        let mut view = SessionView::default();
        view.set_recording_controls(false, true);
        view.set_upload_ready(true);
        view.file_input = Some("a.wav".to_string());
        view.show_probabilities(&[("happy".to_string(), 90.0)]);
        view.clear_file_input();
        view.show_result("done");

        assert!(!view.start_enabled);
        assert!(view.stop_enabled);
        assert!(view.upload_ready);
        assert!(view.file_input.is_none());
        assert_eq!(view.result.as_deref(), Some("done"));
        assert!(view.probabilities.is_empty());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/a.wav"), PathBuf::from("/tmp/a.wav"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/a.wav"), home.join("a.wav"));
        }
    }

    #[test]
    fn test_centered_rect() {
        let rect = centered(Rect::new(0, 0, 100, 40), 50, 4);
        assert_eq!(rect, Rect::new(25, 18, 50, 4));
    }
}
