//! Terminal UI implementation using ratatui
//!
//! Standard output carries the selected lines, so frames are drawn on the controlling
//! terminal (`/dev/tty`), falling back to standard error where that cannot be opened.

use crate::error::{Result, SiftError};
use crate::render::ui::renderer::UIRenderer;
use crate::render::ui::state::{RowView, ViewSnapshot};
use crate::render::ui::theme::ColorTheme;
use ratatui::crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::fs::OpenOptions;
use std::io::{self, Write};

type TtyWriter = Box<dyn Write + Send>;
type TtyTerminal = Terminal<CrosstermBackend<TtyWriter>>;

/// Terminal UI with a ratatui backend
pub struct TerminalUI {
    terminal: Option<TtyTerminal>,
    theme: ColorTheme,
}

impl TerminalUI {
    pub fn new(theme: ColorTheme) -> Self {
        Self {
            terminal: None,
            theme,
        }
    }

    fn open_tty() -> TtyWriter {
        match OpenOptions::new().write(true).open("/dev/tty") {
            Ok(tty) => Box::new(tty),
            Err(err) => {
                log::debug!("cannot open /dev/tty ({err}), drawing on stderr");
                Box::new(io::stderr())
            }
        }
    }
}

impl UIRenderer for TerminalUI {
    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
        if let Some(ref mut terminal) = self.terminal {
            let theme = &self.theme;
            terminal
                .draw(|frame| draw_frame(frame, snapshot, theme))
                .map_err(|e| SiftError::ui(format!("draw failed: {e}")))?;
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            return Ok(());
        }

        enable_raw_mode()
            .map_err(|e| SiftError::terminal_setup(format!("cannot enter raw mode: {e}")))?;

        let setup = || -> io::Result<TtyTerminal> {
            let mut tty = Self::open_tty();
            execute!(tty, EnterAlternateScreen, EnableMouseCapture)?;
            Terminal::new(CrosstermBackend::new(tty))
        };

        match setup() {
            Ok(terminal) => {
                self.terminal = Some(terminal);
                Ok(())
            }
            Err(err) => {
                let _ = disable_raw_mode();
                Err(SiftError::terminal_setup(format!(
                    "cannot initialize screen: {err}"
                )))
            }
        }
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(mut terminal) = self.terminal.take() {
            disable_raw_mode()?;
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture,
                Show
            )?;
        }
        Ok(())
    }

    fn get_terminal_size(&self) -> Result<(u16, u16)> {
        let (cols, rows) = ratatui::crossterm::terminal::size()?;
        Ok((cols, rows))
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Lay out one frame: prompt line, result rows, status line.
pub fn draw_frame(frame: &mut Frame, snapshot: &ViewSnapshot, theme: &ColorTheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_prompt(frame, chunks[0], snapshot, theme);
    draw_rows(frame, chunks[1], &snapshot.rows, theme);
    draw_status(frame, chunks[2], snapshot, theme);
}

fn draw_prompt(frame: &mut Frame, area: Rect, snapshot: &ViewSnapshot, theme: &ColorTheme) {
    let matcher = snapshot.matcher.name();
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(column_width(matcher).saturating_add(1)),
        ])
        .split(area);

    let before_caret: String = snapshot.query.chars().take(snapshot.caret).collect();
    let prefix = format!("{} ", snapshot.prompt);
    let caret_x = Span::raw(prefix.as_str()).width() + Span::raw(before_caret.as_str()).width();

    let prompt = Line::from(vec![
        Span::styled(prefix.as_str(), theme.query),
        Span::styled(snapshot.query.as_str(), theme.query),
    ]);
    frame.render_widget(Paragraph::new(prompt), halves[0]);
    frame.render_widget(
        Paragraph::new(matcher).alignment(Alignment::Right),
        halves[1],
    );

    let max_x = halves[0].width.saturating_sub(1);
    let x = u16::try_from(caret_x).unwrap_or(u16::MAX).min(max_x);
    frame.set_cursor(area.x + x, area.y);
}

/// Display width of `text`, saturating at the largest terminal width.
fn column_width(text: &str) -> u16 {
    u16::try_from(Span::raw(text).width()).unwrap_or(u16::MAX)
}

fn draw_rows(frame: &mut Frame, area: Rect, rows: &[RowView], theme: &ColorTheme) {
    let lines: Vec<Line> = rows
        .iter()
        .take(usize::from(area.height))
        .map(|row| {
            let base = if row.is_cursor {
                theme.selected
            } else if row.is_selected {
                theme.saved
            } else {
                theme.basic
            };
            highlighted_line(&row.text, &row.ranges, base, base.patch(theme.matched)).style(base)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// Split `content` into plain and highlighted spans.
///
/// Ranges are byte offsets in ascending order; ranges that do not fall on char
/// boundaries are skipped.
pub fn highlighted_line<'a>(
    content: &'a str,
    ranges: &[(usize, usize)],
    base: Style,
    highlight: Style,
) -> Line<'a> {
    let mut spans = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut last_end = 0;

    for &(start, end) in ranges {
        if start < last_end || end <= start {
            continue;
        }
        let (Some(before), Some(matched)) = (content.get(last_end..start), content.get(start..end))
        else {
            continue;
        };
        if !before.is_empty() {
            spans.push(Span::styled(before, base));
        }
        spans.push(Span::styled(matched, highlight));
        last_end = end;
    }

    if last_end < content.len() {
        spans.push(Span::styled(&content[last_end..], base));
    }

    Line::from(spans)
}

fn draw_status(frame: &mut Frame, area: Rect, snapshot: &ViewSnapshot, theme: &ColorTheme) {
    let status = &snapshot.status;
    let left = status.format_status_line();

    let message = status.message().unwrap_or_default();
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(column_width(&left).saturating_add(1)),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(left).style(theme.status), halves[0]);
    frame.render_widget(
        Paragraph::new(message)
            .style(theme.status.patch(theme.error))
            .alignment(Alignment::Right),
        halves[1],
    );
}
