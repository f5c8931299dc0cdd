//! Color theme and styling definitions using ratatui colors
//!
//! Each element the view draws has one [`Style`]. Settings files may override any
//! element by name; see [`ColorTheme::set_element`].

use crate::error::{Result, SiftError};
use ratatui::style::{Color, Modifier, Style};
use std::str::FromStr;

/// Color theme for terminal UI elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTheme {
    /// Plain result rows (default uses terminal colors)
    pub basic: Style,

    /// Prompt and query text
    pub query: Style,

    /// Matched ranges inside a row
    pub matched: Style,

    /// Row under the cursor
    pub selected: Style,

    /// Rows toggled into the multi-selection
    pub saved: Style,

    /// Status line
    pub status: Style,

    /// Query-level errors and notices on the status line
    pub error: Style,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            basic: Style::default(),
            query: Style::default().add_modifier(Modifier::BOLD),
            matched: Style::default().fg(Color::Black).bg(Color::Yellow),
            selected: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            saved: Style::default().fg(Color::Black).bg(Color::Cyan),
            status: Style::default().fg(Color::White).bg(Color::DarkGray),
            error: Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        }
    }
}

impl ColorTheme {
    /// Theme for terminals without color support
    pub fn monochrome() -> Self {
        Self {
            basic: Style::default(),
            query: Style::default().add_modifier(Modifier::BOLD),
            matched: Style::default().add_modifier(Modifier::UNDERLINED),
            selected: Style::default().add_modifier(Modifier::REVERSED),
            saved: Style::default().add_modifier(Modifier::BOLD),
            status: Style::default().add_modifier(Modifier::REVERSED),
            error: Style::default().add_modifier(Modifier::BOLD),
        }
    }

    /// Element names accepted by [`ColorTheme::set_element`].
    pub const ELEMENTS: [&'static str; 7] =
        ["basic", "query", "matched", "selected", "saved", "status", "error"];

    /// Replace the style of one element by name.
    pub fn set_element(&mut self, name: &str, style: Style) -> Result<()> {
        let slot = match name {
            "basic" => &mut self.basic,
            "query" => &mut self.query,
            "matched" => &mut self.matched,
            "selected" => &mut self.selected,
            "saved" => &mut self.saved,
            "status" => &mut self.status,
            "error" => &mut self.error,
            other => {
                return Err(SiftError::config(format!(
                    "unknown style element '{other}' (expected one of {})",
                    Self::ELEMENTS.join(", ")
                )))
            }
        };
        *slot = style;
        Ok(())
    }
}

/// Build a style from attribute words: a foreground color name, `on_<color>` for the
/// background, and any of `bold`, `underline`, `reverse`, `italic`, `dim`.
pub fn parse_style<S: AsRef<str>>(attributes: &[S]) -> Result<Style> {
    let mut style = Style::default();

    for attribute in attributes {
        let word = attribute.as_ref().trim();
        style = match word.to_ascii_lowercase().as_str() {
            "bold" => style.add_modifier(Modifier::BOLD),
            "underline" | "underlined" => style.add_modifier(Modifier::UNDERLINED),
            "reverse" | "reversed" => style.add_modifier(Modifier::REVERSED),
            "italic" => style.add_modifier(Modifier::ITALIC),
            "dim" => style.add_modifier(Modifier::DIM),
            lower => match lower.strip_prefix("on_") {
                Some(background) => style.bg(parse_color(background)?),
                None => style.fg(parse_color(lower)?),
            },
        };
    }

    Ok(style)
}

fn parse_color(name: &str) -> Result<Color> {
    Color::from_str(name).map_err(|_| SiftError::config(format!("unknown color '{name}'")))
}
