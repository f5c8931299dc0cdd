//! Resolved configuration consumed by the core.
//!
//! [`Options`] is built from defaults, then an optional TOML settings file (feature
//! `config`), then command-line flags. Everything is validated here; workers only ever
//! see resolved values.

pub mod keymap;
#[cfg(feature = "config")]
pub mod settings;

pub use keymap::{Action, KeyBinding, Keymap};

use crate::matcher::Matcher;
use crate::render::ui::ColorTheme;

/// Prompt shown in front of the query.
pub const DEFAULT_PROMPT: &str = "QUERY>";

/// Resolved option set.
#[derive(Debug, Clone)]
pub struct Options {
    /// Matcher in effect at startup
    pub matcher: Matcher,
    pub keymap: Keymap,
    /// Maximum number of retained lines; `0` keeps everything
    pub buffer_size: usize,
    /// Query applied before the first frame is drawn
    pub query: Option<String>,
    /// Treat `display\0payload` lines specially on output
    pub null_separator: bool,
    pub theme: ColorTheme,
    pub prompt: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            matcher: Matcher::default(),
            keymap: Keymap::default(),
            buffer_size: 0,
            query: None,
            null_separator: false,
            theme: ColorTheme::default(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Options {
    /// Seed query, if a non-empty one was supplied.
    pub fn seed_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}
