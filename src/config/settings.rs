//! TOML settings file.
//!
//! ```toml
//! matcher = "CaseSensitive"
//! buffer_size = 10000
//! prompt = "PICK>"
//!
//! [keymap]
//! confirm = ["Enter", "C-j"]
//! nop = "C-g"
//!
//! [style]
//! matched = ["black", "on_green", "bold"]
//! ```

use crate::config::Options;
use crate::error::{Result, SiftError};
use crate::render::ui::theme::parse_style;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up under the platform config directory.
const SETTINGS_FILE: &str = "config.toml";

/// One key or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyList {
    One(String),
    Many(Vec<String>),
}

impl KeyList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(key) => vec![key],
            Self::Many(keys) => keys,
        }
    }
}

/// Raw settings as written in the file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub matcher: Option<String>,
    pub buffer_size: Option<usize>,
    pub prompt: Option<String>,
    /// Action name to key(s); ordered so that later entries win deterministically
    pub keymap: BTreeMap<String, KeyList>,
    /// Element name to style attributes
    pub style: BTreeMap<String, Vec<String>>,
}

impl Settings {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| SiftError::config(e.to_string()))
    }

    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SiftError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| SiftError::config(format!("{}: {e}", path.display())))
    }

    /// Default settings path, returned only when the file exists.
    pub fn locate() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("siftline").join(SETTINGS_FILE);
        path.is_file().then_some(path)
    }

    /// Fold these settings into `options`, validating every value.
    pub fn apply(self, options: &mut Options) -> Result<()> {
        if let Some(matcher) = self.matcher {
            options.matcher = matcher.parse()?;
        }
        if let Some(buffer_size) = self.buffer_size {
            options.buffer_size = buffer_size;
        }
        if let Some(prompt) = self.prompt {
            options.prompt = prompt;
        }

        let overrides: Vec<(String, Vec<String>)> = self
            .keymap
            .into_iter()
            .map(|(action, keys)| (action, keys.into_vec()))
            .collect();
        options.keymap.apply_overrides(
            overrides
                .iter()
                .map(|(action, keys)| (action.as_str(), keys.as_slice())),
        )?;

        for (element, attributes) in &self.style {
            let style = parse_style(attributes)?;
            options.theme.set_element(element, style)?;
        }

        Ok(())
    }
}
