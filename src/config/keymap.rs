//! Key bindings: resolved mapping from terminal keys to abstract actions.
//!
//! Bindings are validated when they are loaded; the input dispatcher only ever sees a
//! ready-made [`Keymap`].

use crate::error::{Result, SiftError};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Abstract actions the input dispatcher can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Confirm,
    Cancel,
    CursorUp,
    CursorDown,
    PageUp,
    PageDown,
    CursorFirst,
    CursorLast,
    ToggleSelection,
    ToggleSelectionAndSelectNext,
    DeleteBackwardChar,
    DeleteForwardChar,
    DeleteBackwardWord,
    KillEndOfLine,
    ClearQuery,
    ForwardChar,
    BackwardChar,
    BeginningOfLine,
    EndOfLine,
    RotateMatcher,
    /// Explicitly does nothing; binding a key to it removes the default binding
    Nop,
}

impl Action {
    pub const ALL: [Action; 21] = [
        Self::Confirm,
        Self::Cancel,
        Self::CursorUp,
        Self::CursorDown,
        Self::PageUp,
        Self::PageDown,
        Self::CursorFirst,
        Self::CursorLast,
        Self::ToggleSelection,
        Self::ToggleSelectionAndSelectNext,
        Self::DeleteBackwardChar,
        Self::DeleteForwardChar,
        Self::DeleteBackwardWord,
        Self::KillEndOfLine,
        Self::ClearQuery,
        Self::ForwardChar,
        Self::BackwardChar,
        Self::BeginningOfLine,
        Self::EndOfLine,
        Self::RotateMatcher,
        Self::Nop,
    ];

    /// Name used in settings files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::CursorUp => "cursor-up",
            Self::CursorDown => "cursor-down",
            Self::PageUp => "page-up",
            Self::PageDown => "page-down",
            Self::CursorFirst => "cursor-first",
            Self::CursorLast => "cursor-last",
            Self::ToggleSelection => "toggle-selection",
            Self::ToggleSelectionAndSelectNext => "toggle-selection-and-select-next",
            Self::DeleteBackwardChar => "delete-backward-char",
            Self::DeleteForwardChar => "delete-forward-char",
            Self::DeleteBackwardWord => "delete-backward-word",
            Self::KillEndOfLine => "kill-end-of-line",
            Self::ClearQuery => "clear-query",
            Self::ForwardChar => "forward-char",
            Self::BackwardChar => "backward-char",
            Self::BeginningOfLine => "beginning-of-line",
            Self::EndOfLine => "end-of-line",
            Self::RotateMatcher => "rotate-matcher",
            Self::Nop => "nop",
        }
    }
}

impl FromStr for Action {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.name() == wanted)
            .ok_or_else(|| SiftError::keymap(format!("unknown action '{s}'")))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A key plus modifiers, normalized so that lookups are insensitive to how the terminal
/// reported shift on printable characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self::normalize(code, modifiers)
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn alt(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::ALT)
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }

    fn normalize(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let mut modifiers =
            modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT);
        let code = match code {
            KeyCode::Char(c) => {
                // Shift is already encoded in the character itself
                modifiers.remove(KeyModifiers::SHIFT);
                if modifiers.contains(KeyModifiers::CONTROL) {
                    KeyCode::Char(c.to_ascii_lowercase())
                } else {
                    KeyCode::Char(c)
                }
            }
            KeyCode::BackTab => {
                modifiers.remove(KeyModifiers::SHIFT);
                KeyCode::BackTab
            }
            other => other,
        };
        Self { code, modifiers }
    }
}

impl FromStr for KeyBinding {
    type Err = SiftError;

    /// Parse `C-x`, `M-x`, `S-Tab`, `C-M-x`, named keys (`Enter`, `PgUp`, `F5`, ...) or a
    /// single character.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SiftError::keymap(format!("cannot parse key '{s}'"));

        let mut rest = s.trim();
        let mut modifiers = KeyModifiers::NONE;
        while let Some((flag, tail)) = split_modifier(rest) {
            modifiers |= flag;
            rest = tail;
        }

        let mut chars = rest.chars();
        let code = match (chars.next(), chars.next()) {
            (None, _) => return Err(invalid()),
            // terminals only report control and alt chords for ASCII keys
            (Some(c), None) if !c.is_ascii() && !modifiers.is_empty() => return Err(invalid()),
            (Some(c), None) => KeyCode::Char(c),
            _ => named_key(rest).ok_or_else(invalid)?,
        };

        Ok(Self::new(code, modifiers))
    }
}

/// Strip one leading `C-`, `M-`/`A-` or `S-` prefix, keeping at least one char after it.
fn split_modifier(key: &str) -> Option<(KeyModifiers, &str)> {
    let (prefix, tail) = key.split_once('-')?;
    if tail.is_empty() {
        return None;
    }
    let flag = match prefix {
        "C" | "c" => KeyModifiers::CONTROL,
        "M" | "m" | "A" | "a" => KeyModifiers::ALT,
        "S" | "s" => KeyModifiers::SHIFT,
        _ => return None,
    };
    Some((flag, tail))
}

fn named_key(name: &str) -> Option<KeyCode> {
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" | "return" | "ret" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "bs" | "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "ins" | "insert" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pgup" | "pageup" => KeyCode::PageUp,
        "pgdn" | "pagedown" => KeyCode::PageDown,
        "space" | "spc" => KeyCode::Char(' '),
        _ => {
            let number = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=12).contains(&number) {
                KeyCode::F(number)
            } else {
                return None;
            }
        }
    };
    Some(code)
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("C-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("M-")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("S-")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::BackTab => f.write_str("BackTab"),
            KeyCode::Backspace => f.write_str("BS"),
            KeyCode::Delete => f.write_str("Del"),
            KeyCode::Insert => f.write_str("Insert"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PgUp"),
            KeyCode::PageDown => f.write_str("PgDn"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Resolved key → action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    bindings: HashMap<KeyBinding, Action>,
}

impl Default for Keymap {
    fn default() -> Self {
        use KeyBinding as K;

        let defaults = [
            (K::plain(KeyCode::Enter), Action::Confirm),
            (K::plain(KeyCode::Esc), Action::Cancel),
            (K::ctrl('c'), Action::Cancel),
            (K::ctrl('g'), Action::Cancel),
            (K::plain(KeyCode::Up), Action::CursorUp),
            (K::ctrl('p'), Action::CursorUp),
            (K::plain(KeyCode::Down), Action::CursorDown),
            (K::ctrl('n'), Action::CursorDown),
            (K::plain(KeyCode::PageUp), Action::PageUp),
            (K::alt('v'), Action::PageUp),
            (K::plain(KeyCode::PageDown), Action::PageDown),
            (K::ctrl('v'), Action::PageDown),
            (K::plain(KeyCode::Home), Action::CursorFirst),
            (K::alt('<'), Action::CursorFirst),
            (K::plain(KeyCode::End), Action::CursorLast),
            (K::alt('>'), Action::CursorLast),
            (K::plain(KeyCode::Tab), Action::ToggleSelection),
            (K::ctrl(' '), Action::ToggleSelectionAndSelectNext),
            (K::plain(KeyCode::Backspace), Action::DeleteBackwardChar),
            (K::ctrl('h'), Action::DeleteBackwardChar),
            (K::plain(KeyCode::Delete), Action::DeleteForwardChar),
            (K::ctrl('d'), Action::DeleteForwardChar),
            (K::ctrl('w'), Action::DeleteBackwardWord),
            (K::ctrl('k'), Action::KillEndOfLine),
            (K::ctrl('u'), Action::ClearQuery),
            (K::plain(KeyCode::Right), Action::ForwardChar),
            (K::ctrl('f'), Action::ForwardChar),
            (K::plain(KeyCode::Left), Action::BackwardChar),
            (K::ctrl('b'), Action::BackwardChar),
            (K::ctrl('a'), Action::BeginningOfLine),
            (K::ctrl('e'), Action::EndOfLine),
            (K::ctrl('r'), Action::RotateMatcher),
        ];

        Self {
            bindings: defaults.into_iter().collect(),
        }
    }
}

impl Keymap {
    /// A keymap with no bindings at all.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `key` to `action`; binding to [`Action::Nop`] removes the key.
    pub fn bind(&mut self, key: KeyBinding, action: Action) {
        if action == Action::Nop {
            self.bindings.remove(&key);
        } else {
            self.bindings.insert(key, action);
        }
    }

    pub fn lookup(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings.get(&KeyBinding::from_event(event)).copied()
    }

    /// Keys bound to `action`, sorted by their textual form.
    pub fn keys_for(&self, action: Action) -> Vec<KeyBinding> {
        let mut keys: Vec<KeyBinding> = self
            .bindings
            .iter()
            .filter(|(_, bound)| **bound == action)
            .map(|(key, _)| *key)
            .collect();
        keys.sort_by_key(|key| key.to_string());
        keys
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Apply `action name → key names` overrides on top of the current bindings.
    ///
    /// Every name is validated before anything is changed, so a bad entry leaves the
    /// keymap untouched.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut resolved = Vec::new();
        for (action_name, keys) in overrides {
            let action: Action = action_name.parse()?;
            for key in keys {
                resolved.push((key.parse::<KeyBinding>()?, action));
            }
        }

        for (key, action) in resolved {
            self.bind(key, action);
        }
        Ok(())
    }
}
