//! State groups owned by the [`Coordinator`](crate::app::Coordinator).
//!
//! Each group sits behind its own lock in the coordinator; the types here are plain data
//! with no synchronization of their own.

use crate::buffer::{Line, Ordinal};
use crate::matcher::{MatchRange, Matcher};
use std::collections::BTreeMap;

/// Query version. Bumped on every mutation of the query text or matcher.
pub type Generation = u64;

/// A line that matched a query generation, with the ranges to highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub line: Line,
    pub generation: Generation,
    pub ranges: Vec<MatchRange>,
}

impl Match {
    pub fn new(line: Line, generation: Generation, ranges: Vec<MatchRange>) -> Self {
        Self {
            line,
            generation,
            ranges,
        }
    }

    pub fn ordinal(&self) -> Ordinal {
        self.line.ordinal()
    }
}

/// Matches of one generation in line arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub generation: Generation,
    pub matches: Vec<Match>,
    /// Query-level error that produced this (empty) set
    pub error: Option<String>,
}

impl ResultSet {
    pub fn new(generation: Generation, matches: Vec<Match>) -> Self {
        Self {
            generation,
            matches,
            error: None,
        }
    }

    /// Empty set carrying a query-level error.
    pub fn failed(generation: Generation, error: impl Into<String>) -> Self {
        Self {
            generation,
            matches: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Match> {
        self.matches.get(index)
    }
}

/// Query text with a caret, the active matcher, and the generation counter.
///
/// The caret is a char index in `0..=len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    chars: Vec<char>,
    caret: usize,
    generation: Generation,
    matcher: Matcher,
}

impl QueryState {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            chars: Vec::new(),
            caret: 0,
            generation: 0,
            matcher,
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn matcher(&self) -> Matcher {
        self.matcher
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Replace the whole query and put the caret at its end.
    pub fn set_text(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.caret = self.chars.len();
        self.bump();
    }

    pub fn rotate_matcher(&mut self) -> Matcher {
        self.matcher = self.matcher.rotate();
        self.bump();
        self.matcher
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.chars.insert(self.caret, ch);
        self.caret += 1;
        self.bump();
        true
    }

    pub fn delete_backward_char(&mut self) -> bool {
        if self.caret == 0 {
            return false;
        }
        self.caret -= 1;
        self.chars.remove(self.caret);
        self.bump();
        true
    }

    pub fn delete_forward_char(&mut self) -> bool {
        if self.caret >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.caret);
        self.bump();
        true
    }

    /// Delete the whitespace run before the caret, then the word before that.
    pub fn delete_backward_word(&mut self) -> bool {
        let mut start = self.caret;
        while start > 0 && self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        if start == self.caret {
            return false;
        }
        self.chars.drain(start..self.caret);
        self.caret = start;
        self.bump();
        true
    }

    pub fn kill_end_of_line(&mut self) -> bool {
        if self.caret >= self.chars.len() {
            return false;
        }
        self.chars.truncate(self.caret);
        self.bump();
        true
    }

    pub fn clear(&mut self) -> bool {
        if self.chars.is_empty() {
            return false;
        }
        self.chars.clear();
        self.caret = 0;
        self.bump();
        true
    }

    // Caret motion never changes the generation.

    pub fn forward_char(&mut self) -> bool {
        let moved = self.caret < self.chars.len();
        if moved {
            self.caret += 1;
        }
        moved
    }

    pub fn backward_char(&mut self) -> bool {
        let moved = self.caret > 0;
        if moved {
            self.caret -= 1;
        }
        moved
    }

    pub fn beginning_of_line(&mut self) -> bool {
        let moved = self.caret != 0;
        self.caret = 0;
        moved
    }

    pub fn end_of_line(&mut self) -> bool {
        let moved = self.caret != self.chars.len();
        self.caret = self.chars.len();
        moved
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(Matcher::default())
    }
}

/// Cursor, scroll offset and the multi-selection.
///
/// Selected lines are kept by ordinal together with their `Line` handle, so they survive
/// both query changes and eviction from the line store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    cursor: usize,
    offset: usize,
    selected: BTreeMap<Ordinal, Line>,
}

impl SelectionState {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the first visible row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, ordinal: Ordinal) -> bool {
        self.selected.contains_key(&ordinal)
    }

    /// Selected lines in arrival order.
    pub fn selected_lines(&self) -> Vec<Line> {
        self.selected.values().cloned().collect()
    }

    /// Back to the top of the list.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    /// Keep the cursor inside `[0, len)`; `0` when the list is empty.
    pub fn clamp(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
        self.offset = self.offset.min(self.cursor);
    }

    /// Shift the cursor down by `removed` rows that disappeared above it.
    pub fn shift_up(&mut self, removed: usize, len: usize) {
        self.cursor = self.cursor.saturating_sub(removed);
        self.offset = self.offset.saturating_sub(removed);
        self.clamp(len);
    }

    pub fn move_by(&mut self, delta: isize, len: usize) -> bool {
        let target = if delta.is_negative() {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta.unsigned_abs())
        };
        self.move_to(target, len)
    }

    pub fn move_to(&mut self, index: usize, len: usize) -> bool {
        let before = self.cursor;
        self.cursor = index;
        self.clamp(len);
        before != self.cursor
    }

    /// Add the line if absent, remove it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, line: &Line) -> bool {
        if self.selected.remove(&line.ordinal()).is_some() {
            false
        } else {
            self.selected.insert(line.ordinal(), line.clone());
            true
        }
    }

    /// Move the scroll offset just enough for the cursor to be visible.
    pub fn scroll_to_cursor(&mut self, page_height: usize) {
        let page_height = page_height.max(1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + page_height {
            self.offset = self.cursor + 1 - page_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> QueryState {
        let mut state = QueryState::default();
        state.set_text(text);
        state
    }

    #[test]
    fn test_every_edit_bumps_generation() {
        let mut state = QueryState::default();
        assert_eq!(state.generation(), 0);

        state.insert_char('a');
        state.insert_char('n');
        assert_eq!(state.text(), "an");
        assert_eq!(state.generation(), 2);

        state.delete_backward_char();
        assert_eq!(state.text(), "a");
        assert_eq!(state.generation(), 3);

        state.rotate_matcher();
        assert_eq!(state.matcher(), Matcher::CaseSensitive);
        assert_eq!(state.generation(), 4);
    }

    #[test]
    fn test_noop_edits_keep_generation() {
        let mut state = QueryState::default();
        assert!(!state.delete_backward_char());
        assert!(!state.delete_forward_char());
        assert!(!state.clear());
        assert!(!state.kill_end_of_line());
        assert!(!state.delete_backward_word());
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_caret_motion_and_insertion() {
        let mut state = query("ac");
        let generation = state.generation();
        state.backward_char();
        assert_eq!(state.generation(), generation);
        state.insert_char('b');
        assert_eq!(state.text(), "abc");
        assert_eq!(state.caret(), 2);

        state.beginning_of_line();
        state.delete_forward_char();
        assert_eq!(state.text(), "bc");
        state.end_of_line();
        assert_eq!(state.caret(), 2);
    }

    #[test]
    fn test_delete_backward_word() {
        let mut state = query("foo bar  ");
        assert!(state.delete_backward_word());
        assert_eq!(state.text(), "foo ");
        assert!(state.delete_backward_word());
        assert_eq!(state.text(), "");
    }

    #[test]
    fn test_kill_end_of_line() {
        let mut state = query("keep|drop");
        for _ in 0..5 {
            state.backward_char();
        }
        assert!(state.kill_end_of_line());
        assert_eq!(state.text(), "keep");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut state = query("日本語");
        state.backward_char();
        state.delete_backward_char();
        assert_eq!(state.text(), "日語");
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut selection = SelectionState::default();
        assert!(!selection.move_by(5, 0));
        assert_eq!(selection.cursor(), 0);

        selection.move_by(5, 3);
        assert_eq!(selection.cursor(), 2);
        selection.move_by(-10, 3);
        assert_eq!(selection.cursor(), 0);

        selection.move_to(2, 3);
        selection.clamp(1);
        assert_eq!(selection.cursor(), 0);
    }

    #[test]
    fn test_shift_up_tracks_the_same_row() {
        let mut selection = SelectionState::default();
        selection.move_to(5, 10);
        selection.shift_up(2, 8);
        assert_eq!(selection.cursor(), 3);
    }

    #[test]
    fn test_scroll_keeps_cursor_visible() {
        let mut selection = SelectionState::default();
        selection.move_to(12, 20);
        selection.scroll_to_cursor(5);
        assert_eq!(selection.offset(), 8);

        selection.move_to(3, 20);
        selection.scroll_to_cursor(5);
        assert_eq!(selection.offset(), 3);
    }

    #[test]
    fn test_toggle_survives_by_ordinal() {
        let mut selection = SelectionState::default();
        let line = Line::new(7, "grape");
        assert!(selection.toggle(&line));
        assert!(selection.is_selected(7));
        assert_eq!(selection.selected_lines(), vec![line.clone()]);

        assert!(!selection.toggle(&line));
        assert_eq!(selection.selected_count(), 0);
    }

    #[test]
    fn test_selected_lines_are_in_arrival_order() {
        let mut selection = SelectionState::default();
        for ordinal in [9, 2, 5] {
            selection.toggle(&Line::new(ordinal, ordinal.to_string()));
        }
        let ordinals: Vec<Ordinal> = selection
            .selected_lines()
            .iter()
            .map(Line::ordinal)
            .collect();
        assert_eq!(ordinals, vec![2, 5, 9]);
    }
}
