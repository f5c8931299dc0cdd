//! Frame snapshot structures
//!
//! A [`ViewSnapshot`] is everything one frame needs, copied out of the coordinator under
//! its locks. Renderers draw from the snapshot only, never from live state.

use crate::matcher::{MatchRange, Matcher};
use std::sync::Arc;

/// One visible result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub text: Arc<str>,
    /// Byte ranges to highlight
    pub ranges: Vec<MatchRange>,
    /// Row is under the cursor
    pub is_cursor: bool,
    /// Row is part of the multi-selection
    pub is_selected: bool,
}

/// Consistent copy of query, result window and selection for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub prompt: String,
    pub query: String,
    /// Caret position in chars
    pub caret: usize,
    pub matcher: Matcher,
    pub rows: Vec<RowView>,
    pub status: StatusLine,
}

impl ViewSnapshot {
    /// Row under the cursor, if it is visible.
    pub fn cursor_row(&self) -> Option<&RowView> {
        self.rows.iter().find(|row| row.is_cursor)
    }
}

/// Status line information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    /// Number of matching lines
    pub matched: usize,
    /// Number of lines in the store
    pub total: usize,
    pub selected: usize,
    /// One-based page of the cursor
    pub page: usize,
    pub pages: usize,
    /// Input is still being read
    pub reading: bool,
    /// Query-level error
    pub error: Option<String>,
    /// Non-fatal notice such as a read error that ended ingestion
    pub notice: Option<String>,
}

impl StatusLine {
    /// Compute page numbers for a cursor position.
    pub fn set_page(&mut self, cursor: usize, page_height: usize) {
        let page_height = page_height.max(1);
        self.pages = self.matched.div_ceil(page_height).max(1);
        self.page = cursor / page_height + 1;
    }

    /// Message shown on the right side: error first, then notice.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.notice.as_deref())
    }

    /// Left side of the status line.
    pub fn format_status_line(&self) -> String {
        let mut status = format!("{}/{}", self.matched, self.total);
        if self.selected > 0 {
            status.push_str(&format!(" [{} selected]", self.selected));
        }
        status.push_str(&format!(" page {}/{}", self.page, self.pages));
        if self.reading {
            status.push_str(" (reading...)");
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_format() {
        let mut status = StatusLine {
            matched: 42,
            total: 100,
            ..StatusLine::default()
        };
        status.set_page(25, 20);
        assert_eq!(status.format_status_line(), "42/100 page 2/3");

        status.selected = 2;
        status.reading = true;
        assert_eq!(
            status.format_status_line(),
            "42/100 [2 selected] page 2/3 (reading...)"
        );
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let mut status = StatusLine::default();
        status.set_page(0, 20);
        assert_eq!((status.page, status.pages), (1, 1));
    }

    #[test]
    fn test_error_wins_over_notice() {
        let mut status = StatusLine {
            notice: Some("Input read error".to_string()),
            ..StatusLine::default()
        };
        assert_eq!(status.message(), Some("Input read error"));
        status.error = Some("bad regex".to_string());
        assert_eq!(status.message(), Some("bad regex"));
    }
}
