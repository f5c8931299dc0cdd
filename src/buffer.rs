//! Line storage and ingestion.
//!
//! [`LineStore`] is the append-only, optionally capacity-bounded collection of every line
//! read from the input. It has exactly one writer (the buffer reader task) and many
//! readers (filter engine, view, confirmation). Readers never hold the lock across
//! matching: they copy out a snapshot of cheap `Line` handles and work on that.

pub mod compression;
pub mod reader;

pub use reader::{open_input, BufferReader, InputSource};

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Arrival-order position of a line. Assigned monotonically, never reused.
pub type Ordinal = u64;

/// One ingested line.
///
/// The text is shared (`Arc<str>`), so cloning a `Line` is cheap and a clone stays
/// valid after the store has evicted the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    ordinal: Ordinal,
    text: Arc<str>,
    /// Payload emitted on confirmation when it differs from the displayed text
    output: Option<Arc<str>>,
}

impl Line {
    pub fn new(ordinal: Ordinal, text: impl Into<Arc<str>>) -> Self {
        Self {
            ordinal,
            text: text.into(),
            output: None,
        }
    }

    pub fn with_output(
        ordinal: Ordinal,
        text: impl Into<Arc<str>>,
        output: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            ordinal,
            text: text.into(),
            output: Some(output.into()),
        }
    }

    pub fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    /// Text that is displayed and matched against.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Text written to standard output when this line is chosen.
    pub fn output(&self) -> &str {
        self.output.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    lines: VecDeque<Line>,
    next_ordinal: Ordinal,
}

impl StoreInner {
    /// Ordinal of the oldest retained line (equals `next_ordinal` when empty).
    fn first_ordinal(&self) -> Ordinal {
        self.lines
            .front()
            .map_or(self.next_ordinal, |line| line.ordinal)
    }
}

/// Ordered, FIFO-evicting line buffer.
///
/// Retained ordinals are always contiguous, so positional lookup is a subtraction.
#[derive(Debug)]
pub struct LineStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
}

impl LineStore {
    /// Create a store holding at most `capacity` lines. `0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Append a line, evicting the oldest one first if the store is full.
    pub fn append(&self, text: impl Into<Arc<str>>) -> Ordinal {
        self.push(text.into(), None)
    }

    /// Append a line whose confirmation output differs from its display text.
    pub fn append_with_output(
        &self,
        text: impl Into<Arc<str>>,
        output: impl Into<Arc<str>>,
    ) -> Ordinal {
        self.push(text.into(), Some(output.into()))
    }

    fn push(&self, text: Arc<str>, output: Option<Arc<str>>) -> Ordinal {
        let mut inner = self.inner.write();
        let ordinal = inner.next_ordinal;
        inner.next_ordinal += 1;

        if self.capacity > 0 {
            while inner.lines.len() >= self.capacity {
                inner.lines.pop_front();
            }
        }

        inner.lines.push_back(Line {
            ordinal,
            text,
            output,
        });
        ordinal
    }

    pub fn len(&self) -> usize {
        self.inner.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().lines.is_empty()
    }

    /// Total number of lines ever appended, evicted ones included.
    pub fn total_appended(&self) -> u64 {
        self.inner.read().next_ordinal
    }

    pub fn first_ordinal(&self) -> Ordinal {
        self.inner.read().first_ordinal()
    }

    /// Ordinal the next appended line will receive.
    pub fn next_ordinal(&self) -> Ordinal {
        self.inner.read().next_ordinal
    }

    /// Look up a line by ordinal. Evicted or not-yet-read ordinals yield `None`.
    pub fn get(&self, ordinal: Ordinal) -> Option<Line> {
        let inner = self.inner.read();
        let first = inner.first_ordinal();
        if ordinal < first {
            return None;
        }
        let index = usize::try_from(ordinal - first).ok()?;
        inner.lines.get(index).cloned()
    }

    /// Copy out every retained line together with the ordinal the snapshot ends at.
    pub fn snapshot(&self) -> (Vec<Line>, Ordinal) {
        let inner = self.inner.read();
        (inner.lines.iter().cloned().collect(), inner.next_ordinal)
    }

    /// Copy out retained lines with ordinal `>= from`, plus the snapshot end ordinal.
    pub fn lines_from(&self, from: Ordinal) -> (Vec<Line>, Ordinal) {
        let inner = self.inner.read();
        let first = inner.first_ordinal();
        let skip = usize::try_from(from.saturating_sub(first)).unwrap_or(usize::MAX);
        let lines = inner.lines.iter().skip(skip).cloned().collect();
        (lines, inner.next_ordinal)
    }
}

impl Default for LineStore {
    fn default() -> Self {
        Self::unbounded()
    }
}
