//! Session coordination
//!
//! The [`Coordinator`] owns every piece of cross-worker state, each group behind its own
//! lock, plus the change signals the workers wait on. Workers receive an
//! `Arc<Coordinator>` at startup and never keep private copies of shared state.
//!
//! Lock order, whenever more than one is held: query → results → selection.

pub mod runtime;
pub mod state;

pub use runtime::Session;
pub use state::{Generation, Match, QueryState, ResultSet, SelectionState};

use crate::buffer::{Line, LineStore, Ordinal};
use crate::config::{Keymap, Options};
use crate::matcher::Matcher;
use crate::render::ui::{RowView, StatusLine, ViewSnapshot};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Rows per page until the view reports the real terminal height.
const DEFAULT_PAGE_HEIGHT: usize = 20;

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The user confirmed a selection
    Selected,
    /// The user cancelled or the process was interrupted
    Cancelled,
    /// A worker failed
    Failed,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Selected => 0,
            Self::Cancelled | Self::Failed => 1,
        }
    }
}

/// Shared coordination state for one interactive session.
pub struct Coordinator {
    store: LineStore,
    query: Mutex<QueryState>,
    results: RwLock<ResultSet>,
    selection: Mutex<SelectionState>,
    notice: Mutex<Option<String>>,

    keymap: Keymap,
    prompt: String,
    null_separator: bool,

    page_height: AtomicUsize,
    reading: AtomicBool,
    resized: AtomicBool,

    query_changed: Notify,
    buffer_grew: Notify,
    redraw: Notify,

    cancel: CancellationToken,
    output: OnceLock<Vec<Line>>,
    status: Mutex<Option<ExitStatus>>,
    failure: Mutex<Option<String>>,
}

impl Coordinator {
    pub fn new(options: &Options) -> Self {
        Self {
            store: LineStore::new(options.buffer_size),
            query: Mutex::new(QueryState::new(options.matcher)),
            results: RwLock::new(ResultSet::default()),
            selection: Mutex::new(SelectionState::default()),
            notice: Mutex::new(None),
            keymap: options.keymap.clone(),
            prompt: options.prompt.clone(),
            null_separator: options.null_separator,
            page_height: AtomicUsize::new(DEFAULT_PAGE_HEIGHT),
            reading: AtomicBool::new(false),
            resized: AtomicBool::new(false),
            query_changed: Notify::new(),
            buffer_grew: Notify::new(),
            redraw: Notify::new(),
            cancel: CancellationToken::new(),
            output: OnceLock::new(),
            status: Mutex::new(None),
            failure: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &LineStore {
        &self.store
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn null_separator(&self) -> bool {
        self.null_separator
    }

    /// Replace the query text. The filter is not woken; see [`Coordinator::execute_query`].
    pub fn set_query(&self, text: &str) {
        self.query.lock().set_text(text);
        self.request_redraw();
    }

    /// Wake the filter engine for the current query.
    pub fn execute_query(&self) {
        self.query_changed.notify_one();
    }

    /// Apply an edit to the query; wakes the filter if the generation moved.
    pub fn edit_query<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut QueryState) -> bool,
    {
        let (changed, generation_moved) = {
            let mut query = self.query.lock();
            let before = query.generation();
            let changed = edit(&mut query);
            (changed, query.generation() != before)
        };

        if generation_moved {
            self.execute_query();
        }
        if changed {
            self.request_redraw();
        }
        changed
    }

    pub fn rotate_matcher(&self) -> Matcher {
        let matcher = self.query.lock().rotate_matcher();
        log::debug!("matcher rotated to {matcher}");
        self.execute_query();
        self.request_redraw();
        matcher
    }

    /// Current query text, matcher and generation, read under one lock.
    pub fn query_snapshot(&self) -> (String, Matcher, Generation) {
        let query = self.query.lock();
        (query.text(), query.matcher(), query.generation())
    }

    pub fn current_generation(&self) -> Generation {
        self.query.lock().generation()
    }

    /// Replace the result set if its generation is still current.
    ///
    /// A full pass puts the cursor back on the first row. Returns false when the set was
    /// stale and has been discarded.
    pub fn publish_results(&self, results: ResultSet) -> bool {
        {
            let query = self.query.lock();
            if results.generation != query.generation() {
                log::debug!(
                    "discarding stale result set (generation {} < {})",
                    results.generation,
                    query.generation()
                );
                return false;
            }

            let mut current = self.results.write();
            let mut selection = self.selection.lock();
            *current = results;
            selection.reset();
            selection.clamp(current.len());
            log::debug!(
                "published {} matches for generation {}",
                current.len(),
                current.generation
            );
        }

        self.request_redraw();
        true
    }

    /// Append matches for newly read lines to the current result set.
    ///
    /// Matches whose lines fell out of the store (ordinal below `first_retained`) are
    /// pruned afterwards, including new ones evicted while their pass ran. Returns false
    /// when `generation` is no longer the one on display.
    pub fn extend_results(
        &self,
        generation: Generation,
        matches: Vec<Match>,
        first_retained: Ordinal,
    ) -> bool {
        {
            let query = self.query.lock();
            if generation != query.generation() {
                return false;
            }

            let mut current = self.results.write();
            if current.generation != generation || current.error.is_some() {
                return false;
            }

            // matches stay in ordinal order, so evicted lines form a prefix
            current.matches.extend(matches);
            let pruned = current
                .matches
                .partition_point(|m| m.ordinal() < first_retained);
            current.matches.drain(..pruned);

            let mut selection = self.selection.lock();
            selection.shift_up(pruned, current.len());
        }

        self.request_redraw();
        true
    }

    /// Clone of the result set on display.
    pub fn results(&self) -> ResultSet {
        self.results.read().clone()
    }

    pub fn move_cursor(&self, delta: isize) -> bool {
        let moved = {
            let results = self.results.read();
            self.selection.lock().move_by(delta, results.len())
        };
        if moved {
            self.request_redraw();
        }
        moved
    }

    pub fn page_up(&self) -> bool {
        self.move_cursor(-self.page_delta())
    }

    pub fn page_down(&self) -> bool {
        self.move_cursor(self.page_delta())
    }

    fn page_delta(&self) -> isize {
        isize::try_from(self.page_height()).unwrap_or(isize::MAX)
    }

    pub fn cursor_first(&self) -> bool {
        self.move_cursor_to(0)
    }

    pub fn cursor_last(&self) -> bool {
        self.move_cursor_to(usize::MAX)
    }

    fn move_cursor_to(&self, index: usize) -> bool {
        let moved = {
            let results = self.results.read();
            self.selection.lock().move_to(index, results.len())
        };
        if moved {
            self.request_redraw();
        }
        moved
    }

    /// Toggle the line under the cursor in the multi-selection.
    pub fn toggle_selection(&self) -> Option<bool> {
        let selected = {
            let results = self.results.read();
            let mut selection = self.selection.lock();
            let line = &results.get(selection.cursor())?.line;
            selection.toggle(line)
        };
        self.request_redraw();
        Some(selected)
    }

    pub fn cursor(&self) -> usize {
        self.selection.lock().cursor()
    }

    pub fn selected_lines(&self) -> Vec<Line> {
        self.selection.lock().selected_lines()
    }

    pub fn page_height(&self) -> usize {
        self.page_height.load(Ordering::Relaxed).max(1)
    }

    pub fn set_page_height(&self, rows: usize) {
        self.page_height.store(rows.max(1), Ordering::Relaxed);
    }

    /// Copy out everything one frame needs.
    ///
    /// Query, results and selection are read under their locks at the same time, so a
    /// frame never mixes selection from before a change with results from after it.
    pub fn view_snapshot(&self) -> ViewSnapshot {
        let page_height = self.page_height();
        let total = self.store.len();
        let reading = self.is_reading();
        let notice = self.notice.lock().clone();

        let query = self.query.lock();
        let results = self.results.read();
        let mut selection = self.selection.lock();
        selection.clamp(results.len());
        selection.scroll_to_cursor(page_height);

        let cursor = selection.cursor();
        let rows = results
            .matches
            .iter()
            .enumerate()
            .skip(selection.offset())
            .take(page_height)
            .map(|(index, m)| RowView {
                text: m.line.shared_text(),
                ranges: m.ranges.clone(),
                is_cursor: index == cursor,
                is_selected: selection.is_selected(m.ordinal()),
            })
            .collect();

        let mut status = StatusLine {
            matched: results.len(),
            total,
            selected: selection.selected_count(),
            reading,
            error: results.error.clone(),
            notice,
            ..StatusLine::default()
        };
        status.set_page(cursor, page_height);

        ViewSnapshot {
            prompt: self.prompt.clone(),
            query: query.text(),
            caret: query.caret(),
            matcher: query.matcher(),
            rows,
            status,
        }
    }

    pub fn request_redraw(&self) {
        self.redraw.notify_one();
    }

    pub async fn redraw_requested(&self) {
        self.redraw.notified().await;
    }

    /// Mark the terminal as resized and wake the view.
    pub fn request_resize(&self) {
        self.resized.store(true, Ordering::SeqCst);
        self.request_redraw();
    }

    /// Consume a pending resize mark.
    pub fn take_resize(&self) -> bool {
        self.resized.swap(false, Ordering::SeqCst)
    }

    pub fn set_notice(&self, notice: impl Into<String>) {
        *self.notice.lock() = Some(notice.into());
        self.request_redraw();
    }

    pub fn set_reading(&self, reading: bool) {
        self.reading.store(reading, Ordering::SeqCst);
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::SeqCst)
    }

    pub fn notify_buffer_grew(&self) {
        self.buffer_grew.notify_one();
    }

    /// Wait until the query changed or the buffer grew, whichever comes first.
    ///
    /// Returns true for a query change. Pending signals of the other kind stay stored.
    pub async fn filter_trigger(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.query_changed.notified() => true,
            _ = self.buffer_grew.notified() => false,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Publish the Output Set and shut the session down with status `Selected`.
    ///
    /// The Output Set is the multi-selection when it is non-empty, otherwise the line
    /// under the cursor (or nothing when the result set is empty). Returns false if an
    /// Output Set had already been published.
    pub fn confirm(&self) -> bool {
        let output = {
            let results = self.results.read();
            let selection = self.selection.lock();
            if selection.selected_count() > 0 {
                selection.selected_lines()
            } else {
                results
                    .get(selection.cursor())
                    .map(|m| vec![m.line.clone()])
                    .unwrap_or_default()
            }
        };
        log::info!("confirmed {} line(s)", output.len());
        self.finish(ExitStatus::Selected, output)
    }

    /// Shut down with an empty Output Set and status `Cancelled`.
    pub fn cancel_selection(&self) -> bool {
        log::info!("selection cancelled");
        self.finish(ExitStatus::Cancelled, Vec::new())
    }

    fn finish(&self, status: ExitStatus, output: Vec<Line>) -> bool {
        let first = self.output.set(output).is_ok();
        if first {
            self.status.lock().get_or_insert(status);
        }
        self.cancel.cancel();
        self.request_redraw();
        first
    }

    /// Record a worker failure: status becomes `Failed` and every worker is cancelled.
    /// An Output Set that was already published is kept.
    pub fn fail(&self, message: &str) {
        log::error!("{message}");
        self.failure.lock().get_or_insert_with(|| message.to_string());
        *self.status.lock() = Some(ExitStatus::Failed);
        self.cancel.cancel();
        self.request_redraw();
    }

    /// The Output Set; empty until one was published.
    pub fn result(&self) -> Vec<Line> {
        self.output.get().cloned().unwrap_or_default()
    }

    /// The first worker failure, if any.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Final status; a session that ended without any decision counts as cancelled.
    pub fn exit_status(&self) -> ExitStatus {
        self.status.lock().unwrap_or(ExitStatus::Cancelled)
    }
}
