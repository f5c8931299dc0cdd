//! Filter engine
//!
//! Turns the current query and the line store into result sets. A query change triggers a
//! full pass over a store snapshot; a growth signal with no pending query change triggers
//! an incremental pass over the lines appended since the last pass. Publication goes
//! through the coordinator, which drops any pass whose generation is no longer current.

pub mod worker;

pub use worker::filter_worker_loop;

use crate::app::{Generation, Match};
use crate::buffer::Line;
use crate::matcher::CompiledQuery;

/// Lines evaluated between two abort checks.
pub const ABORT_CHECK_INTERVAL: usize = 4096;

/// Evaluate `lines` in order and collect the matches tagged with `generation`.
///
/// `should_abort` is polled every [`ABORT_CHECK_INTERVAL`] lines; `None` means the pass
/// was abandoned and its partial result must not be published.
pub fn filter_lines<F>(
    compiled: &CompiledQuery,
    lines: &[Line],
    generation: Generation,
    should_abort: F,
) -> Option<Vec<Match>>
where
    F: Fn() -> bool,
{
    let mut matches = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if index % ABORT_CHECK_INTERVAL == 0 && should_abort() {
            return None;
        }
        if let Some(ranges) = compiled.evaluate(line.text()) {
            matches.push(Match::new(line.clone(), generation, ranges));
        }
    }

    Some(matches)
}
