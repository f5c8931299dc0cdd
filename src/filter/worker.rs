use crate::app::{Coordinator, Generation, Match, ResultSet};
use crate::buffer::{Line, Ordinal};
use crate::error::{Result, SiftError};
use crate::filter::filter_lines;
use crate::matcher::CompiledQuery;
use std::sync::Arc;

/// Run the filter engine until the session is cancelled.
///
/// At most one pass runs at a time. Triggers that arrive during a pass are stored by the
/// coordinator's signals and collapse into a single follow-up pass.
pub async fn filter_worker_loop(coordinator: Arc<Coordinator>) -> Result<()> {
    let cancel = coordinator.cancellation_token().clone();
    let mut engine = FilterEngine::new(Arc::clone(&coordinator));
    log::debug!("filter engine started");

    loop {
        let query_changed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = coordinator.filter_trigger() => changed,
        };
        log::trace!("filter triggered (query changed: {query_changed})");
        engine.run_pass().await?;
    }

    log::debug!("filter engine stopped");
    Ok(())
}

/// Pass bookkeeping: which generation is on display and how far into the store it goes.
struct FilterEngine {
    coordinator: Arc<Coordinator>,
    /// Generation of the last published full pass
    published: Option<Generation>,
    /// Query compiled for `published`; `None` after a query-level error
    compiled: Option<Arc<CompiledQuery>>,
    /// First ordinal not yet evaluated for `published`
    next_ordinal: Ordinal,
}

impl FilterEngine {
    fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            published: None,
            compiled: None,
            next_ordinal: 0,
        }
    }

    /// Full pass when the generation moved since the last publication, otherwise an
    /// incremental pass over new lines.
    async fn run_pass(&mut self) -> Result<()> {
        let (query, matcher, generation) = self.coordinator.query_snapshot();
        if self.published == Some(generation) {
            return self.incremental_pass(generation).await;
        }

        let compiled = match matcher.compile(&query) {
            Ok(compiled) => Arc::new(compiled),
            Err(err) => {
                log::debug!("query {query:?} rejected by {matcher}: {err}");
                let next = self.coordinator.store().next_ordinal();
                if self
                    .coordinator
                    .publish_results(ResultSet::failed(generation, err.to_string()))
                {
                    self.published = Some(generation);
                    self.compiled = None;
                    self.next_ordinal = next;
                }
                return Ok(());
            }
        };

        let (lines, end) = self.coordinator.store().snapshot();
        let Some(matches) = self.evaluate(Arc::clone(&compiled), lines, generation).await? else {
            log::debug!("full pass for generation {generation} abandoned");
            return Ok(());
        };

        if self
            .coordinator
            .publish_results(ResultSet::new(generation, matches))
        {
            self.published = Some(generation);
            self.compiled = Some(compiled);
            self.next_ordinal = end;
        }
        Ok(())
    }

    async fn incremental_pass(&mut self, generation: Generation) -> Result<()> {
        let store = self.coordinator.store();
        let (lines, end) = store.lines_from(self.next_ordinal);
        if end == self.next_ordinal {
            return Ok(());
        }

        let Some(compiled) = self.compiled.clone() else {
            // query-level error on display; nothing can match
            self.next_ordinal = end;
            return Ok(());
        };

        let Some(matches) = self.evaluate(compiled, lines, generation).await? else {
            return Ok(());
        };

        let first_retained = self.coordinator.store().first_ordinal();
        if self
            .coordinator
            .extend_results(generation, matches, first_retained)
        {
            self.next_ordinal = end;
        }
        Ok(())
    }

    /// Match `lines` on the blocking pool, giving up early once the session is cancelled
    /// or the query moved on.
    async fn evaluate(
        &self,
        compiled: Arc<CompiledQuery>,
        lines: Vec<Line>,
        generation: Generation,
    ) -> Result<Option<Vec<Match>>> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::task::spawn_blocking(move || {
            filter_lines(&compiled, &lines, generation, || {
                coordinator.is_cancelled() || coordinator.current_generation() != generation
            })
        })
        .await
        .map_err(|e| SiftError::worker(format!("filter pass failed: {e}")))
    }
}
