//! View worker.
//!
//! Two states: idle (waiting for a redraw request) and refreshing (snapshot the
//! coordinator, draw, flush). Any number of requests that arrive while refreshing collapse
//! into one further refresh.

use crate::app::Coordinator;
use crate::error::Result;
use crate::render::ui::renderer::{list_height, UIRenderer};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Refreshing,
}

/// Owns the renderer for the lifetime of the session.
pub struct ViewService {
    coordinator: Arc<Coordinator>,
    renderer: Box<dyn UIRenderer>,
    phase: ViewPhase,
}

impl ViewService {
    /// `renderer` must already be initialized.
    pub fn new(coordinator: Arc<Coordinator>, renderer: Box<dyn UIRenderer>) -> Self {
        Self {
            coordinator,
            renderer,
            phase: ViewPhase::Idle,
        }
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// Redraw on request until cancelled, then restore the terminal.
    pub async fn run(mut self) -> Result<()> {
        let cancel = self.coordinator.cancellation_token().clone();
        log::debug!("view worker started");

        self.update_page_height();
        let mut outcome = self.refresh();

        while outcome.is_ok() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.coordinator.redraw_requested() => {}
            }
            outcome = self.refresh();
        }

        let cleanup = self.renderer.cleanup();
        log::debug!("view worker stopped");
        outcome.and(cleanup)
    }

    /// Snapshot and draw one frame.
    pub fn refresh(&mut self) -> Result<()> {
        self.phase = ViewPhase::Refreshing;
        if self.coordinator.take_resize() {
            self.update_page_height();
        }

        let snapshot = self.coordinator.view_snapshot();
        let drawn = self.renderer.render(&snapshot);
        self.phase = ViewPhase::Idle;
        drawn
    }

    fn update_page_height(&self) {
        match self.renderer.get_terminal_size() {
            Ok((_, height)) => self.coordinator.set_page_height(list_height(height)),
            Err(err) => log::warn!("cannot read terminal size: {err}"),
        }
    }
}
