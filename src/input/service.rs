//! Input dispatcher.
//!
//! Maps primitive events through the keymap to [`Action`]s and applies them to the
//! coordinator. Confirm and cancel are the only actions that end the session.

use crate::app::{Coordinator, QueryState};
use crate::config::Action;
use crate::error::Result;
use crate::input::raw::{EventSource, RawInputEvent};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;

/// How long one poll of the event source may block before cancellation is rechecked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Applies input to the shared session state.
pub struct InputService {
    coordinator: Arc<Coordinator>,
}

impl InputService {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    pub fn handle_event(&self, event: RawInputEvent) {
        match event {
            RawInputEvent::Key(key) => self.handle_key(key),
            RawInputEvent::Resize => self.coordinator.request_resize(),
            scroll @ RawInputEvent::Scroll { .. } => {
                if let Some(delta) = scroll.scroll_delta() {
                    self.coordinator.move_cursor(delta);
                }
            }
        }
    }

    /// Resolve a key: bound keys run their action, unbound printable characters are
    /// typed into the query, anything else is ignored.
    pub fn handle_key(&self, key: KeyEvent) {
        if let Some(action) = self.coordinator.keymap().lookup(&key) {
            self.apply(action);
            return;
        }

        if let Some(ch) = typed_char(&key) {
            self.coordinator.edit_query(|query| query.insert_char(ch));
        } else {
            log::trace!("ignoring unbound key {key:?}");
        }
    }

    pub fn apply(&self, action: Action) {
        let coordinator = &self.coordinator;
        match action {
            Action::Confirm => {
                coordinator.confirm();
            }
            Action::Cancel => {
                coordinator.cancel_selection();
            }
            Action::CursorUp => {
                coordinator.move_cursor(-1);
            }
            Action::CursorDown => {
                coordinator.move_cursor(1);
            }
            Action::PageUp => {
                coordinator.page_up();
            }
            Action::PageDown => {
                coordinator.page_down();
            }
            Action::CursorFirst => {
                coordinator.cursor_first();
            }
            Action::CursorLast => {
                coordinator.cursor_last();
            }
            Action::ToggleSelection => {
                coordinator.toggle_selection();
            }
            Action::ToggleSelectionAndSelectNext => {
                coordinator.toggle_selection();
                coordinator.move_cursor(1);
            }
            Action::DeleteBackwardChar => self.edit(QueryState::delete_backward_char),
            Action::DeleteForwardChar => self.edit(QueryState::delete_forward_char),
            Action::DeleteBackwardWord => self.edit(QueryState::delete_backward_word),
            Action::KillEndOfLine => self.edit(QueryState::kill_end_of_line),
            Action::ClearQuery => self.edit(QueryState::clear),
            Action::ForwardChar => self.edit(QueryState::forward_char),
            Action::BackwardChar => self.edit(QueryState::backward_char),
            Action::BeginningOfLine => self.edit(QueryState::beginning_of_line),
            Action::EndOfLine => self.edit(QueryState::end_of_line),
            Action::RotateMatcher => {
                coordinator.rotate_matcher();
            }
            Action::Nop => {}
        }
    }

    fn edit(&self, edit: fn(&mut QueryState) -> bool) {
        self.coordinator.edit_query(edit);
    }
}

/// Character a key types into the query, if any.
fn typed_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                && !ch.is_control() =>
        {
            Some(ch)
        }
        _ => None,
    }
}

/// Blocking dispatcher loop; run it on a dedicated thread.
///
/// Returns once the session is cancelled or the event source fails.
pub fn input_loop(mut source: Box<dyn EventSource>, service: InputService) -> Result<()> {
    let cancel = service.coordinator.cancellation_token().clone();
    log::debug!("input dispatcher started");

    while !cancel.is_cancelled() {
        if let Some(event) = source.poll_event(POLL_INTERVAL)? {
            service.handle_event(event);
        }
    }

    log::debug!("input dispatcher stopped");
    Ok(())
}
