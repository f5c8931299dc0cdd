//! Low-level input collection: terminal event polling, mouse wheel coalescing, and
//! translation into the primitive events the input dispatcher consumes.

use crate::error::Result;
use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Wheel ticks in the same direction closer together than this are merged.
const COALESCE_WINDOW: Duration = Duration::from_millis(12);
/// Cursor movement produced by one wheel tick.
pub const WHEEL_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Primitive events surfaced to the input dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInputEvent {
    Key(KeyEvent),
    Resize,
    Scroll {
        direction: ScrollDirection,
        lines: usize,
    },
}

impl RawInputEvent {
    /// Signed cursor movement for a scroll event.
    pub fn scroll_delta(&self) -> Option<isize> {
        match *self {
            Self::Scroll { direction, lines } => {
                let lines = isize::try_from(lines).unwrap_or(isize::MAX);
                Some(match direction {
                    ScrollDirection::Up => -lines,
                    ScrollDirection::Down => lines,
                })
            }
            _ => None,
        }
    }
}

/// Blocking source of terminal events.
///
/// The dispatcher only reads from it; nothing here ever writes to the screen.
pub trait EventSource: Send {
    /// Wait up to `timeout` for the next event; `Ok(None)` on timeout.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>>;
}

/// Merges bursts of wheel ticks into one larger step.
#[derive(Debug, Clone)]
struct WheelCoalescer {
    window: Duration,
    pending: Option<(ScrollDirection, usize, Instant)>,
}

impl WheelCoalescer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Add a tick; returns the previous burst when the direction changed.
    fn push(
        &mut self,
        direction: ScrollDirection,
        lines: usize,
        now: Instant,
    ) -> Option<RawInputEvent> {
        match self.pending.as_mut() {
            Some((pending_dir, pending_lines, last)) if *pending_dir == direction => {
                *pending_lines = pending_lines.saturating_add(lines);
                *last = now;
                None
            }
            _ => {
                let flushed = self.flush();
                self.pending = Some((direction, lines, now));
                flushed
            }
        }
    }

    fn flush_if_stale(&mut self, now: Instant) -> Option<RawInputEvent> {
        match self.pending {
            Some((_, _, last)) if now.duration_since(last) >= self.window => self.flush(),
            _ => None,
        }
    }

    fn flush(&mut self) -> Option<RawInputEvent> {
        self.pending
            .take()
            .map(|(direction, lines, _)| RawInputEvent::Scroll { direction, lines })
    }
}

/// [`EventSource`] backed by the real terminal.
#[derive(Debug)]
pub struct RawInputCollector {
    wheel: WheelCoalescer,
    queued: VecDeque<RawInputEvent>,
}

impl Default for RawInputCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RawInputCollector {
    pub fn new() -> Self {
        Self::with_window(COALESCE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            wheel: WheelCoalescer::new(window),
            queued: VecDeque::new(),
        }
    }

    /// Feed one terminal event through the translation and coalescing rules.
    pub fn process_event(&mut self, event: Event, now: Instant) {
        match event {
            // Release and repeat reports only arrive with enhanced keyboard protocols
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.flush_wheel();
                self.queued.push_back(RawInputEvent::Key(key));
            }
            Event::Resize(_, _) => {
                self.flush_wheel();
                self.queued.push_back(RawInputEvent::Resize);
            }
            Event::Mouse(mouse) => {
                let direction = match mouse.kind {
                    MouseEventKind::ScrollUp => ScrollDirection::Up,
                    MouseEventKind::ScrollDown => ScrollDirection::Down,
                    _ => return,
                };
                if let Some(flushed) = self.wheel.push(direction, WHEEL_STEP, now) {
                    self.queued.push_back(flushed);
                }
            }
            _ => {}
        }
    }

    /// Next ready event without touching the terminal.
    pub fn next_ready(&mut self, now: Instant) -> Option<RawInputEvent> {
        self.queued
            .pop_front()
            .or_else(|| self.wheel.flush_if_stale(now))
    }

    fn flush_wheel(&mut self) {
        if let Some(flushed) = self.wheel.flush() {
            self.queued.push_back(flushed);
        }
    }
}

impl EventSource for RawInputCollector {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>> {
        if let Some(ready) = self.next_ready(Instant::now()) {
            return Ok(Some(ready));
        }

        // A pending wheel burst must not wait a whole poll interval to be flushed
        let timeout = if self.wheel.pending.is_some() {
            timeout.min(self.wheel.window)
        } else {
            timeout
        };

        if event::poll(timeout)? {
            let event = event::read()?;
            self.process_event(event, Instant::now());
        }
        Ok(self.next_ready(Instant::now()))
    }
}
