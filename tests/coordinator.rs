//! End-to-end sessions: a scripted event source drives the full worker set against an
//! in-memory input, and a recording renderer stands in for the terminal.

use parking_lot::Mutex;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use siftline::app::Session;
use siftline::input::{EventSource, RawInputEvent};
use siftline::render::ui::{UIRenderer, ViewSnapshot};
use siftline::{Coordinator, ExitStatus, Options, Result, SiftError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SESSION_TIMEOUT: Duration = Duration::from_secs(20);
const WAIT_LIMIT: Duration = Duration::from_secs(10);

type Condition = Box<dyn Fn(&Coordinator) -> bool + Send>;

enum Step {
    Key(KeyEvent),
    WaitFor(Condition),
}

/// Replays key presses, pausing at each `WaitFor` step until its condition holds.
struct ScriptedEvents {
    coordinator: Arc<Coordinator>,
    steps: VecDeque<Step>,
    waiting_since: Option<Instant>,
    limit: Duration,
}

impl ScriptedEvents {
    fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            coordinator: Arc::clone(coordinator),
            steps: VecDeque::new(),
            waiting_since: None,
            limit: WAIT_LIMIT,
        }
    }

    fn give_up_after(mut self, limit: Duration) -> Self {
        self.limit = limit;
        self
    }

    fn key(mut self, code: KeyCode) -> Self {
        self.steps.push_back(Step::Key(KeyEvent::new(code, KeyModifiers::NONE)));
        self
    }

    fn ctrl(mut self, c: char) -> Self {
        let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        self.steps.push_back(Step::Key(key));
        self
    }

    fn text(mut self, text: &str) -> Self {
        for c in text.chars() {
            self = self.key(KeyCode::Char(c));
        }
        self
    }

    fn wait_for(mut self, condition: impl Fn(&Coordinator) -> bool + Send + 'static) -> Self {
        self.steps.push_back(Step::WaitFor(Box::new(condition)));
        self
    }

    /// Wait until the published results belong to the current query and hold `count` lines.
    fn wait_for_results(self, count: usize) -> Self {
        self.wait_for(move |c| {
            let results = c.results();
            results.generation == c.current_generation() && results.len() == count
        })
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>> {
        let pause = timeout.min(Duration::from_millis(2));
        match self.steps.front() {
            Some(Step::Key(key)) => {
                let key = *key;
                self.steps.pop_front();
                Ok(Some(RawInputEvent::Key(key)))
            }
            Some(Step::WaitFor(condition)) => {
                if condition(&self.coordinator) {
                    self.steps.pop_front();
                    self.waiting_since = None;
                    return Ok(None);
                }
                let since = *self.waiting_since.get_or_insert_with(Instant::now);
                if since.elapsed() > self.limit {
                    return Err(SiftError::worker("scripted condition never held"));
                }
                std::thread::sleep(pause);
                Ok(None)
            }
            None => {
                std::thread::sleep(pause);
                Ok(None)
            }
        }
    }
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    frames: Arc<Mutex<Vec<ViewSnapshot>>>,
    initialized: Arc<Mutex<bool>>,
    refuse_setup: bool,
}

impl UIRenderer for RecordingRenderer {
    fn render(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
        self.frames.lock().push(snapshot.clone());
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        if self.refuse_setup {
            return Err(SiftError::terminal_setup("not a terminal"));
        }
        *self.initialized.lock() = true;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        *self.initialized.lock() = false;
        Ok(())
    }

    fn get_terminal_size(&self) -> Result<(u16, u16)> {
        Ok((80, 12))
    }
}

struct Outcome {
    status: ExitStatus,
    output: Vec<String>,
    renderer: RecordingRenderer,
}

async fn run_session(
    coordinator: Arc<Coordinator>,
    input: Vec<u8>,
    events: ScriptedEvents,
) -> Outcome {
    let renderer = RecordingRenderer::default();
    let session = Session {
        input: Box::new(std::io::Cursor::new(input)),
        renderer: Box::new(renderer.clone()),
        events: Box::new(events),
        relay_signals: false,
    };

    let status = tokio::time::timeout(SESSION_TIMEOUT, coordinator.run(session))
        .await
        .expect("session did not finish")
        .expect("session failed to start");

    let output = coordinator
        .result()
        .iter()
        .map(|line| line.output().to_string())
        .collect();
    Outcome {
        status,
        output,
        renderer,
    }
}

fn fruit() -> Vec<u8> {
    b"alpha\nBanana\ncancel\n".to_vec()
}

fn coordinator(options: Options) -> Arc<Coordinator> {
    Arc::new(Coordinator::new(&options))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirm_without_query_returns_first_line() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(3)
        .key(KeyCode::Enter);

    let outcome = run_session(Arc::clone(&coordinator), fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Selected);
    assert_eq!(outcome.status.code(), 0);
    assert_eq!(outcome.output, vec!["alpha"]);
    assert!(!*outcome.renderer.initialized.lock());
    assert!(!outcome.renderer.frames.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_returns_nothing() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator).key(KeyCode::Esc);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Cancelled);
    assert_eq!(outcome.status.code(), 1);
    assert!(outcome.output.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_narrows_results() {
    let coordinator = coordinator(Options::default());
    let seen = Arc::new(Mutex::new(None));
    let recorded = Arc::clone(&seen);
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(3)
        .text("an")
        .wait_for_results(2)
        .wait_for(move |c| {
            *recorded.lock() = Some(c.view_snapshot());
            true
        })
        .key(KeyCode::Enter);

    let outcome = run_session(Arc::clone(&coordinator), fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Selected);
    assert_eq!(outcome.output, vec!["Banana"]);

    let snapshot = seen.lock().take().expect("snapshot was taken");
    assert_eq!(snapshot.query, "an");
    assert_eq!(snapshot.status.matched, 2);
    assert_eq!(snapshot.status.total, 3);
    assert_eq!(snapshot.rows[0].ranges, vec![(1, 3)]);
    assert!(snapshot.rows[0].is_cursor);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_last_edit_wins() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .text("xyz")
        .key(KeyCode::Backspace)
        .key(KeyCode::Backspace)
        .key(KeyCode::Backspace)
        .text("can")
        .wait_for(|c| !c.is_reading())
        .wait_for_results(1)
        .key(KeyCode::Enter);

    let outcome = run_session(Arc::clone(&coordinator), fruit(), events).await;

    assert_eq!(coordinator.query_snapshot().0, "can");
    assert_eq!(outcome.output, vec!["cancel"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_selection_survives_refiltering() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(3)
        .key(KeyCode::Down)
        .key(KeyCode::Tab)
        .text("alp")
        .wait_for_results(1)
        .key(KeyCode::Enter);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Selected);
    assert_eq!(outcome.output, vec!["Banana"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_output_keeps_arrival_order() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(3)
        .key(KeyCode::End)
        .key(KeyCode::Tab)
        .key(KeyCode::Home)
        .key(KeyCode::Tab)
        .key(KeyCode::Enter);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.output, vec!["alpha", "cancel"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_seeded_query_filters_before_input() {
    let coordinator = coordinator(Options::default());
    coordinator.set_query("ban");
    let events = ScriptedEvents::new(&coordinator)
        .wait_for(|c| !c.is_reading())
        .wait_for_results(1)
        .key(KeyCode::Enter);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.output, vec!["Banana"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_regex_is_not_fatal() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(3)
        .ctrl('r')
        .ctrl('r')
        .text("(an")
        .wait_for(|c| {
            let results = c.results();
            results.generation == c.current_generation() && results.error.is_some()
        })
        .ctrl('a')
        .key(KeyCode::Delete)
        .wait_for_results(2)
        .key(KeyCode::Enter);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Selected);
    assert_eq!(outcome.output, vec!["Banana"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_null_separator_emits_payload() {
    let options = Options {
        null_separator: true,
        ..Options::default()
    };
    let coordinator = coordinator(options);
    let events = ScriptedEvents::new(&coordinator)
        .wait_for_results(2)
        .text("two")
        .wait_for_results(1)
        .key(KeyCode::Enter);

    let input = b"one\0/tmp/1\ntwo\0/tmp/2\n".to_vec();
    let outcome = run_session(coordinator, input, events).await;

    assert_eq!(outcome.output, vec!["/tmp/2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bounded_buffer_keeps_newest_lines() {
    let options = Options {
        buffer_size: 2,
        ..Options::default()
    };
    let coordinator = coordinator(options);
    let events = ScriptedEvents::new(&coordinator)
        .wait_for(|c| !c.is_reading())
        .wait_for_results(2)
        .key(KeyCode::Enter);

    let outcome = run_session(coordinator, fruit(), events).await;

    assert_eq!(outcome.output, vec!["Banana"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_large_pass() {
    let mut input = Vec::new();
    for i in 0..200_000 {
        input.extend_from_slice(format!("record {i} of a long input stream\n").as_bytes());
    }

    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .wait_for(|c| c.store().len() > 1_000)
        .text("99")
        .key(KeyCode::Esc);

    let outcome = run_session(Arc::clone(&coordinator), input, events).await;

    assert_eq!(outcome.status, ExitStatus::Cancelled);
    assert!(outcome.output.is_empty());
    assert!(coordinator.failure().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminal_setup_failure_starts_no_worker() {
    let coordinator = coordinator(Options::default());
    let renderer = RecordingRenderer {
        refuse_setup: true,
        ..RecordingRenderer::default()
    };
    let session = Session {
        input: Box::new(std::io::Cursor::new(fruit())),
        renderer: Box::new(renderer.clone()),
        events: Box::new(ScriptedEvents::new(&coordinator)),
        relay_signals: false,
    };

    let err = coordinator.run(session).await.unwrap_err();

    assert!(matches!(err, SiftError::TerminalSetup { .. }));
    assert!(coordinator.store().is_empty());
    assert!(renderer.frames.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_event_source_shuts_down_with_failure() {
    let coordinator = coordinator(Options::default());
    let events = ScriptedEvents::new(&coordinator)
        .give_up_after(Duration::from_millis(100))
        .wait_for(|_| false);

    let outcome = run_session(Arc::clone(&coordinator), fruit(), events).await;

    assert_eq!(outcome.status, ExitStatus::Failed);
    assert_eq!(outcome.status.code(), 1);
    assert!(outcome.output.is_empty());
    assert!(coordinator
        .failure()
        .is_some_and(|message| message.contains("input dispatcher")));
}
