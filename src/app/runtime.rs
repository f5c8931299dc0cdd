use crate::app::{Coordinator, ExitStatus};
use crate::buffer::BufferReader;
use crate::error::Result;
use crate::filter::filter_worker_loop;
use crate::input::{input_loop, EventSource, InputService};
use crate::render::ui::UIRenderer;
use crate::render::ViewService;
use crate::signal::signal_relay_loop;
use std::any::Any;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::task::JoinSet;

/// External collaborators for one interactive session.
pub struct Session {
    /// Already opened input stream
    pub input: Box<dyn AsyncRead + Unpin + Send>,
    /// Terminal surface, not yet initialized
    pub renderer: Box<dyn UIRenderer>,
    /// Source of key and resize events
    pub events: Box<dyn EventSource>,
    /// Relay OS signals; off in tests so the test harness keeps its own handlers
    pub relay_signals: bool,
}

type WorkerResult = (&'static str, Result<()>);

impl Coordinator {
    /// Run the session to completion.
    ///
    /// The terminal is initialized first; a failure there is returned before any worker
    /// starts. Afterwards every worker runs until cancellation and is joined before this
    /// returns. Worker errors and panics are turned into a [`ExitStatus::Failed`] shutdown.
    pub async fn run(self: &Arc<Self>, session: Session) -> Result<ExitStatus> {
        let Session {
            input,
            mut renderer,
            events,
            relay_signals,
        } = session;

        renderer.initialize()?;
        log::debug!("terminal initialized, starting workers");

        let mut workers: JoinSet<WorkerResult> = JoinSet::new();

        let reader = BufferReader::new(input, Arc::clone(self));
        workers.spawn(async move { ("buffer reader", reader.run().await) });

        let coordinator = Arc::clone(self);
        workers.spawn(async move { ("filter engine", filter_worker_loop(coordinator).await) });

        let view = ViewService::new(Arc::clone(self), renderer);
        workers.spawn(async move { ("view", view.run().await) });

        let service = InputService::new(Arc::clone(self));
        workers.spawn_blocking(move || ("input dispatcher", input_loop(events, service)));

        if relay_signals {
            let coordinator = Arc::clone(self);
            workers.spawn(async move { ("signal relay", signal_relay_loop(coordinator).await) });
        }

        self.execute_seed();

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((name, Ok(()))) => log::debug!("{name} finished"),
                Ok((name, Err(err))) => self.fail(&format!("{name} failed: {err}")),
                Err(err) if err.is_panic() => {
                    let message = panic_message(err.into_panic());
                    self.fail(&format!("worker panicked: {message}"));
                }
                Err(err) => self.fail(&format!("worker aborted: {err}")),
            }
        }

        let status = self.exit_status();
        log::info!("session finished: {status:?}");
        Ok(status)
    }

    /// Kick off the first filter pass for a pre-seeded query.
    fn execute_seed(&self) {
        let (query, _, generation) = self.query_snapshot();
        if generation > 0 {
            log::debug!("executing seeded query {query:?}");
            self.execute_query();
        } else {
            self.request_redraw();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
