//! Signal relay: OS notifications forwarded into the session.
//!
//! A window-size change becomes a view resize; interrupt, terminate and hangup take the
//! same path as the cancel action. The relay keeps no state of its own.

use crate::app::Coordinator;
use crate::error::{Result, SiftError};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Resize,
    Interrupt,
}

/// Apply one signal to the coordinator.
pub fn forward(coordinator: &Coordinator, event: SignalEvent) {
    match event {
        SignalEvent::Resize => coordinator.request_resize(),
        SignalEvent::Interrupt => {
            log::info!("interrupted by signal");
            coordinator.cancel_selection();
        }
    }
}

/// Relay signals until the session is cancelled.
#[cfg(unix)]
pub async fn signal_relay_loop(coordinator: Arc<Coordinator>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let install = |kind: SignalKind| {
        signal(kind).map_err(|e| SiftError::worker(format!("cannot install signal handler: {e}")))
    };
    let mut winch = install(SignalKind::window_change())?;
    let mut interrupt = install(SignalKind::interrupt())?;
    let mut terminate = install(SignalKind::terminate())?;
    let mut hangup = install(SignalKind::hangup())?;

    let cancel = coordinator.cancellation_token().clone();
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(()) = winch.recv() => SignalEvent::Resize,
            Some(()) = interrupt.recv() => SignalEvent::Interrupt,
            Some(()) = terminate.recv() => SignalEvent::Interrupt,
            Some(()) = hangup.recv() => SignalEvent::Interrupt,
        };
        forward(&coordinator, event);
    }

    Ok(())
}

/// Relay Ctrl-C until the session is cancelled.
#[cfg(not(unix))]
pub async fn signal_relay_loop(coordinator: Arc<Coordinator>) -> Result<()> {
    let cancel = coordinator.cancellation_token().clone();
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| SiftError::worker(format!("cannot listen for Ctrl-C: {e}")))?;
            forward(&coordinator, SignalEvent::Interrupt);
        }
    }
    Ok(())
}
