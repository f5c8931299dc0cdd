//! Rendering subsystem: the view worker and the terminal surface it draws on.

pub mod service;
pub mod ui;

pub use service::{ViewPhase, ViewService};
