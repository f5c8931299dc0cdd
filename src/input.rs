//! Input subsystem: terminal event collection and action dispatch.

pub mod raw;
pub mod service;

pub use raw::{EventSource, RawInputCollector, RawInputEvent, ScrollDirection};
pub use service::{input_loop, InputService};
