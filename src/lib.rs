//! # siftline - Interactive Incremental Line Filter
//!
//! Reads lines from a file or standard input, lets the user narrow them down by typing a
//! query, and prints the chosen lines on standard output once the user confirms.
//!
//! ## Features
//!
//! - **Live filtering**: every keystroke starts a new pass; stale passes are abandoned
//! - **Streaming input**: lines can be filtered while they are still being read
//! - **Three matchers**: case-insensitive, case-sensitive and regular expressions
//! - **Bounded memory**: an optional ring buffer keeps only the newest lines
//! - **Compression Support**: transparent handling of gzip, bzip2, xz and zstd files
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Resolved options, keymap and settings file
//! - [`buffer`] - Line store and the buffer reader worker
//! - [`matcher`] - Matcher variants and compiled queries
//! - [`filter`] - Filter passes and the filter engine worker
//! - [`app`] - The coordinator: shared state, generations and shutdown
//! - [`input`] - Terminal events to actions
//! - [`render`] - View worker and terminal drawing
//! - [`signal`] - OS signals relayed into the session

pub mod error;

pub mod buffer;
pub mod config;
pub mod matcher;

pub mod app;
pub mod filter;
pub mod input;
pub mod render;
pub mod signal;

pub use error::{Result, SiftError};

pub use app::{Coordinator, ExitStatus, Session};
pub use buffer::{Line, LineStore};
pub use config::Options;
pub use matcher::Matcher;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
