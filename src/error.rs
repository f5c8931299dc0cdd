//! Error types and handling infrastructure for siftline.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context at the top level.
//!
//! ## Error classes
//!
//! - **Input source errors**: the stream cannot be opened or decoded. Fatal, reported
//!   before any terminal setup happens.
//! - **Query-level errors**: an invalid pattern for the regex matcher. Never fatal; the
//!   filter engine publishes an empty result set carrying the message.
//! - **Worker failures**: unexpected errors or panics inside a worker. The coordinator
//!   converts them into a clean shutdown with a failure exit status.
//! - **Terminal setup errors**: raw mode or screen initialization failed. Fatal, reported
//!   before any worker starts.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for siftline operations.
#[derive(Error, Debug)]
pub enum SiftError {
    /// The input stream could not be opened or read
    #[error("Input source error: {message}")]
    InputSource {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Input file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Neither a file argument nor piped standard input was supplied
    #[error("No input: supply a file name or pipe data on standard input")]
    NoInput,

    /// Compressed input could not be decoded
    #[error("Decompression failed: {message}")]
    Decompression { message: String },

    /// The query could not be compiled by the active matcher
    #[error("Invalid pattern: {message}")]
    Pattern { message: String },

    /// Raw mode or screen setup failed
    #[error("Terminal setup failed: {message}")]
    TerminalSetup { message: String },

    /// Drawing or reading from the terminal failed after setup
    #[error("UI operation failed: {message}")]
    UIError { message: String },

    /// Settings file errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Key binding or action name could not be resolved
    #[error("Invalid key binding: {message}")]
    Keymap { message: String },

    /// A worker task failed or panicked
    #[error("Worker failed: {message}")]
    Worker { message: String },

    /// Any other I/O failure
    #[error("I/O operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for siftline operations.
pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    /// Create an InputSource error from an io::Error with additional context
    pub fn input_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::InputSource {
            message: message.into(),
            source,
        }
    }

    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    pub fn terminal_setup(message: impl Into<String>) -> Self {
        Self::TerminalSetup {
            message: message.into(),
        }
    }

    pub fn ui(message: impl Into<String>) -> Self {
        Self::UIError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn keymap(message: impl Into<String>) -> Self {
        Self::Keymap {
            message: message.into(),
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SiftError {
    fn from(err: std::io::Error) -> Self {
        let message = match err.kind() {
            std::io::ErrorKind::NotFound => "Not found",
            std::io::ErrorKind::PermissionDenied => "Permission denied",
            std::io::ErrorKind::BrokenPipe => "Broken pipe",
            _ => "IO operation failed",
        };
        Self::IoError {
            message: message.to_string(),
            source: err,
        }
    }
}
