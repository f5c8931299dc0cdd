//! Buffer reader worker: pulls lines from the input stream into the [`LineStore`].
//!
//! The reader is the only writer of the line store. Growth is announced through the
//! coordinator's coalescing "buffer grew" signal, at most once per batch of lines that
//! were already sitting in the read buffer, so a fast producer does not wake the filter
//! engine once per line.

use crate::app::Coordinator;
use crate::buffer::compression::{decoding_reader, detect_compression};
use crate::buffer::{LineStore, Ordinal};
use crate::error::{Result, SiftError};
use bstr::ByteSlice;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Upper bound on lines appended between two growth notifications.
const GROWTH_BATCH: usize = 4096;

/// Where the lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// Pick the input: an explicit file wins, otherwise standard input when it is piped.
    pub fn detect(file: Option<PathBuf>) -> Result<Self> {
        match file {
            Some(path) => Ok(Self::File(path)),
            None if !std::io::stdin().is_terminal() => Ok(Self::Stdin),
            None => Err(SiftError::NoInput),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Open the input stream, decoding compressed files transparently.
///
/// Every failure here is an input-source error and must be reported before the
/// terminal is touched.
pub async fn open_input(source: &InputSource) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match source {
        InputSource::Stdin => Ok(Box::new(tokio::io::stdin())),
        InputSource::File(path) => {
            validate_file_path(path)?;
            let compression = detect_compression(path).await;
            let file = File::open(path).await.map_err(|e| {
                SiftError::input_source(format!("Cannot open {}", path.display()), e)
            })?;
            if compression.is_compressed() {
                log::debug!("decoding {} input from {}", compression.name(), path.display());
            }
            Ok(decoding_reader(file, compression))
        }
    }
}

fn validate_file_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SiftError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| SiftError::input_source("Failed to read file metadata", e))?;
    if !metadata.is_file() {
        return Err(SiftError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Append one raw line (terminator included or not) to the store.
///
/// With `null_separator`, a line shaped `display\0payload` is matched and shown as
/// `display` and emits `payload` on confirmation.
pub fn ingest_line(store: &LineStore, raw: &[u8], null_separator: bool) -> Ordinal {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

    if null_separator {
        if let Some(pos) = memchr::memchr(0, raw) {
            let display = raw[..pos].to_str_lossy();
            let payload = raw[pos + 1..].to_str_lossy();
            return store.append_with_output(display.as_ref(), payload.as_ref());
        }
    }

    store.append(raw.to_str_lossy().as_ref())
}

/// Worker that ingests the input stream line by line.
pub struct BufferReader {
    reader: BufReader<Box<dyn AsyncRead + Unpin + Send>>,
    coordinator: Arc<Coordinator>,
}

impl BufferReader {
    pub fn new(input: Box<dyn AsyncRead + Unpin + Send>, coordinator: Arc<Coordinator>) -> Self {
        Self {
            reader: BufReader::new(input),
            coordinator,
        }
    }

    /// Read until end-of-stream, a read error, or cancellation.
    ///
    /// A read error ends ingestion and is surfaced as a status notice; it never cancels
    /// the session.
    pub async fn run(mut self) -> Result<()> {
        let cancel = self.coordinator.cancellation_token().clone();
        let null_separator = self.coordinator.null_separator();
        let mut buf = Vec::with_capacity(256);
        let mut pending = 0usize;

        self.coordinator.set_reading(true);
        log::debug!("buffer reader started");

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                read = self.reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    log::debug!(
                        "end of input after {} lines",
                        self.coordinator.store().total_appended()
                    );
                    break;
                }
                Ok(_) => {
                    ingest_line(self.coordinator.store(), &buf, null_separator);
                    pending += 1;
                    if pending >= GROWTH_BATCH || self.reader.buffer().is_empty() {
                        self.coordinator.notify_buffer_grew();
                        pending = 0;
                    }
                }
                Err(err) => {
                    log::warn!("input read failed: {err}");
                    self.coordinator.set_notice(format!("Input read error: {err}"));
                    break;
                }
            }
        }

        self.coordinator.set_reading(false);
        self.coordinator.notify_buffer_grew();
        self.coordinator.request_redraw();
        log::debug!("buffer reader finished");
        Ok(())
    }
}
