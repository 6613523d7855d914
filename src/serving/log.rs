//! Prediction logging.
//!
//! A [`PredictionSink`] receives every successful prediction. Sinks must not
//! block the caller: [`JsonlPredictionLog`] queues entries on a bounded
//! channel and drops them when the queue is full.

use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Sender, TrySendError, bounded};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::serving::service::PredictionResult;

/// Longest description stored in a log entry, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Longest requirements or benefits text stored in a log entry, in characters.
pub const MAX_FIELD_CHARS: usize = 500;

/// Default queue capacity for [`JsonlPredictionLog`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// One logged prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    #[serde(flatten)]
    pub result: PredictionResult,
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

impl PredictionLogEntry {
    /// Build an entry stamped with the current time. Long inputs are truncated.
    pub fn new(
        description: &str,
        requirements: Option<&str>,
        benefits: Option<&str>,
        result: &PredictionResult,
    ) -> Self {
        PredictionLogEntry {
            timestamp: Utc::now(),
            description: truncate(description, MAX_DESCRIPTION_CHARS),
            requirements: requirements
                .filter(|s| !s.is_empty())
                .map(|s| truncate(s, MAX_FIELD_CHARS)),
            benefits: benefits
                .filter(|s| !s.is_empty())
                .map(|s| truncate(s, MAX_FIELD_CHARS)),
            result: result.clone(),
        }
    }
}

/// Receiver of successful predictions.
pub trait PredictionSink: Send + Sync + Debug {
    /// Offer an entry to the sink. Returns `false` if it was dropped.
    ///
    /// Must not block and must not panic.
    fn record(&self, entry: PredictionLogEntry) -> bool;
}

/// Appends entries to a JSON-lines file from a background thread.
#[derive(Debug)]
pub struct JsonlPredictionLog {
    path: PathBuf,
    sender: Option<Sender<PredictionLogEntry>>,
    writer: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl JsonlPredictionLog {
    /// Open (or create) `path` for appending with the default queue capacity.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_capacity(path, DEFAULT_QUEUE_CAPACITY)
    }

    /// Open (or create) `path` with a queue of `capacity` entries.
    pub fn with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (sender, receiver) = bounded::<PredictionLogEntry>(capacity);

        let log_path = path.clone();
        let writer = thread::Builder::new()
            .name("prediction-log".into())
            .spawn(move || {
                let mut out = BufWriter::new(file);
                for entry in receiver {
                    let written = serde_json::to_writer(&mut out, &entry)
                        .map_err(std::io::Error::from)
                        .and_then(|_| out.write_all(b"\n"))
                        .and_then(|_| out.flush());
                    if let Err(e) = written {
                        warn!("Failed to write prediction log {}: {}", log_path.display(), e);
                    }
                }
            })?;

        Ok(JsonlPredictionLog {
            path,
            sender: Some(sender),
            writer: Some(writer),
            dropped: AtomicU64::new(0),
        })
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting entries and wait for queued ones to be written.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("Prediction log writer for {} panicked", self.path.display());
            }
        }
    }
}

impl PredictionSink for JsonlPredictionLog {
    fn record(&self, entry: PredictionLogEntry) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(entry) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Prediction log queue full, dropping entry");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Prediction log writer stopped, dropping entry");
                false
            }
        }
    }
}

impl Drop for JsonlPredictionLog {
    fn drop(&mut self) {
        self.shutdown();
    }
}
