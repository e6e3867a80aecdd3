//! Bounded in-memory failure log with an append-only JSONL sink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::probe::ProbeResult;

/// Hard upper bound on how many failure records stay resident in memory.
pub const MAX_RESIDENT_CAP: usize = 100;

/// One failed probe, as held in memory and written to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub expected_status_code: u16,

    /// Status code received, or 0 when no response arrived
    pub status_code: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl FailureRecord {
    /// Build a record from a failed probe outcome.
    pub fn from_probe(result: &ProbeResult, url: &str, expected_status: u16) -> Self {
        Self {
            timestamp: result.timestamp,
            url: url.to_string(),
            expected_status_code: expected_status,
            status_code: result.status_code.unwrap_or(0),
            error: result.detail.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
struct StoreInner {
    records: VecDeque<FailureRecord>,
    sink: Option<File>,
}

/// Holds the most recent failures in memory and spills the rest to disk.
///
/// The deque and the sink share one lock so an eviction and its persist
/// happen atomically with respect to readers.
#[derive(Debug)]
pub struct FailureLogStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
    sink_path: PathBuf,
}

impl FailureLogStore {
    /// Open the store with the given resident capacity and sink path.
    ///
    /// A sink that cannot be opened leaves the store in a degraded mode
    /// where evicted records are dropped instead of persisted.
    pub async fn open(capacity: usize, sink_path: impl AsRef<Path>) -> Self {
        let sink_path = sink_path.as_ref().to_path_buf();
        let requested = capacity;
        let capacity = capacity.clamp(1, MAX_RESIDENT_CAP);
        if capacity != requested {
            warn!(
                "Resident failure capacity {} out of range, clamped to {}",
                requested, capacity
            );
        }

        let sink = match open_sink(&sink_path).await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    "Failed to open failure sink {}: {}. Evicted records will be dropped",
                    sink_path.display(),
                    e
                );
                None
            }
        };

        Self {
            inner: RwLock::new(StoreInner {
                records: VecDeque::with_capacity(capacity),
                sink,
            }),
            capacity,
            sink_path,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sink_path(&self) -> &Path {
        &self.sink_path
    }

    /// Append a failure record, evicting the oldest to the sink when full.
    pub async fn append(&self, record: FailureRecord) {
        let mut inner = self.inner.write().await;

        if inner.records.len() == self.capacity {
            if let Some(evicted) = inner.records.pop_front() {
                if let Err(e) = persist(&mut inner.sink, &evicted).await {
                    warn!("Failed to persist evicted failure record: {}", e);
                }
            }
        }

        inner.records.push_back(record);
        debug!("Failure log holds {} record(s)", inner.records.len());
    }

    /// The most recent `limit` records, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<FailureRecord> {
        let inner = self.inner.read().await;
        let n = limit.min(inner.records.len());
        inner
            .records
            .iter()
            .skip(inner.records.len() - n)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Flush every resident record to the sink, oldest first, then close it.
    ///
    /// Called on shutdown. Safe to call more than once.
    pub async fn drain(&self) {
        let mut inner = self.inner.write().await;

        let mut drained = 0usize;
        while let Some(record) = inner.records.pop_front() {
            if let Err(e) = persist(&mut inner.sink, &record).await {
                warn!("Failed to persist drained failure record: {}", e);
            }
            drained += 1;
        }

        if let Some(file) = inner.sink.take() {
            drop(file);
        }
        debug!("Drained {} failure record(s) to {}", drained, self.sink_path.display());
    }
}

async fn open_sink(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(file)
}

/// Write one record to the sink as a JSON line and fsync it.
async fn persist(sink: &mut Option<File>, record: &FailureRecord) -> Result<()> {
    let Some(file) = sink.as_mut() else {
        return Ok(());
    };

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    file.write_all(&line).await?;
    file.sync_all().await?;
    Ok(())
}
