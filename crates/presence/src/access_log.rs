//! Append-only request log.
//!
//! Every handled HTTP request produces one [`AccessLogRecord`]. Handlers
//! never touch the filesystem: records go over an unbounded channel to a
//! writer task that appends them to the log file, so a slow disk cannot
//! stall request handling.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// One handled request: who, when, what, and how it was answered.
#[derive(Debug, Clone)]
pub struct AccessLogRecord {
    pub origin: IpAddr,
    pub timestamp: DateTime<Local>,
    pub method: String,
    pub path: String,
    pub version: String,
    pub status: u16,
}

impl AccessLogRecord {
    /// Record stamped with the current local time.
    #[must_use]
    pub fn new(origin: IpAddr, method: &str, path: &str, version: &str, status: u16) -> Self {
        Self {
            origin,
            timestamp: Local::now(),
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            status,
        }
    }
}

impl fmt::Display for AccessLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} {} {} {}",
            self.origin,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.method,
            self.path,
            self.version,
            self.status
        )
    }
}

/// Cloneable sending half of the access log.
#[derive(Debug, Clone)]
pub struct AccessLog {
    tx: mpsc::UnboundedSender<AccessLogRecord>,
}

impl AccessLog {
    /// Queue one record for appending. Never blocks; if the writer task has
    /// exited the record is dropped.
    pub fn record(&self, record: AccessLogRecord) {
        let _ = self.tx.send(record);
    }
}

/// Spawn the writer task appending records to `path`, one line per record.
///
/// The task exits once every [`AccessLog`] clone has been dropped and the
/// channel drained. If the file cannot be opened the task logs the failure
/// and discards records instead of failing requests.
pub fn spawn_writer(path: PathBuf) -> (AccessLog, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AccessLogRecord>();
    let handle = tokio::spawn(async move {
        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(file) => file,
            Err(err) => {
                error!(path = %path.display(), error = %err, "unable to open access log, records will be dropped");
                while rx.recv().await.is_some() {}
                return;
            }
        };
        while let Some(record) = rx.recv().await {
            let line = format!("{record}\n");
            if let Err(err) = file.write_all(line.as_bytes()).await {
                error!(path = %path.display(), error = %err, "failed to append access log record");
            }
        }
    });
    (AccessLog { tx }, handle)
}
