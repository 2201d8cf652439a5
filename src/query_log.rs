//! Query Log
//!
//! Appends one line per answered query to a log file and mirrors it to stdout.
//!
//! Resolutions hand events to a channel and move on; a single writer task
//! owns the file, so lines land in the order they were recorded and a failing
//! disk never slows down or fails a query.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// == Query Source ==
/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Cache,
    Upstream,
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::Cache => write!(f, "Cache"),
            QuerySource::Upstream => write!(f, "Upstream"),
        }
    }
}

// == Query Event ==
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub timestamp: DateTime<Local>,
    pub domain: String,
    pub source: QuerySource,
}

impl QueryEvent {
    /// Renders `[<timestamp>] Domain: <domain>, <Cache|Upstream>`.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] Domain: {}, {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.domain,
            self.source
        )
    }
}

// == Query Log Handle ==
/// Cheap, cloneable sender side of the query log.
#[derive(Debug, Clone)]
pub struct QueryLog {
    tx: Option<mpsc::UnboundedSender<QueryEvent>>,
}

impl QueryLog {
    /// Starts the writer task appending to `path`.
    ///
    /// The writer stops once every `QueryLog` clone has been dropped and the
    /// pending events are written.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, QueryLogWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(path.into(), rx));
        (Self { tx: Some(tx) }, QueryLogWriter { handle })
    }

    /// A log that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Records an answered query. Never blocks and never fails.
    pub fn record(&self, domain: &str, source: QuerySource) {
        let Some(tx) = &self.tx else {
            return;
        };
        let event = QueryEvent {
            timestamp: Local::now(),
            domain: domain.to_string(),
            source,
        };
        if tx.send(event).is_err() {
            debug!(domain, "Query log writer already stopped, event dropped");
        }
    }
}

// == Writer Task ==
/// Join handle of the writer task.
#[derive(Debug)]
pub struct QueryLogWriter {
    handle: JoinHandle<()>,
}

impl QueryLogWriter {
    /// Waits for the writer to drain. Only returns once all `QueryLog`
    /// handles are gone.
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            warn!("Query log writer terminated abnormally: {}", e);
        }
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<QueryEvent>) {
    let mut file: Option<File> = None;

    while let Some(event) = rx.recv().await {
        let line = event.to_line();
        println!("{}", line);

        if file.is_none() {
            file = open_append(&path).await;
        }
        if let Some(f) = file.as_mut() {
            if let Err(e) = write_line(f, &line).await {
                warn!(path = %path.display(), "Failed to write query log: {}", e);
                // Reopen on the next event
                file = None;
            }
        }
    }
}

async fn open_append(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path).await {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %path.display(), "Failed to open query log: {}", e);
            None
        }
    }
}

async fn write_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
