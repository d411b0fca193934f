//! Per-day request log
//!
//! Appends one record per event to a plain-text file whose name is the
//! configured pattern expanded with the local date:
//!
//! ```text
//! User: 192.168.1.42 - October 18, 2026, 3:07 pm
//! Msg: Up to date: 18:FE:34:00:00:01  HW: ABCD SW: 2.0
//! -------------------------
//! ```
//!
//! Writes are best-effort. A failure is reported through `tracing` and the
//! request carries on. The file write runs on the blocking pool so a slow
//! disk never stalls a runtime worker.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

const SEPARATOR: &str = "-------------------------";
const TIMESTAMP_FORMAT: &str = "%B %-d, %Y, %-I:%M %P";

/// Append-only request log sink
#[derive(Debug)]
pub struct RequestLog {
    file_pattern: String,
    /// Serializes appends so records never interleave
    write_lock: Mutex<()>,
}

impl RequestLog {
    pub fn new(file_pattern: impl Into<String>) -> Self {
        Self {
            file_pattern: file_pattern.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Log file path for the day containing `now`
    pub fn path_for(&self, now: &DateTime<Local>) -> Option<PathBuf> {
        let mut name = String::new();
        write!(name, "{}", now.format(&self.file_pattern)).ok()?;
        Some(PathBuf::from(name))
    }

    /// Append a record stamped with the current time
    ///
    /// Resolves once the record is on disk (or the write has failed).
    pub async fn append(self: &Arc<Self>, client: &str, message: &str) {
        let log = Arc::clone(self);
        let client = client.to_string();
        let message = message.to_string();

        let result = tokio::task::spawn_blocking(move || {
            log.append_at(&client, &message, Local::now())
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Request log task failed");
        }
    }

    /// Append a record stamped with `now`, blocking the calling thread
    pub fn append_at(&self, client: &str, message: &str, now: DateTime<Local>) {
        let Some(path) = self.path_for(&now) else {
            tracing::warn!(pattern = %self.file_pattern, "Invalid request log file pattern");
            return;
        };
        let record = format_record(client, &now, message);

        let _guard = self.write_lock.lock();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(record.as_bytes()));

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write request log");
        }
    }
}

/// One complete log record, separator line included
pub fn format_record(client: &str, now: &DateTime<Local>, message: &str) -> String {
    format!(
        "User: {} - {}\nMsg: {}\n{}\n",
        client,
        now.format(TIMESTAMP_FORMAT),
        message,
        SEPARATOR
    )
}
