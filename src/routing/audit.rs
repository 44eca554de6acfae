//! Audit log - one line per intake call, write-only
//!
//! Every intake outcome lands here, including silent and suppressed
//! ones. The engine never reads this file back; it exists for the
//! operator's `tail -f`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use super::priority::Priority;

const MESSAGE_PREVIEW_LEN: usize = 200;

#[derive(Debug, Serialize)]
struct AuditLine<'a> {
    ts: DateTime<Utc>,
    priority: &'a str,
    event_kind: &'a str,
    outcome: &'a str,
    message: &'a str,
}

/// Plain-text audit trail
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one line. Best-effort: a failed audit write is logged and
    /// swallowed, it must never fail the intake that produced it.
    pub fn log(
        &self,
        ts: DateTime<Utc>,
        priority: Priority,
        event_kind: &str,
        outcome: &str,
        message: &str,
    ) {
        let preview = truncate(message, MESSAGE_PREVIEW_LEN);
        let line = AuditLine {
            ts,
            priority: priority.as_str(),
            event_kind,
            outcome,
            message: &preview,
        };

        if let Err(e) = self.append(&line) {
            warn!(error = %e, "Failed to write audit log");
        }
    }

    fn append(&self, line: &AuditLine<'_>) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let mut file = file;
        let result = writeln!(file, "{}", serde_json::to_string(line)?);
        file.unlock()?;
        result?;
        Ok(())
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}
