//! Notification store - durable JSONL file, append-mostly
//!
//! One line per notification. Appends take an exclusive file lock; the
//! only in-place mutation is `mark_sent`, implemented as a locked
//! temp-file rewrite with an atomic rename, so overlapping readers never
//! observe a half-written file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::priority::Priority;
use super::record::NotificationRecord;

const MAX_RECORDS: usize = 2000;
const KEEP_AFTER_COMPACT: usize = 1000;
const COMPACT_CHECK_INTERVAL: usize = 32;
static WRITE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Durable notification store
#[derive(Debug, Clone)]
pub struct NotificationStore {
    path: PathBuf,
}

impl NotificationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one record. Fatal on I/O failure: the caller must know the
    /// notification was not committed.
    pub fn append(&self, record: &NotificationRecord) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open notification store {}", self.path.display()))?;

        file.lock_exclusive()?;
        let mut file = file;
        let result = writeln!(file, "{}", serde_json::to_string(record)?);
        file.unlock()?;
        result?;

        self.maybe_compact();
        Ok(())
    }

    /// All records, creation order. Unparseable lines are skipped.
    pub fn read_all(&self) -> Vec<NotificationRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        BufReader::new(file)
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// Pending (never sent) records of one tier, ascending creation order
    pub fn pending(&self, priority: Priority) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> = self
            .read_all()
            .into_iter()
            .filter(|r| r.priority == priority && r.is_pending())
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Pending records of one tier whose schedule has arrived
    pub fn due(&self, priority: Priority, now: DateTime<Utc>) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> = self
            .read_all()
            .into_iter()
            .filter(|r| r.priority == priority && r.is_due(now))
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Last N records by creation time, for operator inspection
    pub fn read_recent(&self, n: usize) -> Vec<NotificationRecord> {
        let mut records = self.read_all();
        records.sort_by_key(|r| r.created_at);
        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }

    /// Mark every listed id sent at `sent_at`, in one locked rewrite.
    /// Already-sent rows are left untouched (sent_at is write-once).
    /// Returns the number of rows actually transitioned.
    pub fn mark_sent(&self, ids: &[String], sent_at: DateTime<Utc>) -> Result<usize> {
        use fs2::FileExt;

        let file = File::open(&self.path)
            .with_context(|| format!("open notification store {}", self.path.display()))?;
        file.lock_exclusive()?;

        let reader = BufReader::new(&file);
        let mut records: Vec<NotificationRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let mut updated = 0;
        for record in records.iter_mut() {
            if record.sent_at.is_none() && ids.iter().any(|id| *id == record.id) {
                record.sent_at = Some(sent_at);
                updated += 1;
            }
        }

        let result = self.rewrite(&records);
        file.unlock()?;
        result?;

        Ok(updated)
    }

    fn rewrite(&self, records: &[NotificationRecord]) -> Result<()> {
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in records {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Periodic size check. Compaction keeps every pending row (a
    /// long-delayed batch must still be able to drain them) plus the most
    /// recent sent rows.
    fn maybe_compact(&self) {
        let count = WRITE_COUNT.fetch_add(1, Ordering::Relaxed);
        if count % COMPACT_CHECK_INTERVAL != 0 {
            return;
        }

        let records = self.read_all();
        if records.len() <= MAX_RECORDS {
            return;
        }
        if let Err(e) = self.compact(records) {
            tracing::warn!(error = %e, "notification store compaction failed");
        }
    }

    fn compact(&self, mut records: Vec<NotificationRecord>) -> Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        records.sort_by_key(|r| r.created_at);
        let sent_count = records.iter().filter(|r| !r.is_pending()).count();
        let drop_sent = sent_count.saturating_sub(KEEP_AFTER_COMPACT);

        let mut dropped = 0;
        let kept: Vec<NotificationRecord> = records
            .into_iter()
            .filter(|r| {
                if r.is_pending() || dropped >= drop_sent {
                    true
                } else {
                    dropped += 1;
                    false
                }
            })
            .collect();

        let result = self.rewrite(&kept);
        file.unlock()?;
        result
    }
}
