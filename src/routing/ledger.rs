//! Dedup ledger - "has the user already been told about this situation?"
//!
//! Durable map from (event_kind, source_entity_id) to the last time a
//! non-suppressed intake ran for that key. Stored as append-only JSONL
//! where the latest entry for a key wins; the file is compacted once it
//! grows past a threshold. The check is evaluated against the calling
//! tier's cooldown window at intake time: dedup suppresses creation,
//! not delivery.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

const COMPACT_THRESHOLD: usize = 512;

/// One ledger line. A key's earlier lines are superseded, never consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    event_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_entity_id: Option<String>,
    last_sent_at: DateTime<Utc>,
}

/// Durable dedup ledger
#[derive(Debug, Clone)]
pub struct DedupLedger {
    path: PathBuf,
}

impl DedupLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// True iff the key was recorded strictly after `now - window`.
    /// A None source matches only entries recorded with a None source.
    /// Read-only: never writes.
    pub fn is_duplicate(
        &self,
        window: Duration,
        event_kind: &str,
        source_entity_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        let map = self.load();
        match map.get(&key_of(event_kind, source_entity_id)) {
            Some(last) => now.signed_duration_since(*last) < window,
            None => false,
        }
    }

    /// Upsert the key to `now`. Called on every non-suppressed intake.
    pub fn record(
        &self,
        event_kind: &str,
        source_entity_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entry = LedgerEntry {
            event_kind: event_kind.to_string(),
            source_entity_id: source_entity_id.map(|s| s.to_string()),
            last_sent_at: now,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open dedup ledger {}", self.path.display()))?;

        file.lock_exclusive()?;
        let mut file = file;
        let result = writeln!(file, "{}", serde_json::to_string(&entry)?);
        file.unlock()?;
        result?;

        self.maybe_compact();
        Ok(())
    }

    fn load(&self) -> HashMap<String, DateTime<Utc>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return HashMap::new(),
        };

        let mut map = HashMap::new();
        for line in BufReader::new(file).lines().filter_map(|l| l.ok()) {
            if let Ok(entry) = serde_json::from_str::<LedgerEntry>(&line) {
                // later lines overwrite earlier ones
                map.insert(
                    key_of(&entry.event_kind, entry.source_entity_id.as_deref()),
                    entry.last_sent_at,
                );
            }
        }
        map
    }

    fn maybe_compact(&self) {
        let line_count = match File::open(&self.path) {
            Ok(f) => BufReader::new(f).lines().count(),
            Err(_) => return,
        };
        if line_count <= COMPACT_THRESHOLD {
            return;
        }
        if let Err(e) = self.compact() {
            tracing::warn!(error = %e, "dedup ledger compaction failed");
        }
    }

    fn compact(&self) -> Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let mut latest: HashMap<String, LedgerEntry> = HashMap::new();
        for line in BufReader::new(&file).lines().filter_map(|l| l.ok()) {
            if let Ok(entry) = serde_json::from_str::<LedgerEntry>(&line) {
                latest.insert(
                    key_of(&entry.event_kind, entry.source_entity_id.as_deref()),
                    entry,
                );
            }
        }

        let mut entries: Vec<&LedgerEntry> = latest.values().collect();
        entries.sort_by_key(|e| e.last_sent_at);

        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for entry in entries {
                writeln!(temp_file, "{}", serde_json::to_string(entry)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}

/// Unit separator keeps "a|b" + None distinct from "a" + Some("b")
fn key_of(event_kind: &str, source_entity_id: Option<&str>) -> String {
    match source_entity_id {
        Some(source) => format!("{}\u{1f}{}", event_kind, source),
        None => format!("{}\u{1f}", event_kind),
    }
}
