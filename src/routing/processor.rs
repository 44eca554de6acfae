//! Clock-driven delivery: batch digests and the weekly report
//!
//! An external scheduler calls `run_batch` / `run_weekly` at the
//! configured wall-clock times; nothing here owns a timer. Runs for the
//! same tier are mutually exclusive, and items are marked sent only
//! after the channel adapter acknowledged the send, so a crashed or
//! failed run just leaves everything eligible for the next one.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::RouterConfig;

use super::audit::AuditLog;
use super::digest::render_digest;
use super::dispatcher::ChannelDispatcher;
use super::priority::Priority;
use super::store::NotificationStore;

/// Drains due batched items into a digest and ships the weekly report
pub struct DeliveryProcessor {
    config: RouterConfig,
    store: NotificationStore,
    dispatcher: Arc<ChannelDispatcher>,
    audit: AuditLog,
    batch_lock: Mutex<()>,
    weekly_lock: Mutex<()>,
}

impl DeliveryProcessor {
    pub fn new(
        config: RouterConfig,
        store: NotificationStore,
        dispatcher: Arc<ChannelDispatcher>,
        audit: AuditLog,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
            audit,
            batch_lock: Mutex::new(()),
            weekly_lock: Mutex::new(()),
        }
    }

    /// Fold every due batched item into one digest and send it once.
    /// Returns the number of items sent; 0 when nothing was due (not an
    /// error) or when the channel refused the digest (items stay
    /// pending and the next run retries them).
    pub fn run_batch(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self
            .batch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let due = self.store.due(Priority::Batched, now);
        if due.is_empty() {
            info!("No batched notifications due");
            return Ok(0);
        }

        let digest = render_digest(&due);
        let channel = self.config.primary_channel(Priority::Batched);
        let result = self.dispatcher.send_to(channel, &digest);

        if !result.is_sent() {
            warn!(
                channel = %channel,
                result = ?result,
                count = due.len(),
                "Batch digest not delivered, items stay pending"
            );
            return Ok(0);
        }

        let ids: Vec<String> = due.iter().map(|r| r.id.clone()).collect();
        let marked = self.store.mark_sent(&ids, now)?;
        info!(count = marked, "Batch digest sent");
        self.audit.log(
            now,
            Priority::Batched,
            "batch_digest",
            "sent",
            &format!("{} items", marked),
        );

        Ok(marked)
    }

    /// Send the pending weekly report, newest wins. Marks every pending
    /// weekly item sent so a stale report is never replayed later.
    /// Returns false when nothing was pending or the send failed.
    pub fn run_weekly(&self, now: DateTime<Utc>) -> Result<bool> {
        let _guard = self
            .weekly_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pending = self.store.pending(Priority::Weekly);
        let report = match pending.iter().max_by_key(|r| r.created_at.timestamp_millis()) {
            Some(r) => r,
            None => {
                info!("No weekly report pending");
                return Ok(false);
            }
        };

        let channel = self.config.primary_channel(Priority::Weekly);
        let result = self.dispatcher.send_to(channel, &report.message);
        if !result.is_sent() {
            warn!(channel = %channel, result = ?result, "Weekly report not delivered");
            return Ok(false);
        }

        let ids: Vec<String> = pending.iter().map(|r| r.id.clone()).collect();
        let marked = self.store.mark_sent(&ids, now)?;
        info!(superseded = marked.saturating_sub(1), "Weekly report sent");
        self.audit.log(
            now,
            Priority::Weekly,
            "weekly_report",
            "sent",
            &report.message,
        );

        Ok(true)
    }
}
