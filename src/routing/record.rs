//! Notification record and its structured context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::channel::ChannelKind;
use super::priority::Priority;

/// Opaque key/value payload attached to a notification.
///
/// `event_kind` is an open string space: detectors introduce new kinds
/// without any change here. The engine uses the context only for dedup
/// keying and digest grouping, never for business meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Event kind, e.g. "blocker_resolved", "wip_warning"
    pub event_kind: String,
    /// Related entity id (task, blocker, ...); None = type-wide event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<String>,
    /// Free-form detector metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl EventContext {
    pub fn new(event_kind: impl Into<String>) -> Self {
        Self {
            event_kind: event_kind.into(),
            source_entity_id: None,
            extra: None,
        }
    }

    pub fn with_source(mut self, source_entity_id: impl Into<String>) -> Self {
        self.source_entity_id = Some(source_entity_id.into());
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// One notification, as persisted (JSONL)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    /// Primary channel for this tier at creation time
    pub channel: ChannelKind,
    /// Rendered text, immutable once created
    pub message: String,
    pub context: EventContext,
    /// None for immediate-tier items; batch/weekly slot otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    /// None = pending. Once set, never cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationRecord {
    pub fn new(
        priority: Priority,
        channel: ChannelKind,
        message: impl Into<String>,
        context: EventContext,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_id(created_at),
            created_at,
            priority,
            channel,
            message: message.into(),
            context,
            scheduled_for: None,
            sent_at: None,
        }
    }

    pub fn with_schedule(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.sent_at.is_none()
    }

    /// Due for delivery at `now`. A missing schedule counts as due so a
    /// timing defect can only deliver early, never lose the item.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.scheduled_for.map_or(true, |at| at <= now)
    }
}

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Timestamp + process-local sequence. Unique enough for an append-mostly
/// single-owner store; collision would need two processes in the same
/// millisecond with the same counter value.
fn next_id(at: DateTime<Utc>) -> String {
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("ntf-{}-{}", at.timestamp_millis(), seq)
}
