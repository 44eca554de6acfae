//! Router - the four intake entry points
//!
//! One algorithm, priority-specific timing:
//! 1. dedup check against the tier's cooldown window
//! 2. persist a notification (immediate: deliver synchronously too;
//!    batched/weekly: stamp the next delivery slot; silent: audit only)
//! 3. record the dedup entry
//!
//! The whole sequence runs under one process-wide lock so two detectors
//! firing in the same instant for the same (event_kind, source) cannot
//! both pass the duplicate check.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;

use super::audit::AuditLog;
use super::channel::ChannelKind;
use super::dispatcher::ChannelDispatcher;
use super::ledger::DedupLedger;
use super::priority::Priority;
use super::record::{EventContext, NotificationRecord};
use super::schedule;
use super::store::NotificationStore;

/// What happened to an intake call
#[derive(Debug)]
pub enum IntakeOutcome {
    /// Notification persisted (and, for the immediate tier, delivered)
    Created(NotificationRecord),
    /// Dedup window still open; nothing written to the store
    Suppressed,
    /// Silent tier: audit line only, no store row
    Logged,
}

impl IntakeOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, IntakeOutcome::Suppressed)
    }

    pub fn record(&self) -> Option<&NotificationRecord> {
        match self {
            IntakeOutcome::Created(r) => Some(r),
            _ => None,
        }
    }
}

/// One event handed to the router by a detector
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub priority: Priority,
    pub message: String,
    pub event_kind: String,
    pub source_entity_id: Option<String>,
    pub extra: Option<serde_json::Value>,
}

impl IntakeRequest {
    pub fn new(
        priority: Priority,
        message: impl Into<String>,
        event_kind: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            message: message.into(),
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

/// Routes detector events to the store, the dedup ledger, the audit log
/// and (for the immediate tier) straight out through the channels.
pub struct Router {
    config: RouterConfig,
    store: NotificationStore,
    ledger: DedupLedger,
    dispatcher: Arc<ChannelDispatcher>,
    audit: AuditLog,
    // serializes check-then-record across concurrent detectors
    intake_lock: Mutex<()>,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        store: NotificationStore,
        ledger: DedupLedger,
        dispatcher: Arc<ChannelDispatcher>,
        audit: AuditLog,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            dispatcher,
            audit,
            intake_lock: Mutex::new(()),
        }
    }

    /// Immediate tier: deliver now, through every configured channel
    pub fn immediate(
        &self,
        message: impl Into<String>,
        event_kind: impl Into<String>,
        source_entity_id: Option<String>,
    ) -> Result<IntakeOutcome> {
        let mut req = IntakeRequest::new(Priority::Immediate, message, event_kind);
        req.source_entity_id = source_entity_id;
        self.intake(req)
    }

    /// Batched tier: queued for the next daily digest slot
    pub fn batched(
        &self,
        message: impl Into<String>,
        event_kind: impl Into<String>,
        source_entity_id: Option<String>,
    ) -> Result<IntakeOutcome> {
        let mut req = IntakeRequest::new(Priority::Batched, message, event_kind);
        req.source_entity_id = source_entity_id;
        self.intake(req)
    }

    /// Weekly tier: queued for the weekly slot. The report text is sent
    /// verbatim, so the kind is fixed.
    pub fn weekly(&self, report: impl Into<String>) -> Result<IntakeOutcome> {
        self.intake(IntakeRequest::new(Priority::Weekly, report, "weekly_report"))
    }

    /// Silent tier: audit trail only
    pub fn silent(
        &self,
        message: impl Into<String>,
        event_kind: impl Into<String>,
    ) -> Result<IntakeOutcome> {
        self.intake(IntakeRequest::new(Priority::Silent, message, event_kind))
    }

    pub fn intake(&self, req: IntakeRequest) -> Result<IntakeOutcome> {
        self.intake_at(req, Utc::now())
    }

    /// Intake with an explicit clock, the actual implementation
    pub fn intake_at(&self, req: IntakeRequest, now: DateTime<Utc>) -> Result<IntakeOutcome> {
        let _guard = self
            .intake_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let source = req.source_entity_id.as_deref();

        // A fresher weekly report must always supersede the pending one,
        // so the weekly tier is exempt from suppression.
        if req.priority != Priority::Weekly {
            let window = self.config.cooldown(req.priority);
            if self.ledger.is_duplicate(window, &req.event_kind, source, now) {
                debug!(
                    priority = %req.priority,
                    event_kind = %req.event_kind,
                    source = ?source,
                    "Intake suppressed by dedup window"
                );
                self.audit
                    .log(now, req.priority, &req.event_kind, "suppressed", &req.message);
                return Ok(IntakeOutcome::Suppressed);
            }
        }

        let outcome = match req.priority {
            Priority::Silent => {
                self.audit
                    .log(now, Priority::Silent, &req.event_kind, "logged", &req.message);
                IntakeOutcome::Logged
            }
            Priority::Immediate => {
                let record = self.deliver_immediate(&req, now)?;
                IntakeOutcome::Created(record)
            }
            Priority::Batched => {
                let slot = schedule::next_batch_slot(now, &self.config.batch_slots());
                let record = self.persist_scheduled(&req, now, slot)?;
                self.audit
                    .log(now, req.priority, &req.event_kind, "queued", &req.message);
                IntakeOutcome::Created(record)
            }
            Priority::Weekly => {
                let (day, time) = self.config.weekly_slot();
                let slot = schedule::next_weekly_slot(now, day, time);
                let record = self.persist_scheduled(&req, now, slot)?;
                self.audit
                    .log(now, req.priority, &req.event_kind, "queued", &req.message);
                IntakeOutcome::Created(record)
            }
        };

        // Unconditional on a non-suppressed call, silent included: a
        // suppressed repeat should not even spam the audit trail.
        self.ledger.record(&req.event_kind, source, now)?;

        Ok(outcome)
    }

    /// Persist and fan out synchronously. The record is marked sent
    /// whatever the individual channels report: delivery is best-effort
    /// across redundant channels, and a retry storm on a flaky channel
    /// would hurt more than a dropped copy.
    fn deliver_immediate(&self, req: &IntakeRequest, now: DateTime<Utc>) -> Result<NotificationRecord> {
        let record = self.build_record(req, now);
        self.store.append(&record)?;

        let mut failed: Vec<String> = Vec::new();
        for &kind in self.config.channels_for(Priority::Immediate) {
            let text = self.render_for(kind, Priority::Immediate, &req.message);
            let result = self.dispatcher.send_to(kind, &text);
            if let super::channel::SendResult::Failed(reason) = result {
                warn!(channel = %kind, error = %reason, "Immediate channel delivery failed");
                failed.push(kind.to_string());
            }
        }

        self.store.mark_sent(std::slice::from_ref(&record.id), now)?;

        let outcome = if failed.is_empty() {
            "sent".to_string()
        } else {
            format!("sent ({} failed)", failed.join(","))
        };
        self.audit
            .log(now, Priority::Immediate, &req.event_kind, &outcome, &req.message);
        info!(
            event_kind = %req.event_kind,
            id = %record.id,
            "Immediate notification delivered"
        );

        let mut record = record;
        record.sent_at = Some(now);
        Ok(record)
    }

    fn persist_scheduled(
        &self,
        req: &IntakeRequest,
        now: DateTime<Utc>,
        slot: DateTime<Utc>,
    ) -> Result<NotificationRecord> {
        let record = self.build_record(req, now).with_schedule(slot);
        self.store.append(&record)?;
        info!(
            priority = %req.priority,
            event_kind = %req.event_kind,
            scheduled_for = %slot,
            id = %record.id,
            "Notification queued"
        );
        Ok(record)
    }

    fn build_record(&self, req: &IntakeRequest, now: DateTime<Utc>) -> NotificationRecord {
        let mut context = EventContext::new(&req.event_kind);
        context.source_entity_id = req.source_entity_id.clone();
        context.extra = req.extra.clone();

        NotificationRecord::new(
            req.priority,
            self.config.primary_channel(req.priority),
            &req.message,
            context,
            now,
        )
    }

    /// Channel-specific rendering: urgency marker for chat, length cap
    /// for the short-message service
    fn render_for(&self, kind: ChannelKind, priority: Priority, message: &str) -> String {
        match kind {
            ChannelKind::PrimaryChat if priority == Priority::Immediate => {
                format!("[URGENT] {}", message)
            }
            ChannelKind::ShortMessage => message
                .chars()
                .take(self.config.sms_char_limit)
                .collect(),
            _ => message.to_string(),
        }
    }
}
