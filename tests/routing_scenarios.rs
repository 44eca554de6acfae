//! End-to-end routing scenarios: intake through dedup, scheduling,
//! digest delivery and retry, driven with explicit clocks.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use tasknag::{
    AuditLog, ChannelAdapter, ChannelDispatcher, ChannelKind, DedupLedger, DeliveryProcessor,
    IntakeRequest, NotificationStore, Priority, Router, RouterConfig, SendResult,
};

/// Counting adapter with a failure switch
struct RecordingChannel {
    name: String,
    kind: ChannelKind,
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingChannel {
    fn new(name: &str, kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl ChannelAdapter for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn send(&self, text: &str) -> Result<SendResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Ok(SendResult::Failed("simulated outage".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(SendResult::Sent)
    }
}

struct Harness {
    _dir: TempDir,
    router: Router,
    processor: DeliveryProcessor,
    store: NotificationStore,
    chat: Arc<RecordingChannel>,
    audit_path: std::path::PathBuf,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = NotificationStore::new(dir.path().join("notifications.jsonl"));
    let ledger = DedupLedger::new(dir.path().join("dedup.jsonl"));
    let audit_path = dir.path().join("audit.log");
    let audit = AuditLog::new(&audit_path);

    let chat = RecordingChannel::new("chat", ChannelKind::PrimaryChat);
    let sms = RecordingChannel::new("sms", ChannelKind::ShortMessage);
    let mut dispatcher = ChannelDispatcher::new();
    dispatcher.register_channel(chat.clone());
    dispatcher.register_channel(sms);
    let dispatcher = Arc::new(dispatcher);

    let config = RouterConfig::default();
    let router = Router::new(
        config.clone(),
        store.clone(),
        ledger,
        dispatcher.clone(),
        audit.clone(),
    );
    let processor = DeliveryProcessor::new(config, store.clone(), dispatcher, audit);

    Harness {
        _dir: dir,
        router,
        processor,
        store,
        chat,
        audit_path,
    }
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

#[test]
fn immediate_cooldown_window_controls_repeats() {
    let h = harness();
    let t0 = at(2026, 3, 2, 8, 0);
    let req = || {
        IntakeRequest::new(Priority::Immediate, "X", "blocker_resolved").with_source("b1")
    };

    // T0: delivered
    assert!(h.router.intake_at(req(), t0).unwrap().record().is_some());
    // T0+2h: inside the 4h window, suppressed without a store write
    assert!(h
        .router
        .intake_at(req(), t0 + Duration::hours(2))
        .unwrap()
        .is_suppressed());
    assert_eq!(h.store.read_all().len(), 1);
    // T0+5h: window expired, delivered again as an independent record
    assert!(h
        .router
        .intake_at(req(), t0 + Duration::hours(5))
        .unwrap()
        .record()
        .is_some());
    assert_eq!(h.store.read_all().len(), 2);
}

#[test]
fn intakes_past_the_window_are_unrelated_records() {
    let h = harness();
    let t0 = at(2026, 3, 2, 8, 0);
    let req = || IntakeRequest::new(Priority::Batched, "moved", "task_status").with_source("t1");

    h.router.intake_at(req(), t0).unwrap();
    h.router.intake_at(req(), t0 + Duration::hours(9)).unwrap();

    let records = h.store.read_all();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].id, records[1].id);
}

#[test]
fn batched_item_rides_the_next_slot_and_drains_once() {
    let h = harness();
    // 10:03 with slots [09:00, 13:00, 17:00] -> scheduled for 13:00
    let intake_time = at(2026, 3, 2, 10, 3);
    let outcome = h
        .router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "WIP at 4/5", "wip_warning"),
            intake_time,
        )
        .unwrap();
    assert_eq!(
        outcome.record().unwrap().scheduled_for.unwrap(),
        at(2026, 3, 2, 13, 0)
    );

    // the 13:00 run sends it
    assert_eq!(h.processor.run_batch(at(2026, 3, 2, 13, 0)).unwrap(), 1);
    // a minute later, nothing new: idempotent drain
    assert_eq!(h.processor.run_batch(at(2026, 3, 2, 13, 1)).unwrap(), 0);
    assert_eq!(h.chat.sent_messages().len(), 1);
}

#[test]
fn five_items_two_kinds_one_grouped_digest() {
    let h = harness();
    let t = at(2026, 3, 2, 10, 0);

    for (i, task) in ["alpha", "beta", "gamma"].iter().enumerate() {
        h.router
            .intake_at(
                IntakeRequest::new(
                    Priority::Batched,
                    format!("Task '{}' moved", task),
                    "task_status",
                )
                .with_source(format!("t{}", i)),
                t + Duration::minutes(i as i64),
            )
            .unwrap();
    }
    h.router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "Deadline in 5 days", "deadline_week")
                .with_source("t9"),
            t + Duration::minutes(10),
        )
        .unwrap();
    h.router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "Deadline in 3 days", "deadline_week")
                .with_source("t10"),
            t + Duration::minutes(11),
        )
        .unwrap();

    let sent = h.processor.run_batch(at(2026, 3, 2, 13, 0)).unwrap();
    assert_eq!(sent, 5);

    let digests = h.chat.sent_messages();
    assert_eq!(digests.len(), 1, "one digest per invocation");
    let digest = &digests[0];
    assert!(digest.contains("=== Daily Update ==="));
    // first-seen group order, items in creation order within a group
    let task_heading = digest.find("[Task Status]").unwrap();
    let deadline_heading = digest.find("[Deadline Week]").unwrap();
    assert!(task_heading < deadline_heading);
    assert!(digest.find("alpha").unwrap() < digest.find("beta").unwrap());
    assert!(digest.find("beta").unwrap() < digest.find("gamma").unwrap());

    assert!(h.store.pending(Priority::Batched).is_empty(), "all five marked atomically");
}

#[test]
fn failed_digest_send_is_retried_next_run() {
    let h = harness();
    let t = at(2026, 3, 2, 10, 0);
    h.router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "moved", "task_status").with_source("t1"),
            t,
        )
        .unwrap();

    h.chat.set_failing(true);
    assert_eq!(h.processor.run_batch(at(2026, 3, 2, 13, 0)).unwrap(), 0);
    let still_pending = h.store.pending(Priority::Batched);
    assert_eq!(still_pending.len(), 1);
    assert!(still_pending[0].sent_at.is_none());

    h.chat.set_failing(false);
    assert_eq!(h.processor.run_batch(at(2026, 3, 2, 17, 0)).unwrap(), 1);
    assert!(h.store.pending(Priority::Batched).is_empty());
}

#[test]
fn weekly_sends_only_the_later_report_and_marks_both() {
    let h = harness();
    let monday = at(2026, 3, 2, 9, 0);

    h.router
        .intake_at(
            IntakeRequest::new(Priority::Weekly, "Week in review: draft", "weekly_report"),
            monday,
        )
        .unwrap();
    h.router
        .intake_at(
            IntakeRequest::new(Priority::Weekly, "Week in review: final", "weekly_report"),
            monday + Duration::days(3),
        )
        .unwrap();

    // Sunday 20:00 run
    assert!(h.processor.run_weekly(at(2026, 3, 8, 20, 0)).unwrap());
    let sent = h.chat.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], "Week in review: final");
    assert!(h.store.pending(Priority::Weekly).is_empty());
}

#[test]
fn weekly_scheduled_for_next_sunday_evening() {
    let h = harness();
    let outcome = h
        .router
        .intake_at(
            IntakeRequest::new(Priority::Weekly, "report", "weekly_report"),
            at(2026, 3, 2, 9, 0),
        )
        .unwrap();
    assert_eq!(
        outcome.record().unwrap().scheduled_for.unwrap(),
        at(2026, 3, 8, 20, 0)
    );
}

#[test]
fn silent_intake_leaves_only_an_audit_line() {
    let h = harness();
    h.router
        .intake_at(
            IntakeRequest::new(Priority::Silent, "scan completed", "scan_heartbeat"),
            at(2026, 3, 2, 9, 0),
        )
        .unwrap();

    assert!(h.store.read_all().is_empty(), "no pending or sent row");
    assert!(h.chat.sent_messages().is_empty());

    let audit = std::fs::read_to_string(&h.audit_path).unwrap();
    assert_eq!(audit.lines().count(), 1);
    assert!(audit.contains("scan_heartbeat"));
}

#[test]
fn audit_trail_sees_every_intake_including_suppressed() {
    let h = harness();
    let t0 = at(2026, 3, 2, 9, 0);
    let req = || IntakeRequest::new(Priority::Batched, "x", "task_status").with_source("t1");

    h.router.intake_at(req(), t0).unwrap();
    h.router.intake_at(req(), t0 + Duration::hours(1)).unwrap(); // suppressed

    let audit = std::fs::read_to_string(&h.audit_path).unwrap();
    assert_eq!(audit.lines().count(), 2);
    assert!(audit.contains(r#""outcome":"queued""#));
    assert!(audit.contains(r#""outcome":"suppressed""#));
}

#[test]
fn distinct_sources_do_not_suppress_each_other() {
    let h = harness();
    let t0 = at(2026, 3, 2, 9, 0);

    let first = h
        .router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "a moved", "task_status").with_source("t1"),
            t0,
        )
        .unwrap();
    let second = h
        .router
        .intake_at(
            IntakeRequest::new(Priority::Batched, "b moved", "task_status").with_source("t2"),
            t0,
        )
        .unwrap();

    assert!(first.record().is_some());
    assert!(second.record().is_some());
}
