//! tasknag - priority-routed notification engine
//!
//! Routes events from autonomous producers (task lifecycle, deadline
//! scans, inbound-message classifiers, workload checks) to a single
//! human without drowning them: immediate fan-out for the urgent,
//! digests for the rest, one weekly report, and an audit trail for
//! everything else.

pub mod config;
pub mod routing;
pub mod signals;

pub use config::RouterConfig;
pub use routing::{
    AuditLog, ChannelAdapter, ChannelDispatcher, ChannelKind, DedupLedger, DeliveryProcessor,
    EventContext, IntakeOutcome, IntakeRequest, NotificationRecord, NotificationStore, Priority,
    Router, RouterBuilder, SendResult,
};
pub use signals::{classify_reply, hours_until, matches_watch, ReplySignal};
