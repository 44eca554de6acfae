//! Notification routing engine
//!
//! Decides whether, when, and how to tell the human about an event a
//! detector handed in:
//! - `Router` takes intakes, one entry point per priority tier
//! - `DedupLedger` suppresses repeats inside per-tier cooldown windows
//! - `NotificationStore` is the durable queue and delivery history
//! - `DeliveryProcessor` drains the batched digest and weekly report
//!   when the external clock says so
//!
//! ```ignore
//! use tasknag::routing::RouterBuilder;
//!
//! let (router, processor) = RouterBuilder::from_default_config()?.build()?;
//! router.immediate("Blocker resolved", "blocker_resolved", Some("b1".into()))?;
//! processor.run_batch(chrono::Utc::now())?;
//! ```

pub mod audit;
pub mod builder;
pub mod channel;
pub mod channels;
pub mod digest;
pub mod dispatcher;
pub mod ledger;
pub mod priority;
pub mod processor;
pub mod record;
pub mod router;
pub mod schedule;
pub mod store;

pub use audit::AuditLog;
pub use builder::RouterBuilder;
pub use channel::{ChannelAdapter, ChannelKind, SendResult};
pub use digest::render_digest;
pub use dispatcher::ChannelDispatcher;
pub use ledger::DedupLedger;
pub use priority::Priority;
pub use processor::DeliveryProcessor;
pub use record::{EventContext, NotificationRecord};
pub use router::{IntakeOutcome, IntakeRequest, Router};
pub use store::NotificationStore;
