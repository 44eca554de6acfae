//! Wires the engine together from configuration

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RouterConfig;

use super::audit::AuditLog;
use super::channels::{ChatGatewayChannel, CommandChannel, LogChannel};
use super::dispatcher::ChannelDispatcher;
use super::ledger::DedupLedger;
use super::processor::DeliveryProcessor;
use super::router::Router;
use super::store::NotificationStore;

/// Builds a Router plus its clock-driven processor from one config.
/// Channels with missing credentials are simply not registered; the
/// dispatcher skips them and the rest keeps working.
pub struct RouterBuilder {
    config: RouterConfig,
    dry_run: bool,
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    pub fn from_default_config() -> Result<Self> {
        Ok(Self::new(RouterConfig::load()?))
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<(Router, DeliveryProcessor)> {
        let data_dir = self.config.data_dir();
        let store = NotificationStore::new(data_dir.join("notifications.jsonl"));
        let ledger = DedupLedger::new(data_dir.join("dedup.jsonl"));
        let audit = AuditLog::new(data_dir.join("audit.log"));

        let mut dispatcher = ChannelDispatcher::new().with_dry_run(self.dry_run);

        match &self.config.chat_gateway {
            Some(gateway) => match ChatGatewayChannel::new(gateway.clone()) {
                Ok(channel) => {
                    info!(gateway = %gateway.gateway_url, "Chat gateway channel enabled");
                    dispatcher.register_channel(Arc::new(channel));
                }
                Err(e) => warn!(error = %e, "Chat gateway misconfigured, channel disabled"),
            },
            None => info!("No chat gateway configured"),
        }

        if let Some(sms) = &self.config.sms_command {
            info!(program = %sms.program, "Short-message command channel enabled");
            dispatcher.register_channel(Arc::new(CommandChannel::new(sms.clone())));
        }

        // the log sink is always there
        dispatcher.register_channel(Arc::new(LogChannel::new()));

        let dispatcher = Arc::new(dispatcher);
        let router = Router::new(
            self.config.clone(),
            store.clone(),
            ledger,
            dispatcher.clone(),
            audit.clone(),
        );
        let processor = DeliveryProcessor::new(self.config, store, dispatcher, audit);

        Ok((router, processor))
    }
}
