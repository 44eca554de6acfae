//! Channel dispatcher - adapter registry and fan-out

use std::sync::Arc;
use tracing::{info, warn};

use super::channel::{ChannelAdapter, ChannelKind, SendResult};

/// Holds the registered adapters and routes rendered text to them.
/// One adapter per channel kind; registering a second replaces the first.
pub struct ChannelDispatcher {
    channels: Vec<Arc<dyn ChannelAdapter>>,
    dry_run: bool,
}

impl ChannelDispatcher {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn register_channel(&mut self, channel: Arc<dyn ChannelAdapter>) {
        info!(channel = channel.name(), kind = %channel.kind(), "Registering notification channel");
        self.channels.retain(|c| c.kind() != channel.kind());
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send rendered text through one channel, synchronously.
    /// An adapter error is folded into `SendResult::Failed`; the caller
    /// decides what a failure means for its tier.
    pub fn send_to(&self, kind: ChannelKind, text: &str) -> SendResult {
        let adapter = match self.channels.iter().find(|c| c.kind() == kind) {
            Some(a) => a,
            None => {
                warn!(kind = %kind, "No adapter registered for channel");
                return SendResult::Skipped(format!("no adapter for {}", kind));
            }
        };

        if self.dry_run {
            info!(channel = adapter.name(), "[dry-run] would send");
            return SendResult::Skipped("dry-run".to_string());
        }

        match adapter.send(text) {
            Ok(result) => result,
            Err(e) => {
                warn!(channel = adapter.name(), error = %e, "Channel send failed");
                SendResult::Failed(e.to_string())
            }
        }
    }

    /// Fan out to several channels, collecting per-channel outcomes
    pub fn send_all(&self, kinds: &[ChannelKind], text: &str) -> Vec<(ChannelKind, SendResult)> {
        kinds
            .iter()
            .map(|&kind| (kind, self.send_to(kind, text)))
            .collect()
    }
}

impl Default for ChannelDispatcher {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockChannel;
    use super::*;

    #[test]
    fn test_register_and_send() {
        let mut dispatcher = ChannelDispatcher::new();
        let channel = Arc::new(MockChannel::new("chat", ChannelKind::PrimaryChat));
        dispatcher.register_channel(channel.clone());

        assert_eq!(dispatcher.channel_count(), 1);
        assert_eq!(dispatcher.send_to(ChannelKind::PrimaryChat, "hello"), SendResult::Sent);
        assert_eq!(channel.send_count(), 1);
        assert_eq!(channel.last_message().unwrap(), "hello");
    }

    #[test]
    fn test_missing_adapter_is_skipped() {
        let dispatcher = ChannelDispatcher::new();
        match dispatcher.send_to(ChannelKind::ShortMessage, "hello") {
            SendResult::Skipped(reason) => assert!(reason.contains("short_message")),
            other => panic!("expected Skipped, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_skips_sends() {
        let mut dispatcher = ChannelDispatcher::new().with_dry_run(true);
        let channel = Arc::new(MockChannel::new("chat", ChannelKind::PrimaryChat));
        dispatcher.register_channel(channel.clone());

        assert_eq!(
            dispatcher.send_to(ChannelKind::PrimaryChat, "hello"),
            SendResult::Skipped("dry-run".to_string())
        );
        assert_eq!(channel.send_count(), 0);
    }

    #[test]
    fn test_re_registering_replaces_adapter() {
        let mut dispatcher = ChannelDispatcher::new();
        let first = Arc::new(MockChannel::new("chat-a", ChannelKind::PrimaryChat));
        let second = Arc::new(MockChannel::new("chat-b", ChannelKind::PrimaryChat));
        dispatcher.register_channel(first.clone());
        dispatcher.register_channel(second.clone());

        assert_eq!(dispatcher.channel_count(), 1);
        dispatcher.send_to(ChannelKind::PrimaryChat, "x");
        assert_eq!(first.send_count(), 0);
        assert_eq!(second.send_count(), 1);
    }

    #[test]
    fn test_send_all_collects_results() {
        let mut dispatcher = ChannelDispatcher::new();
        let chat = Arc::new(MockChannel::new("chat", ChannelKind::PrimaryChat));
        let sms = Arc::new(MockChannel::new("sms", ChannelKind::ShortMessage));
        sms.set_failing(true);
        dispatcher.register_channel(chat.clone());
        dispatcher.register_channel(sms.clone());

        let results = dispatcher.send_all(
            &[ChannelKind::PrimaryChat, ChannelKind::ShortMessage],
            "hello",
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, SendResult::Sent);
        assert!(matches!(results[1].1, SendResult::Failed(_)));
    }
}
