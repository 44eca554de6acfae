//! Log-only channel - nothing leaves the machine

use anyhow::Result;
use tracing::info;

use crate::routing::channel::{ChannelAdapter, ChannelKind, SendResult};

/// Sink channel that emits the message as a structured log line
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelAdapter for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::LogOnly
    }

    fn send(&self, text: &str) -> Result<SendResult> {
        info!(channel = "log", message = %text, "Notification");
        Ok(SendResult::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_channel_always_sends() {
        let channel = LogChannel::new();
        assert_eq!(channel.kind(), ChannelKind::LogOnly);
        assert_eq!(channel.send("hello").unwrap(), SendResult::Sent);
    }
}
