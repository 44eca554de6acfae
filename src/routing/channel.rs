//! Channel adapter trait and the fixed channel set

use anyhow::Result;
use std::str::FromStr;

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Primary chat bot (Telegram-style gateway)
    PrimaryChat,
    /// Short-message service, length-capped
    ShortMessage,
    /// Log sink, nothing leaves the machine
    LogOnly,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::PrimaryChat => "primary_chat",
            ChannelKind::ShortMessage => "short_message",
            ChannelKind::LogOnly => "log_only",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary_chat" | "chat" => Ok(ChannelKind::PrimaryChat),
            "short_message" | "sms" => Ok(ChannelKind::ShortMessage),
            "log_only" | "log" => Ok(ChannelKind::LogOnly),
            other => Err(anyhow::anyhow!("unknown channel: {}", other)),
        }
    }
}

/// Outcome of a single adapter send
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Sent,
    /// Not attempted (no adapter registered, dry-run, ...)
    Skipped(String),
    Failed(String),
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// A delivery channel adapter
///
/// The engine treats adapters as black boxes: a send either succeeds or it
/// doesn't. Adapter-internal errors are surfaced only as `SendResult::Failed`
/// text for logging. Retry policy is the adapter's own concern.
pub trait ChannelAdapter: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    /// Which channel this adapter serves
    fn kind(&self) -> ChannelKind;

    /// Transmit rendered text. Blocks until the adapter has an answer.
    fn send(&self, text: &str) -> Result<SendResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_from_str() {
        assert_eq!("chat".parse::<ChannelKind>().unwrap(), ChannelKind::PrimaryChat);
        assert_eq!("sms".parse::<ChannelKind>().unwrap(), ChannelKind::ShortMessage);
        assert_eq!("log_only".parse::<ChannelKind>().unwrap(), ChannelKind::LogOnly);
        assert!("pigeon".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn test_channel_kind_serde() {
        let json = serde_json::to_string(&ChannelKind::PrimaryChat).unwrap();
        assert_eq!(json, r#""primary_chat""#);
        let parsed: ChannelKind = serde_json::from_str(r#""short_message""#).unwrap();
        assert_eq!(parsed, ChannelKind::ShortMessage);
    }

    #[test]
    fn test_send_result_is_sent() {
        assert!(SendResult::Sent.is_sent());
        assert!(!SendResult::Skipped("dry-run".to_string()).is_sent());
        assert!(!SendResult::Failed("timeout".to_string()).is_sent());
    }
}
