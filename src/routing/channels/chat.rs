//! Primary chat channel - HTTP webhook against a message gateway

use anyhow::Result;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::routing::channel::{ChannelAdapter, ChannelKind, SendResult};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatGatewayConfig {
    /// Gateway URL (e.g. http://localhost:9080)
    pub gateway_url: String,
    /// Bearer token
    pub hook_token: String,
    /// Recipient id (chat id)
    pub recipient: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ChatGatewayConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:9080".to_string(),
            hook_token: String::new(),
            recipient: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GatewayPayload<'a> {
    message: &'a str,
    to: &'a str,
    deliver: bool,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Primary chat adapter
#[derive(Debug)]
pub struct ChatGatewayChannel {
    client: Client,
    config: ChatGatewayConfig,
}

impl ChatGatewayChannel {
    pub fn new(config: ChatGatewayConfig) -> Result<Self> {
        if config.hook_token.is_empty() {
            anyhow::bail!("chat gateway hook_token is required");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }
}

impl ChannelAdapter for ChatGatewayChannel {
    fn name(&self) -> &str {
        "chat_gateway"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::PrimaryChat
    }

    fn send(&self, text: &str) -> Result<SendResult> {
        let url = format!("{}/hooks/message", self.config.gateway_url);
        let payload = GatewayPayload {
            message: text,
            to: &self.config.recipient,
            deliver: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.hook_token))
            .json(&payload)
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!(channel = "chat_gateway", error = %e, "Gateway request failed");
                return Ok(SendResult::Failed(e.to_string()));
            }
        };

        let parsed: GatewayResponse = match response.json() {
            Ok(p) => p,
            Err(e) => {
                error!(channel = "chat_gateway", error = %e, "Gateway response unparseable");
                return Ok(SendResult::Failed(e.to_string()));
            }
        };

        if parsed.ok {
            info!(channel = "chat_gateway", to = %self.config.recipient, "Message sent");
            Ok(SendResult::Sent)
        } else {
            let reason = parsed.error.unwrap_or_else(|| "unknown gateway error".to_string());
            error!(channel = "chat_gateway", error = %reason, "Gateway rejected message");
            Ok(SendResult::Failed(reason))
        }
    }
}
