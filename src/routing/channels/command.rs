//! Short-message channel - shells out to an external send tool
//!
//! The SMS provider is reached through whatever command the operator
//! configured (a vendor CLI, a script). The message is passed as the
//! final argument; exit status is the only acknowledgement.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{error, info};

use crate::routing::channel::{ChannelAdapter, ChannelKind, SendResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandChannelConfig {
    /// Program to run
    pub program: String,
    /// Fixed arguments, message appended last
    #[serde(default)]
    pub args: Vec<String>,
}

/// External-command adapter for the short-message channel
pub struct CommandChannel {
    config: CommandChannelConfig,
}

impl CommandChannel {
    pub fn new(config: CommandChannelConfig) -> Self {
        Self { config }
    }
}

impl ChannelAdapter for CommandChannel {
    fn name(&self) -> &str {
        "send_command"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::ShortMessage
    }

    fn send(&self, text: &str) -> Result<SendResult> {
        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(text)
            .output();

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                error!(channel = "send_command", program = %self.config.program, error = %e, "Send command failed to start");
                return Ok(SendResult::Failed(e.to_string()));
            }
        };

        if output.status.success() {
            info!(channel = "send_command", "Message sent");
            Ok(SendResult::Sent)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(channel = "send_command", error = %stderr, "Send command exited non-zero");
            Ok(SendResult::Failed(stderr.to_string()))
        }
    }
}
