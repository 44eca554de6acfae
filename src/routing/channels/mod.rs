//! Built-in channel adapters

pub mod chat;
pub mod command;
pub mod log;

pub use chat::{ChatGatewayChannel, ChatGatewayConfig};
pub use command::{CommandChannel, CommandChannelConfig};
pub use log::LogChannel;
