//! Routing configuration
//!
//! Loaded from `$XDG_CONFIG_HOME/tasknag/config.json` (or equivalent);
//! every field has a design default so a missing file just means
//! defaults. Malformed timing values degrade at the point of use, they
//! never fail an intake.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::routing::channel::ChannelKind;
use crate::routing::channels::{ChatGatewayConfig, CommandChannelConfig};
use crate::routing::priority::Priority;
use crate::routing::schedule;

pub const APP_DIR: &str = "tasknag";

/// Hours of dedup cooldown per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownHours {
    pub immediate: i64,
    pub batched: i64,
    pub weekly: i64,
    pub silent: i64,
}

impl Default for CooldownHours {
    fn default() -> Self {
        Self {
            immediate: 4,
            batched: 8,
            weekly: 168,
            silent: 1,
        }
    }
}

/// Channel list per tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRouting {
    pub immediate: Vec<ChannelKind>,
    pub batched: Vec<ChannelKind>,
    pub weekly: Vec<ChannelKind>,
    pub silent: Vec<ChannelKind>,
}

impl Default for ChannelRouting {
    fn default() -> Self {
        Self {
            immediate: vec![ChannelKind::PrimaryChat, ChannelKind::ShortMessage],
            batched: vec![ChannelKind::PrimaryChat],
            weekly: vec![ChannelKind::PrimaryChat],
            silent: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub cooldown_hours: CooldownHours,
    /// Daily batch delivery slots, "HH:MM"
    pub batch_times: Vec<String>,
    /// Weekly slot: day name + "HH:MM"
    pub weekly_day: String,
    pub weekly_time: String,
    pub channels: ChannelRouting,
    /// Hard cap for the short-message channel
    pub sms_char_limit: usize,
    /// Data directory override (store, ledger, audit log)
    pub data_dir: Option<PathBuf>,
    /// Chat gateway credentials; None = channel unavailable
    pub chat_gateway: Option<ChatGatewayConfig>,
    /// External send command for the short-message channel
    pub sms_command: Option<CommandChannelConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: CooldownHours::default(),
            batch_times: vec![
                "09:00".to_string(),
                "13:00".to_string(),
                "17:00".to_string(),
            ],
            weekly_day: "sun".to_string(),
            weekly_time: "20:00".to_string(),
            channels: ChannelRouting::default(),
            sms_char_limit: 160,
            data_dir: None,
            chat_gateway: None,
            sms_command: None,
        }
    }
}

impl RouterConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Load from the config file; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Cooldown window for a tier
    pub fn cooldown(&self, priority: Priority) -> Duration {
        let hours = match priority {
            Priority::Immediate => self.cooldown_hours.immediate,
            Priority::Batched => self.cooldown_hours.batched,
            Priority::Weekly => self.cooldown_hours.weekly,
            Priority::Silent => self.cooldown_hours.silent,
        };
        Duration::hours(hours.max(0))
    }

    /// Channels configured for a tier
    pub fn channels_for(&self, priority: Priority) -> &[ChannelKind] {
        match priority {
            Priority::Immediate => &self.channels.immediate,
            Priority::Batched => &self.channels.batched,
            Priority::Weekly => &self.channels.weekly,
            Priority::Silent => &self.channels.silent,
        }
    }

    /// Primary channel recorded on notifications of a tier
    pub fn primary_channel(&self, priority: Priority) -> ChannelKind {
        self.channels_for(priority)
            .first()
            .copied()
            .unwrap_or(ChannelKind::LogOnly)
    }

    /// Parsed batch slots; malformed entries dropped with a warning
    pub fn batch_slots(&self) -> Vec<NaiveTime> {
        schedule::parse_slots(&self.batch_times)
    }

    /// Weekly slot. Invalid config degrades to Sunday 20:00.
    pub fn weekly_slot(&self) -> (Weekday, NaiveTime) {
        let day = self.weekly_day.parse::<Weekday>().unwrap_or_else(|_| {
            warn!(day = %self.weekly_day, "Invalid weekly day, using Sunday");
            Weekday::Sun
        });
        let time = NaiveTime::parse_from_str(&self.weekly_time, "%H:%M").unwrap_or_else(|_| {
            warn!(time = %self.weekly_time, "Invalid weekly time, using 20:00");
            NaiveTime::from_hms_opt(20, 0, 0).expect("valid fallback time")
        });
        (day, time)
    }

    /// Where the store, ledger and audit log live
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }
}
