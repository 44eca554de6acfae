//! Priority tiers for outbound notifications
//!
//! The tier decides timing and channel set:
//! - Immediate: sent synchronously on intake (blocker resolved, urgent deadline)
//! - Batched: folded into the next scheduled digest (task updates, WIP warnings)
//! - Weekly: one report, sent at the weekly slot
//! - Silent: audit log only, never reaches the user

use std::str::FromStr;

/// Priority tier for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Immediate,
    Batched,
    Weekly,
    Silent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::Batched => "batched",
            Priority::Weekly => "weekly",
            Priority::Silent => "silent",
        }
    }

    /// All tiers, highest first
    pub fn all() -> [Priority; 4] {
        [
            Priority::Immediate,
            Priority::Batched,
            Priority::Weekly,
            Priority::Silent,
        ]
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" | "p0" => Ok(Priority::Immediate),
            "batched" | "p1" => Ok(Priority::Batched),
            "weekly" | "p2" => Ok(Priority::Weekly),
            "silent" | "p3" => Ok(Priority::Silent),
            other => Err(anyhow::anyhow!("unknown priority: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::Immediate), "immediate");
        assert_eq!(format!("{}", Priority::Silent), "silent");
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("immediate".parse::<Priority>().unwrap(), Priority::Immediate);
        assert_eq!("Batched".parse::<Priority>().unwrap(), Priority::Batched);
        assert_eq!("p2".parse::<Priority>().unwrap(), Priority::Weekly);
        assert_eq!("P3".parse::<Priority>().unwrap(), Priority::Silent);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_serde_round_trip() {
        let json = serde_json::to_string(&Priority::Batched).unwrap();
        assert_eq!(json, r#""batched""#);
        let parsed: Priority = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Priority::Batched);
    }
}
