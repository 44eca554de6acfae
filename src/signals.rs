//! Helpers for the detectors that feed the router
//!
//! Detectors own their business logic; these are the shared bits of
//! clock math and text matching they all end up needing. Pure
//! functions, no store access.

use chrono::{DateTime, Utc};
use regex::RegexBuilder;

/// Whole hours until `due`, floored at zero
pub fn hours_until(now: DateTime<Utc>, due: DateTime<Utc>) -> i64 {
    due.signed_duration_since(now).num_hours().max(0)
}

/// Does an inbound message concern a watched item?
///
/// True when the sender matches `waiting_on` (case-insensitive
/// substring) or `watch_pattern` matches subject or body. The pattern is
/// tried as a case-insensitive regex; an invalid pattern degrades to a
/// plain substring check rather than erroring out of a detector.
pub fn matches_watch(
    watch_pattern: Option<&str>,
    waiting_on: Option<&str>,
    sender: &str,
    subject: &str,
    body: &str,
) -> bool {
    if let Some(who) = waiting_on {
        if !who.is_empty() && sender.to_lowercase().contains(&who.to_lowercase()) {
            return true;
        }
    }

    let pattern = match watch_pattern {
        Some(p) if !p.is_empty() => p,
        _ => return false,
    };

    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(subject) || re.is_match(body),
        Err(_) => {
            let needle = pattern.to_lowercase();
            subject.to_lowercase().contains(&needle) || body.to_lowercase().contains(&needle)
        }
    }
}

/// Does an inbound reply resolve the thing we were waiting on, or ask
/// for more?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySignal {
    Resolution,
    Escalation,
}

const RESOLUTION_KEYWORDS: [&str; 8] = [
    "attached", "here is", "completed", "finished", "done", "ready", "sent", "enclosed",
];
const ESCALATION_KEYWORDS: [&str; 6] = [
    "need more", "additional", "question", "clarify", "missing", "waiting",
];

/// Keyword-vote heuristic; ties count as escalation (the safe reading:
/// assume we are still blocked)
pub fn classify_reply(subject: &str, body: &str) -> ReplySignal {
    let text = format!("{} {}", subject, body).to_lowercase();

    let resolution = RESOLUTION_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count();
    let escalation = ESCALATION_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count();

    if resolution > escalation {
        ReplySignal::Resolution
    } else {
        ReplySignal::Escalation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_hours_until() {
        let now = Utc::now();
        assert_eq!(hours_until(now, now + Duration::hours(23) + Duration::minutes(30)), 23);
        assert_eq!(hours_until(now, now + Duration::minutes(30)), 0);
        // overdue is clamped, not negative
        assert_eq!(hours_until(now, now - Duration::hours(2)), 0);
    }

    #[test]
    fn test_matches_watch_by_sender() {
        assert!(matches_watch(
            None,
            Some("Acme Legal"),
            "jane@acme-legal.example (ACME LEGAL)",
            "irrelevant",
            "irrelevant",
        ));
        assert!(!matches_watch(None, Some("Acme Legal"), "bob@other.example", "x", "y"));
    }

    #[test]
    fn test_matches_watch_by_pattern() {
        assert!(matches_watch(
            Some("contract.*signed"),
            None,
            "anyone",
            "Re: Contract finally SIGNED",
            "",
        ));
        assert!(matches_watch(Some("invoice"), None, "anyone", "", "the INVOICE is attached"));
        assert!(!matches_watch(Some("invoice"), None, "anyone", "hello", "world"));
    }

    #[test]
    fn test_matches_watch_invalid_regex_falls_back_to_substring() {
        assert!(matches_watch(
            Some("order #12 (urgent"),
            None,
            "anyone",
            "about order #12 (urgent!!)",
            "",
        ));
    }

    #[test]
    fn test_matches_watch_nothing_configured() {
        assert!(!matches_watch(None, None, "a", "b", "c"));
        assert!(!matches_watch(Some(""), Some(""), "a", "b", "c"));
    }

    #[test]
    fn test_classify_reply_resolution() {
        assert_eq!(
            classify_reply("Re: documents", "All done, files attached and ready."),
            ReplySignal::Resolution
        );
    }

    #[test]
    fn test_classify_reply_escalation() {
        assert_eq!(
            classify_reply("Re: documents", "I have a question, need more detail before I can proceed."),
            ReplySignal::Escalation
        );
    }

    #[test]
    fn test_classify_reply_tie_stays_blocked() {
        assert_eq!(classify_reply("hello", "nothing decisive here"), ReplySignal::Escalation);
    }
}
