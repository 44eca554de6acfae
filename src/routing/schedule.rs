//! Delivery slot math for batched and weekly tiers
//!
//! All computations are pure functions of an explicit `now`; the engine
//! owns no timer. Malformed schedule configuration degrades to a safe
//! default slot instead of failing the intake that needed it.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use tracing::warn;

/// Fallback when the batch-time list is empty or entirely malformed
const FALLBACK_HOUR: u32 = 9;

/// Parse "HH:MM" slot specs, dropping malformed entries with a warning
pub fn parse_slots(specs: &[String]) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = specs
        .iter()
        .filter_map(|spec| match NaiveTime::parse_from_str(spec, "%H:%M") {
            Ok(t) => Some(t),
            Err(_) => {
                warn!(slot = %spec, "Ignoring malformed batch time");
                None
            }
        })
        .collect();
    slots.sort();
    slots.dedup();
    slots
}

/// Smallest configured slot strictly after `now`, wrapping to the first
/// slot of the next day. An empty slot list falls back to tomorrow at
/// a sane morning hour; a timing defect must never fail an intake.
pub fn next_batch_slot(now: DateTime<Utc>, slots: &[NaiveTime]) -> DateTime<Utc> {
    if slots.is_empty() {
        warn!("Batch time list is empty, falling back to tomorrow morning");
        return fallback_slot(now);
    }

    let today = now.date_naive();
    for slot in slots {
        let candidate = today.and_time(*slot).and_utc();
        if candidate > now {
            return candidate;
        }
    }

    // past the last slot today: first slot tomorrow
    (today + Duration::days(1)).and_time(slots[0]).and_utc()
}

/// Next occurrence of `weekday` at `at`, strictly after `now`
pub fn next_weekly_slot(now: DateTime<Utc>, weekday: Weekday, at: NaiveTime) -> DateTime<Utc> {
    let days_ahead = (weekday.num_days_from_monday() + 7 - now.weekday().num_days_from_monday()) % 7;
    let candidate = (now.date_naive() + Duration::days(days_ahead as i64))
        .and_time(at)
        .and_utc();

    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

fn fallback_slot(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Duration::days(1))
        .and_time(NaiveTime::from_hms_opt(FALLBACK_HOUR, 0, 0).expect("valid fallback hour"))
        .and_utc()
}
