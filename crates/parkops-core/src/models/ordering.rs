use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;

use parkops_proto::Mission;

/// Parse the free-form payload date. Accepts RFC 3339 timestamps, naive
/// `YYYY-MM-DD[T| ]HH:MM:SS` timestamps (taken as UTC) and plain dates.
pub fn parse_mission_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn mission_date(mission: &Mission) -> DateTime<Utc> {
    mission
        .payload
        .date
        .as_deref()
        .and_then(parse_mission_date)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Unopened first, then in progress, then completed; newest date first
/// within the same status. Missions without a usable date sort last.
pub fn compare_missions(a: &Mission, b: &Mission) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| mission_date(b).cmp(&mission_date(a)))
}

/// Stable in-place sort for cache-first display.
pub fn sort_missions(missions: &mut [Mission]) {
    missions.sort_by(compare_missions);
}
