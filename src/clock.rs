/// Time source and date formatting
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Supplies "now" in milliseconds since the Unix epoch
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock; `Utc::now()` goes through `Date.now()` in the browser
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

fn to_datetime(ms: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// RFC 3339 timestamp, used in the export envelope
pub fn iso_timestamp(ms: f64) -> String {
    to_datetime(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// `YYYY-MM-DD` for a timestamp
pub fn iso_date(ms: f64) -> String {
    to_datetime(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Human-friendly age of a timestamp relative to `now`
///
/// - same day → "Today"
/// - one day → "Yesterday"
/// - under a week → "N days ago"
/// - otherwise the date
pub fn format_relative(timestamp: f64, now: f64) -> String {
    let diff_days = ((now - timestamp) / DAY_MS).floor() as i64;

    match diff_days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", diff_days),
        _ => iso_date(timestamp),
    }
}
