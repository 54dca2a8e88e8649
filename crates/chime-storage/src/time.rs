//! Timestamp encoding shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC3339 (microseconds, `Z`), so string order is time order.
pub(crate) fn encode(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 timestamp or SQLite's `datetime('now')` format.
pub(crate) fn decode(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc();
    }
    tracing::warn!(value = %s, "Unparseable timestamp in database, using now");
    Utc::now()
}
