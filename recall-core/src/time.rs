//! Time utilities: turn caller-supplied clock values into UTC anchors.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a wall-clock time like "2026-02-20 23:59" in an IANA tz like
/// "Asia/Tokyo", returning UTC.
pub fn parse_local_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let zone: Tz = tz
        .parse()
        .map_err(|_| anyhow!("invalid timezone: {tz}"))?;

    let wall = NaiveDateTime::parse_from_str(local.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow!("invalid local datetime '{local}': {e}"))?;

    match zone.from_local_datetime(&wall) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => bail!(
            "ambiguous local time {local} in {tz} (either {} or {})",
            a.with_timezone(&Utc),
            b.with_timezone(&Utc)
        ),
        LocalResult::None => bail!("local time {local} does not exist in {tz} (DST gap)"),
    }
}

/// Accept either RFC3339 (any offset) or a local "YYYY-MM-DD HH:MM" in `tz`.
pub fn parse_instant(raw: &str, tz: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_local_to_utc(raw, tz)
}

/// Helper: format a UTC time into RFC3339.
pub fn to_rfc3339_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
