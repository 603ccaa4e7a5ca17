//! Parse review-log CSV exports into typed review events.
//!
//! Expected header:
//! item_kind,item_id,quality,response_ms,reviewed_at
//!
//! `reviewed_at` is RFC3339 with any offset; it is normalized to UTC.
//! `response_ms` may be blank.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use recall_core::{ItemKind, ItemRef, Quality, ReviewEvent};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RawRow {
    item_kind: String,
    item_id: String,
    quality: String,
    #[serde(default)]
    response_ms: Option<String>,
    reviewed_at: String,
}

/// Parsed events plus a count of rows that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Sorted by `reviewed_at`; file order is kept for ties.
    pub events: Vec<ReviewEvent>,
    pub skipped: usize,
}

pub fn parse_review_log(path: impl AsRef<Path>) -> Result<IngestReport> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_review_log_reader(file).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_review_log_reader(reader: impl Read) -> Result<IngestReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut report = IngestReport::default();

    for (i, result) in rdr.deserialize::<RawRow>().enumerate() {
        // +2: header row, 1-based lines
        let line = i + 2;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "unreadable review-log row");
                report.skipped += 1;
                continue;
            }
        };

        match to_event(&row) {
            Ok(ev) => report.events.push(ev),
            Err(reason) => {
                warn!(line, item = %row.item_id, %reason, "skipping review-log row");
                report.skipped += 1;
            }
        }
    }

    report.events.sort_by_key(|e| e.reviewed_at);
    Ok(report)
}

fn to_event(row: &RawRow) -> std::result::Result<ReviewEvent, String> {
    let kind: ItemKind = row.item_kind.parse()?;

    if row.item_id.is_empty() {
        return Err("empty item_id".to_string());
    }

    let quality = row
        .quality
        .parse::<i64>()
        .map_err(|e| format!("quality {:?}: {e}", row.quality))
        .and_then(|q| Quality::new(q).map_err(|e| e.to_string()))?;

    let reviewed_at = DateTime::parse_from_rfc3339(&row.reviewed_at)
        .map_err(|e| format!("reviewed_at {:?}: {e}", row.reviewed_at))?
        .with_timezone(&Utc);

    let response_time_ms = match row.response_ms.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<u32>()
                .map_err(|e| format!("response_ms {raw:?}: {e}"))?,
        ),
    };

    Ok(ReviewEvent {
        item: ItemRef::new(kind, row.item_id.clone()),
        quality,
        response_time_ms,
        reviewed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HEADER: &str = "item_kind,item_id,quality,response_ms,reviewed_at\n";

    fn parse(body: &str) -> IngestReport {
        parse_review_log_reader(format!("{HEADER}{body}").as_bytes()).unwrap()
    }

    #[test]
    fn parses_a_row() {
        let r = parse("grammar,te-form,4,1200,2026-03-01T09:02:00+09:00\n");
        assert_eq!(r.skipped, 0);
        let ev = &r.events[0];
        assert_eq!(ev.item, ItemRef::new(ItemKind::Grammar, "te-form"));
        assert_eq!(ev.quality, Quality::EASY);
        assert_eq!(ev.response_time_ms, Some(1200));
        assert_eq!(ev.reviewed_at, Utc.with_ymd_and_hms(2026, 3, 1, 0, 2, 0).unwrap());
    }

    #[test]
    fn blank_response_time_is_none() {
        let r = parse("vocabulary,a, 3 , ,2026-03-01T09:00:00Z\n");
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].response_time_ms, None);
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let r = parse(
            "vocabulary,a,5,100,2026-03-01T09:00:00Z\n\
             kanji,b,3,100,2026-03-01T09:00:00Z\n\
             vocabulary,c,3,100,not-a-time\n\
             vocabulary,,3,100,2026-03-01T09:00:00Z\n\
             vocabulary,d,3,-1,2026-03-01T09:00:00Z\n\
             vocabulary,e,3,100,2026-03-01T09:00:00Z\n",
        );
        assert_eq!(r.skipped, 5);
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].item.id, "e");
    }

    #[test]
    fn events_come_back_in_time_order() {
        let r = parse(
            "vocabulary,late,3,,2026-03-02T00:00:00Z\n\
             vocabulary,early,3,,2026-03-01T00:00:00Z\n",
        );
        let ids: Vec<&str> = r.events.iter().map(|e| e.item.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
