//! `recall replay`: run a review-log CSV through the scheduler, item by item.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use recall_core::time::to_rfc3339_utc;
use recall_core::{DueQueue, ItemProgress, MasteryPolicy, ReviewLogEntry, ReviewScheduler};
use recall_ingest::parse_review_log;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub skipped: usize,
    pub items: Vec<ItemProgress>,
    pub log: Vec<ReviewLogEntry>,
    pub due: usize,
    pub mastered: usize,
    pub next_due_at: Option<DateTime<Utc>>,
}

pub fn replay(
    csv: &Path,
    scheduler: &ReviewScheduler,
    mastery: &MasteryPolicy,
    at: DateTime<Utc>,
) -> Result<ReplaySummary> {
    let report = parse_review_log(csv).with_context(|| format!("replaying {}", csv.display()))?;

    let mut queue = DueQueue::new();
    let mut log = Vec::with_capacity(report.events.len());

    for ev in &report.events {
        if queue.get(&ev.item).is_none() {
            queue.upsert(ItemProgress::new(ev.item.clone(), ev.reviewed_at));
        }
        if let Some(progress) = queue.get_mut(&ev.item) {
            log.push(progress.apply(scheduler, ev));
        }
    }

    let due = queue.due(at).len();
    let mastered = queue.iter().filter(|p| mastery.is_mastered(p)).count();

    Ok(ReplaySummary {
        events: report.events.len(),
        skipped: report.skipped,
        next_due_at: queue.next_due_at(),
        items: queue.iter().cloned().collect(),
        log,
        due,
        mastered,
    })
}

pub fn print_summary(summary: &ReplaySummary, at: DateTime<Utc>) {
    println!(
        "Replayed {} events ({} skipped) across {} items\n",
        summary.events,
        summary.skipped,
        summary.items.len()
    );

    for p in &summary.items {
        println!(
            "- {} | {} step={} ease={:.2} interval={}d | reps={} lapses={} | due {}",
            p.item,
            p.schedule.phase,
            p.schedule.step_index,
            p.schedule.ease_factor,
            p.schedule.interval_days,
            p.reps,
            p.lapses,
            to_rfc3339_utc(p.due_at)
        );
    }

    println!("\nDue at {}: {}", to_rfc3339_utc(at), summary.due);
    println!("Mastered: {}", summary.mastered);
    if let Some(next) = summary.next_due_at {
        println!("Next due: {}", to_rfc3339_utc(next));
    }
}
