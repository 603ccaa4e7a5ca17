//! Caller-side progress record and review audit log.
//!
//! The scheduler never persists anything. These are the value types a
//! storage layer keeps per user x item, plus the audit entry it appends for
//! every rating (analytics only; nothing here feeds back into scheduling).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::scheduler::ReviewScheduler;
use crate::schedule::{Phase, Quality, ReviewOutcome, ScheduleState};

/// Kind of learning material an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Vocabulary,
    Grammar,
    ErrorPattern,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Vocabulary => "vocabulary",
            ItemKind::Grammar => "grammar",
            ItemKind::ErrorPattern => "error_pattern",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vocabulary" | "vocab" | "word" => Ok(ItemKind::Vocabulary),
            "grammar" => Ok(ItemKind::Grammar),
            "error_pattern" | "error" => Ok(ItemKind::ErrorPattern),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: String,
}

impl ItemRef {
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One recorded rating, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub item: ItemRef,
    pub quality: Quality,
    /// Milliseconds from prompt to answer. Audit only.
    pub response_time_ms: Option<u32>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new<Tz: TimeZone>(item: ItemRef, quality: Quality, reviewed_at: DateTime<Tz>) -> Self {
        Self {
            item,
            quality,
            response_time_ms: None,
            reviewed_at: reviewed_at.with_timezone(&Utc),
        }
    }

    pub fn with_response_time(mut self, ms: u32) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}

/// Audit record appended once per rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub item: ItemRef,
    pub quality: Quality,
    pub response_time_ms: Option<u32>,
    pub reviewed_at: DateTime<Utc>,
    pub phase_before: Phase,
    pub phase_after: Phase,
    pub ease_before: f64,
    pub ease_after: f64,
    pub interval_before: u32,
    pub interval_after: u32,
    pub due_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    pub fn record(event: &ReviewEvent, before: &ScheduleState, outcome: &ReviewOutcome) -> Self {
        Self {
            item: event.item.clone(),
            quality: event.quality,
            response_time_ms: event.response_time_ms,
            reviewed_at: event.reviewed_at,
            phase_before: before.phase,
            phase_after: outcome.phase,
            ease_before: before.ease_factor,
            ease_after: outcome.ease_factor,
            interval_before: before.interval_days,
            interval_after: outcome.interval_days,
            due_at: outcome.due_at,
        }
    }

    pub fn is_lapse(&self) -> bool {
        self.phase_before == Phase::Review && self.phase_after == Phase::Relearn
    }
}

/// Persisted per user x item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub item: ItemRef,
    pub schedule: ScheduleState,
    pub due_at: DateTime<Utc>,
    pub reps: u32,
    pub lapses: u32,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ItemProgress {
    /// First encounter: `new` phase, due immediately.
    pub fn new<Tz: TimeZone>(item: ItemRef, now: DateTime<Tz>) -> Self {
        Self {
            item,
            schedule: ScheduleState::new_item(),
            due_at: now.with_timezone(&Utc),
            reps: 0,
            lapses: 0,
            last_reviewed_at: None,
        }
    }

    pub fn is_due<Tz: TimeZone>(&self, now: DateTime<Tz>) -> bool {
        self.due_at <= now.with_timezone(&Utc)
    }

    /// Run one rating through the scheduler and fold the result into this
    /// record. Returns the audit entry to append.
    pub fn apply(&mut self, scheduler: &ReviewScheduler, event: &ReviewEvent) -> ReviewLogEntry {
        let before = self.schedule.clone();
        let outcome = scheduler.review(event.reviewed_at, &before, event.quality);
        let entry = ReviewLogEntry::record(event, &before, &outcome);

        self.reps = self.reps.saturating_add(1);
        if entry.is_lapse() {
            self.lapses = self.lapses.saturating_add(1);
        }
        self.schedule = outcome.state();
        self.due_at = outcome.due_at;
        self.last_reviewed_at = Some(event.reviewed_at);

        entry
    }
}

/// Caller-level "mastered" policy layered over the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryPolicy {
    pub min_interval_days: u32,
    pub min_reps: u32,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            min_interval_days: 21,
            min_reps: 5,
        }
    }
}

impl MasteryPolicy {
    pub fn is_mastered(&self, progress: &ItemProgress) -> bool {
        progress.schedule.phase == Phase::Review
            && progress.schedule.interval_days >= self.min_interval_days
            && progress.reps >= self.min_reps
    }
}
