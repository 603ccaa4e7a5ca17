//! Schedule state model: phases, quality ratings, and the five-field outcome
//! the scheduler hands back to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchedulerError};

/// Ease factor assigned to an item that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Flat ease penalty applied when a `review` item lapses.
pub const LAPSE_EASE_PENALTY: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    New,
    Learn,
    Review,
    Relearn,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::New, Phase::Learn, Phase::Review, Phase::Relearn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::New => "new",
            Phase::Learn => "learn",
            Phase::Review => "review",
            Phase::Relearn => "relearn",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SchedulerError;

    /// Exact lowercase match only. A stored value outside the four phases
    /// means an unmigrated or corrupted record, so nothing is guessed.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Phase::New),
            "learn" => Ok(Phase::Learn),
            "review" => Ok(Phase::Review),
            "relearn" => Ok(Phase::Relearn),
            other => Err(SchedulerError::UnknownPhase(other.to_string())),
        }
    }
}

/// How the scheduler reads a rating: everything below Good is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Fail,
    Good,
    Easy,
}

/// Review rating in the closed range 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const AGAIN: Quality = Quality(0);
    pub const HARD: Quality = Quality(1);
    pub const DIFFICULT: Quality = Quality(2);
    pub const GOOD: Quality = Quality(3);
    pub const EASY: Quality = Quality(4);

    pub const MAX: u8 = 4;

    pub fn new(value: i64) -> Result<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(SchedulerError::QualityOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// 0..=4 collapses to fail / good / easy. Again, Hard and the 2 boundary
    /// rating all take the fail branch.
    pub fn band(&self) -> Band {
        match self.0 {
            0..=2 => Band::Fail,
            3 => Band::Good,
            _ => Band::Easy,
        }
    }

    /// Iterate every accepted rating, lowest first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per user x item schedule state, owned and persisted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub phase: Phase,
    pub ease_factor: f64,
    /// Days. Only positive while `phase == Review`.
    pub interval_days: u32,
    /// Index into the ladder of the current phase.
    pub step_index: u32,
}

impl ScheduleState {
    /// State of an item the learner has just encountered.
    pub fn new_item() -> Self {
        Self {
            phase: Phase::New,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            step_index: 0,
        }
    }

    /// Build a state from storage columns. Unknown phases fail; an ease of
    /// `None` is left at 0.0 (unset) for the scheduler to resolve; negative
    /// counters are read as 0.
    pub fn from_raw(
        phase: &str,
        interval_days: i64,
        ease_factor: Option<f64>,
        step_index: i64,
    ) -> Result<Self> {
        Ok(Self {
            phase: phase.parse()?,
            ease_factor: ease_factor.unwrap_or(0.0),
            interval_days: saturate_u32(interval_days),
            step_index: saturate_u32(step_index),
        })
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_ease(mut self, ease_factor: f64) -> Self {
        self.ease_factor = ease_factor;
        self
    }

    pub fn with_interval(mut self, days: u32) -> Self {
        self.interval_days = days;
        self
    }

    pub fn with_step(mut self, step_index: u32) -> Self {
        self.step_index = step_index;
        self
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new_item()
    }
}

fn saturate_u32(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

/// Result of one review: when the item is due next and the state to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub due_at: DateTime<Utc>,
    pub phase: Phase,
    pub step_index: u32,
    pub ease_factor: f64,
    pub interval_days: u32,
}

impl ReviewOutcome {
    pub fn state(&self) -> ScheduleState {
        ScheduleState {
            phase: self.phase,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            step_index: self.step_index,
        }
    }

    /// `(due_time, new_phase, new_step_index, new_ease_factor, new_interval_days)`
    pub fn into_tuple(self) -> (DateTime<Utc>, Phase, u32, f64, u32) {
        (
            self.due_at,
            self.phase,
            self.step_index,
            self.ease_factor,
            self.interval_days,
        )
    }
}
