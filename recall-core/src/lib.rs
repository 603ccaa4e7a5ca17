//! recall-core: spaced-repetition review scheduling.
//!
//! A pure transition function over four phases (`new`, `learn`, `review`,
//! `relearn`) plus the value types callers persist around it.

pub mod config;
pub mod error;
pub mod progress;
pub mod queue;
pub mod schedule;
pub mod scheduler;
pub mod time;

pub use config::{SchedulerConfig, parse_steps};
pub use error::{Result, SchedulerError};
pub use progress::{ItemKind, ItemProgress, ItemRef, MasteryPolicy, ReviewEvent, ReviewLogEntry};
pub use queue::DueQueue;
pub use schedule::{
    Band, DEFAULT_EASE_FACTOR, LAPSE_EASE_PENALTY, Phase, Quality, ReviewOutcome, ScheduleState,
};
pub use scheduler::{Preview, ReviewScheduler};
