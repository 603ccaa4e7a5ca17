//! Scheduler tunables.
//!
//! Built once (defaults, TOML section, or `SRS_*` environment variables) and
//! then treated as immutable for the life of a [`crate::ReviewScheduler`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SchedulerError};

pub const ENV_LEARNING_STEPS: &str = "SRS_LEARNING_STEPS";
pub const ENV_RELEARNING_STEPS: &str = "SRS_RELEARNING_STEPS";
pub const ENV_GRADUATING_INTERVAL: &str = "SRS_GRADUATING_INTERVAL";
pub const ENV_EASY_INTERVAL: &str = "SRS_EASY_INTERVAL";
pub const ENV_EASY_BONUS: &str = "SRS_EASY_BONUS";
pub const ENV_MAX_INTERVAL: &str = "SRS_MAX_INTERVAL";
pub const ENV_MIN_INTERVAL: &str = "SRS_MIN_INTERVAL";
pub const ENV_EASE_FLOOR: &str = "SRS_EASE_FLOOR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minute offsets walked by `new`/`learn` items before graduating.
    pub learning_steps: Vec<u32>,
    /// Minute offsets walked after a lapse before returning to `review`.
    pub relearning_steps: Vec<u32>,
    /// Days on first graduation through the learning ladder.
    pub graduating_interval: u32,
    /// Days when a non-review item is rated Easy.
    pub easy_interval: u32,
    /// Extra multiplier for Easy on a `review` item.
    pub easy_bonus: f64,
    /// Upper bound on any review interval, in days.
    pub max_interval: u32,
    /// Days assigned when a lapsed item graduates out of `relearn`.
    pub min_interval: u32,
    pub ease_floor: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: default_learning_steps(),
            relearning_steps: default_relearning_steps(),
            graduating_interval: 1,
            easy_interval: 4,
            easy_bonus: 1.3,
            max_interval: 36500,
            min_interval: 1,
            ease_floor: 1.3,
        }
    }
}

fn default_learning_steps() -> Vec<u32> {
    vec![1, 10]
}

fn default_relearning_steps() -> Vec<u32> {
    vec![10]
}

/// Parse a ladder like `"1, 10"`. Empty ladders and zero-minute steps are
/// rejected because every step must land strictly after `now`.
pub fn parse_steps(raw: &str) -> Option<Vec<u32>> {
    let steps = raw
        .split(',')
        .map(|s| s.trim().parse::<u32>().ok().filter(|m| *m > 0))
        .collect::<Option<Vec<_>>>()?;
    if steps.is_empty() { None } else { Some(steps) }
}

impl SchedulerConfig {
    /// Read `SRS_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns.
    pub fn from_lookup(lookup: impl FnMut(&str) -> Option<String>) -> Self {
        Self::default().apply_env_overrides(lookup)
    }

    /// Overlay env-style options. A bad ladder falls back to the default
    /// ladder; a scalar that fails to parse or would not pass `validate()`
    /// keeps its current value. Both log a warning and never fail.
    pub fn apply_env_overrides(mut self, mut lookup: impl FnMut(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_LEARNING_STEPS) {
            self.learning_steps = parse_steps(&raw).unwrap_or_else(|| {
                warn!(var = ENV_LEARNING_STEPS, value = %raw, "malformed step ladder, using default");
                default_learning_steps()
            });
        }
        if let Some(raw) = lookup(ENV_RELEARNING_STEPS) {
            self.relearning_steps = parse_steps(&raw).unwrap_or_else(|| {
                warn!(var = ENV_RELEARNING_STEPS, value = %raw, "malformed step ladder, using default");
                default_relearning_steps()
            });
        }

        let at_least_one_day = |days: &u32| *days >= 1;
        let (prev_min, prev_max) = (self.min_interval, self.max_interval);

        override_scalar(&mut lookup, ENV_GRADUATING_INTERVAL, &mut self.graduating_interval, at_least_one_day);
        override_scalar(&mut lookup, ENV_EASY_INTERVAL, &mut self.easy_interval, at_least_one_day);
        override_scalar(&mut lookup, ENV_EASY_BONUS, &mut self.easy_bonus, |b: &f64| {
            b.is_finite() && *b >= 1.0
        });
        override_scalar(&mut lookup, ENV_MAX_INTERVAL, &mut self.max_interval, at_least_one_day);
        override_scalar(&mut lookup, ENV_MIN_INTERVAL, &mut self.min_interval, at_least_one_day);
        override_scalar(&mut lookup, ENV_EASE_FLOOR, &mut self.ease_floor, |f: &f64| {
            f.is_finite() && *f > 0.0
        });

        if self.max_interval < self.min_interval {
            warn!(
                min = self.min_interval,
                max = self.max_interval,
                "max interval below min interval, keeping current bounds"
            );
            self.min_interval = prev_min;
            self.max_interval = prev_max;
        }

        self
    }

    /// Check that every transition this config can produce keeps the
    /// schedule invariants (future due time, review interval >= 1).
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SchedulerError::InvalidConfig(msg));

        for (name, steps) in [
            ("learning_steps", &self.learning_steps),
            ("relearning_steps", &self.relearning_steps),
        ] {
            if steps.is_empty() {
                return invalid(format!("{name} must not be empty"));
            }
            if steps.contains(&0) {
                return invalid(format!("{name} must be positive minute offsets, got {steps:?}"));
            }
        }

        for (name, days) in [
            ("graduating_interval", self.graduating_interval),
            ("easy_interval", self.easy_interval),
            ("min_interval", self.min_interval),
            ("max_interval", self.max_interval),
        ] {
            if days == 0 {
                return invalid(format!("{name} must be at least 1 day"));
            }
        }

        if self.max_interval < self.min_interval {
            return invalid(format!(
                "max_interval ({}) is below min_interval ({})",
                self.max_interval, self.min_interval
            ));
        }

        if !self.easy_bonus.is_finite() || self.easy_bonus < 1.0 {
            return invalid(format!("easy_bonus must be >= 1.0, got {}", self.easy_bonus));
        }

        if !self.ease_floor.is_finite() || self.ease_floor <= 0.0 {
            return invalid(format!("ease_floor must be positive, got {}", self.ease_floor));
        }

        Ok(())
    }
}

fn override_scalar<T>(
    lookup: &mut impl FnMut(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
    accept: impl Fn(&T) -> bool,
) where
    T: std::str::FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) if accept(&v) => *slot = v,
        Ok(_) => warn!(var = key, value = %raw, keep = %slot, "out-of-range value, keeping current"),
        Err(_) => warn!(var = key, value = %raw, keep = %slot, "malformed value, keeping current"),
    }
}
