//! ReviewScheduler: the four-phase SM-2 style state machine.
//!
//! `(now, schedule state, quality) -> (due, phase, step, ease, interval)`.
//! Pure and deterministic: no clock reads, no storage, no shared mutable
//! state. Callers own persistence and must serialize read-modify-write of a
//! single item's record themselves.
//!
//! Transitions (fail = quality < 3):
//!
//! ```text
//! new/learn --fail--> learn(0)            review --fail--> relearn(0), ease -= 0.2
//! new/learn --good--> learn(+1) | review(graduating_interval)
//! new/learn --easy--> review(easy_interval)
//! review    --good--> review(interval * ease')
//! review    --easy--> review(interval * ease' * easy_bonus)
//! relearn   --fail--> relearn(0)
//! relearn   --good--> relearn(+1) | review(min_interval)
//! relearn   --easy--> review(easy_interval)
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::schedule::{
    Band, DEFAULT_EASE_FACTOR, LAPSE_EASE_PENALTY, Phase, Quality, ReviewOutcome, ScheduleState,
};

#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

/// Outcome of every possible rating for one state, lowest quality first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub outcomes: Vec<ReviewOutcome>,
}

impl Preview {
    pub fn get(&self, quality: Quality) -> Option<&ReviewOutcome> {
        self.outcomes.get(usize::from(quality.value()))
    }
}

impl ReviewScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Scheduler configured from `SRS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SchedulerConfig::from_env())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Apply one rating. `now` is normalized to UTC before anything else.
    pub fn review<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
        state: &ScheduleState,
        quality: Quality,
    ) -> ReviewOutcome {
        let now = now.with_timezone(&Utc);
        let ease = self.resolve_ease(state.ease_factor);

        let outcome = match state.phase {
            // New items always start from the default ease.
            Phase::New => self.walk_ladder(
                now,
                Phase::Learn,
                &self.config.learning_steps,
                0,
                self.resolve_ease(DEFAULT_EASE_FACTOR),
                quality,
                self.config.graduating_interval,
            ),
            Phase::Learn => self.walk_ladder(
                now,
                Phase::Learn,
                &self.config.learning_steps,
                state.step_index,
                ease,
                quality,
                self.config.graduating_interval,
            ),
            Phase::Review => self.on_review(now, state.interval_days, ease, quality),
            Phase::Relearn => self.walk_ladder(
                now,
                Phase::Relearn,
                &self.config.relearning_steps,
                state.step_index,
                ease,
                quality,
                self.config.min_interval,
            ),
        };

        debug!(
            from = %state.phase,
            to = %outcome.phase,
            quality = quality.value(),
            ease_before = state.ease_factor,
            ease_after = outcome.ease_factor,
            interval_before = state.interval_days,
            interval_after = outcome.interval_days,
            due_at = %outcome.due_at,
            "scheduled review"
        );

        outcome
    }

    /// String-level entry point for records read straight from storage.
    ///
    /// `ease_factor` of `None`, `0.0` (or any non-positive / non-finite
    /// value) means unset. Negative counters are read as 0.
    pub fn review_raw<Tz: TimeZone>(
        &self,
        now: DateTime<Tz>,
        phase: &str,
        interval_days: i64,
        ease_factor: Option<f64>,
        step_index: i64,
        quality: i64,
    ) -> Result<ReviewOutcome> {
        let state = ScheduleState::from_raw(phase, interval_days, ease_factor, step_index)?;
        let quality = Quality::new(quality)?;

        Ok(self.review(now, &state, quality))
    }

    /// What each rating would do to `state` right now.
    pub fn preview<Tz: TimeZone>(&self, now: DateTime<Tz>, state: &ScheduleState) -> Preview {
        let now = now.with_timezone(&Utc);
        Preview {
            outcomes: Quality::all().map(|q| self.review(now, state, q)).collect(),
        }
    }

    fn resolve_ease(&self, ease: f64) -> f64 {
        let ease = if ease.is_finite() && ease > 0.0 {
            ease
        } else {
            DEFAULT_EASE_FACTOR
        };
        ease.max(self.config.ease_floor)
    }

    /// Shared ladder logic for `new`, `learn` and `relearn`.
    #[allow(clippy::too_many_arguments)]
    fn walk_ladder(
        &self,
        now: DateTime<Utc>,
        phase: Phase,
        steps: &[u32],
        step_index: u32,
        ease: f64,
        quality: Quality,
        graduation_days: u32,
    ) -> ReviewOutcome {
        match quality.band() {
            Band::Fail => self.at_step(now, phase, steps, 0, ease),
            Band::Good => {
                let next = step_index.saturating_add(1);
                if (next as usize) < steps.len() {
                    self.at_step(now, phase, steps, next, ease)
                } else {
                    self.graduate(now, graduation_days, ease)
                }
            }
            Band::Easy => self.graduate(now, self.config.easy_interval, ease),
        }
    }

    fn on_review(
        &self,
        now: DateTime<Utc>,
        interval_days: u32,
        ease: f64,
        quality: Quality,
    ) -> ReviewOutcome {
        match quality.band() {
            Band::Fail => {
                let ease = (ease - LAPSE_EASE_PENALTY).max(self.config.ease_floor);
                self.at_step(now, Phase::Relearn, &self.config.relearning_steps, 0, ease)
            }
            Band::Good => {
                let ease = self.updated_ease(ease, quality);
                let days = self.grow(interval_days, ease, 1.0);
                self.graduate(now, days, ease)
            }
            Band::Easy => {
                let ease = self.updated_ease(ease, quality);
                let days = self.grow(interval_days, ease, self.config.easy_bonus);
                self.graduate(now, days, ease)
            }
        }
    }

    /// SM-2 ease update on the 1..=5 scale. Good leaves ease unchanged,
    /// Easy adds 0.1.
    fn updated_ease(&self, ease: f64, quality: Quality) -> f64 {
        let q = f64::from(quality.value()) + 1.0;
        let d = 5.0 - q;
        (ease + (0.1 - d * (0.08 + d * 0.02))).max(self.config.ease_floor)
    }

    /// `round(interval * ease * bonus)`, half to even, at least one day.
    fn grow(&self, interval_days: u32, ease: f64, bonus: f64) -> u32 {
        let raw = (f64::from(interval_days) * ease * bonus).round_ties_even();
        if raw >= f64::from(self.config.max_interval) {
            self.config.max_interval
        } else {
            (raw as u32).max(1)
        }
    }

    fn at_step(
        &self,
        now: DateTime<Utc>,
        phase: Phase,
        steps: &[u32],
        step_index: u32,
        ease: f64,
    ) -> ReviewOutcome {
        // Ladders are validated non-empty, and callers only pass in-range indices.
        let minutes = steps.get(step_index as usize).copied().unwrap_or(1);
        ReviewOutcome {
            due_at: offset(now, Duration::minutes(i64::from(minutes))),
            phase,
            step_index,
            ease_factor: ease,
            interval_days: 0,
        }
    }

    fn graduate(&self, now: DateTime<Utc>, days: u32, ease: f64) -> ReviewOutcome {
        let days = days.clamp(1, self.config.max_interval.max(1));
        ReviewOutcome {
            due_at: offset(now, Duration::days(i64::from(days))),
            phase: Phase::Review,
            step_index: 0,
            ease_factor: ease,
            interval_days: days,
        }
    }
}

fn offset(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
    }

    fn sched() -> ReviewScheduler {
        ReviewScheduler::default()
    }

    fn review_state(interval: u32, ease: f64) -> ScheduleState {
        ScheduleState::new_item()
            .with_phase(Phase::Review)
            .with_interval(interval)
            .with_ease(ease)
    }

    #[test]
    fn new_good_moves_to_second_learning_step() {
        let out = sched()
            .review_raw(now(), "new", 0, Some(0.0), 0, 3)
            .unwrap();
        assert_eq!(out.phase, Phase::Learn);
        assert_eq!(out.step_index, 1);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
        assert!((out.ease_factor - 2.5).abs() < EPS);
        assert_eq!(out.interval_days, 0);
    }

    #[test]
    fn new_easy_skips_to_review() {
        let out = sched()
            .review_raw(now(), "new", 0, Some(0.0), 0, 4)
            .unwrap();
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 4);
        assert_eq!(out.due_at, now() + Duration::days(4));
        assert!((out.ease_factor - 2.5).abs() < EPS);
        assert_eq!(out.step_index, 0);
    }

    #[test]
    fn new_fail_enters_learn_at_first_step() {
        let out = sched().review(now(), &ScheduleState::new_item(), Quality::AGAIN);
        assert_eq!(out.phase, Phase::Learn);
        assert_eq!(out.step_index, 0);
        assert_eq!(out.due_at, now() + Duration::minutes(1));
        assert_eq!(out.interval_days, 0);
    }

    #[test]
    fn new_resets_ease_to_default() {
        let state = ScheduleState::new_item().with_ease(1.9);
        let out = sched().review(now(), &state, Quality::HARD);
        assert!((out.ease_factor - DEFAULT_EASE_FACTOR).abs() < EPS);
    }

    #[test]
    fn learn_good_at_last_step_graduates() {
        let state = ScheduleState::new_item()
            .with_phase(Phase::Learn)
            .with_step(1)
            .with_ease(2.1);
        let out = sched().review(now(), &state, Quality::GOOD);
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 1);
        assert_eq!(out.due_at, now() + Duration::days(1));
        assert!((out.ease_factor - 2.1).abs() < EPS);
    }

    #[test]
    fn learn_fail_keeps_existing_ease() {
        let state = ScheduleState::new_item()
            .with_phase(Phase::Learn)
            .with_step(1)
            .with_ease(1.8);
        let out = sched().review(now(), &state, Quality::DIFFICULT);
        assert_eq!(out.phase, Phase::Learn);
        assert_eq!(out.step_index, 0);
        assert_eq!(out.due_at, now() + Duration::minutes(1));
        assert!((out.ease_factor - 1.8).abs() < EPS);
    }

    #[test]
    fn learn_easy_uses_easy_interval() {
        let state = ScheduleState::new_item().with_phase(Phase::Learn).with_ease(2.2);
        let out = sched().review(now(), &state, Quality::EASY);
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 4);
        assert!((out.ease_factor - 2.2).abs() < EPS);
    }

    #[test]
    fn review_lapse_drops_to_relearn() {
        let out = sched()
            .review_raw(now(), "review", 10, Some(2.5), 0, 1)
            .unwrap();
        assert_eq!(out.phase, Phase::Relearn);
        assert!((out.ease_factor - 2.3).abs() < EPS);
        assert_eq!(out.interval_days, 0);
        assert_eq!(out.step_index, 0);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn review_good_keeps_ease_and_multiplies() {
        let out = sched().review(now(), &review_state(10, 2.5), Quality::GOOD);
        assert_eq!(out.phase, Phase::Review);
        assert!((out.ease_factor - 2.5).abs() < EPS);
        assert_eq!(out.interval_days, 25);
        assert_eq!(out.due_at, now() + Duration::days(25));
    }

    #[test]
    fn review_easy_applies_bonus() {
        let out = sched().review(now(), &review_state(10, 2.5), Quality::EASY);
        assert!((out.ease_factor - 2.6).abs() < EPS);
        assert_eq!(out.interval_days, 34);
        assert_eq!(out.due_at, now() + Duration::days(34));

        let (due, phase, step, ease, interval) = out.into_tuple();
        assert_eq!(due, now() + Duration::days(34));
        assert_eq!((phase, step, interval), (Phase::Review, 0, 34));
        assert!((ease - 2.6).abs() < EPS);
    }

    #[test]
    fn review_interval_is_capped() {
        let out = sched().review(now(), &review_state(30000, 2.5), Quality::GOOD);
        assert_eq!(out.interval_days, 36500);

        let cfg = SchedulerConfig {
            max_interval: 30,
            ..SchedulerConfig::default()
        };
        let capped = ReviewScheduler::new(cfg).unwrap();
        let out = capped.review(now(), &review_state(20, 2.5), Quality::EASY);
        assert_eq!(out.interval_days, 30);
    }

    #[test]
    fn review_with_zero_interval_still_moves_forward() {
        let out = sched().review(now(), &review_state(0, 2.5), Quality::GOOD);
        assert_eq!(out.interval_days, 1);
        assert!(out.due_at > now());
    }

    #[test]
    fn repeated_lapses_stop_at_floor() {
        let s = sched();
        let mut state = review_state(10, 2.5);
        for _ in 0..20 {
            let out = s.review(now(), &state, Quality::AGAIN);
            state = out.state().with_phase(Phase::Review).with_interval(5);
        }
        assert!((state.ease_factor - 1.3).abs() < EPS);
    }

    #[test]
    fn relearn_good_returns_with_min_interval() {
        let state = ScheduleState::new_item()
            .with_phase(Phase::Relearn)
            .with_ease(2.3);
        let out = sched().review(now(), &state, Quality::GOOD);
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 1);
        assert!((out.ease_factor - 2.3).abs() < EPS);
    }

    #[test]
    fn relearn_walks_a_longer_ladder() {
        let cfg = SchedulerConfig {
            relearning_steps: vec![10, 60],
            min_interval: 2,
            ..SchedulerConfig::default()
        };
        let s = ReviewScheduler::new(cfg).unwrap();
        let state = ScheduleState::new_item().with_phase(Phase::Relearn);

        let first = s.review(now(), &state, Quality::GOOD);
        assert_eq!(first.phase, Phase::Relearn);
        assert_eq!(first.step_index, 1);
        assert_eq!(first.due_at, now() + Duration::minutes(60));

        let second = s.review(now(), &first.state(), Quality::GOOD);
        assert_eq!(second.phase, Phase::Review);
        assert_eq!(second.interval_days, 2);

        let failed = s.review(now(), &first.state(), Quality::HARD);
        assert_eq!(failed.phase, Phase::Relearn);
        assert_eq!(failed.step_index, 0);
    }

    #[test]
    fn relearn_easy_uses_easy_interval() {
        let state = ScheduleState::new_item().with_phase(Phase::Relearn);
        let out = sched().review(now(), &state, Quality::EASY);
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 4);
    }

    #[test]
    fn stale_step_index_graduates_instead_of_panicking() {
        let state = ScheduleState::new_item().with_phase(Phase::Learn).with_step(7);
        let out = sched().review(now(), &state, Quality::GOOD);
        assert_eq!(out.phase, Phase::Review);
        assert_eq!(out.interval_days, 1);
    }

    #[test]
    fn unknown_phase_fails() {
        let err = sched()
            .review_raw(now(), "archived", 3, Some(2.5), 0, 3)
            .unwrap_err();
        assert_eq!(err, crate::SchedulerError::UnknownPhase("archived".into()));
    }

    #[test]
    fn out_of_range_quality_fails() {
        let err = sched()
            .review_raw(now(), "review", 3, Some(2.5), 0, 5)
            .unwrap_err();
        assert_eq!(err, crate::SchedulerError::QualityOutOfRange(5));
    }

    #[test]
    fn unset_and_low_ease_are_resolved() {
        let s = sched();
        let unset = s.review_raw(now(), "learn", 0, None, 0, 0).unwrap();
        assert!((unset.ease_factor - 2.5).abs() < EPS);

        let below_floor = s.review_raw(now(), "learn", 0, Some(0.9), 0, 0).unwrap();
        assert!((below_floor.ease_factor - 1.3).abs() < EPS);
    }

    #[test]
    fn now_is_normalized_to_utc() {
        let tz = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        let local = now().with_timezone(&tz);
        let out = sched().review(local, &ScheduleState::new_item(), Quality::GOOD);
        assert_eq!(out.due_at, now() + Duration::minutes(10));
        assert_eq!(out.due_at.timezone(), Utc);
    }

    #[test]
    fn preview_covers_every_quality() {
        let p = sched().preview(now(), &review_state(10, 2.5));
        assert_eq!(p.outcomes.len(), 5);
        assert_eq!(p.get(Quality::AGAIN).unwrap().phase, Phase::Relearn);
        assert_eq!(p.get(Quality::GOOD).unwrap().interval_days, 25);
        assert_eq!(p.get(Quality::EASY).unwrap().interval_days, 34);
    }

    #[test]
    fn deserialized_empty_preview_has_no_outcomes() {
        let p: Preview = serde_json::from_str(r#"{"outcomes":[]}"#).unwrap();
        assert!(p.get(Quality::EASY).is_none());
        assert!(p.get(Quality::AGAIN).is_none());
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = SchedulerConfig {
            learning_steps: vec![],
            ..SchedulerConfig::default()
        };
        assert!(ReviewScheduler::new(cfg).is_err());
    }
}
