//! Error taxonomy for the review scheduler.

/// Scheduler error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// The stored phase string is not one of `new`, `learn`, `review`, `relearn`.
    #[error("unknown phase: {0:?}")]
    UnknownPhase(String),
    /// Quality rating outside the closed range 0..=4.
    #[error("quality {0} is out of range (expected 0..=4)")]
    QualityOutOfRange(i64),
    /// Configuration values that cannot produce a valid schedule.
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// True when the failure stems from bad caller input rather than a
    /// corrupted record or a broken deployment.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SchedulerError::QualityOutOfRange(_))
    }
}

/// Scheduler result type
pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phase_is_server_side() {
        let e = SchedulerError::UnknownPhase("archived".into());
        assert!(!e.is_client_error());
        assert_eq!(e.to_string(), "unknown phase: \"archived\"");
    }

    #[test]
    fn bad_quality_is_client_side() {
        assert!(SchedulerError::QualityOutOfRange(7).is_client_error());
    }
}
