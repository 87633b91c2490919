use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ReviewLog, ReviewQuality};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many logs for a single session: {len}")]
    TooManyLogs { len: usize },

    #[error("total reviews ({total}) does not match quality counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("graduations ({graduations}) exceed total reviews ({total})")]
    TooManyGraduations { graduations: u32, total: u32 },
}

/// Aggregate summary for a completed study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_reviews: u32,
    hard: u32,
    medium: u32,
    easy: u32,
    graduations: u32,
}

impl SessionSummary {
    /// Rehydrate a session summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::CountMismatch` if totals do not align.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_reviews: u32,
        hard: u32,
        medium: u32,
        easy: u32,
        graduations: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let sum = hard + medium + easy;
        if sum != total_reviews {
            return Err(SessionSummaryError::CountMismatch {
                total: total_reviews,
                sum,
            });
        }
        if graduations > total_reviews {
            return Err(SessionSummaryError::TooManyGraduations {
                graduations,
                total: total_reviews,
            });
        }

        Ok(Self {
            started_at,
            completed_at,
            total_reviews,
            hard,
            medium,
            easy,
            graduations,
        })
    }

    /// Build a summary from a list of review logs plus the graduation tally.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is
    /// before `started_at`, or `TooManyLogs` if the count cannot fit in `u32`.
    pub fn from_logs(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        logs: &[ReviewLog],
        graduations: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let mut hard = 0_u32;
        let mut medium = 0_u32;
        let mut easy = 0_u32;

        for log in logs {
            match log.quality {
                ReviewQuality::Hard => hard = hard.saturating_add(1),
                ReviewQuality::Medium => medium = medium.saturating_add(1),
                ReviewQuality::Easy => easy = easy.saturating_add(1),
            }
        }

        let total_reviews = u32::try_from(logs.len())
            .map_err(|_| SessionSummaryError::TooManyLogs { len: logs.len() })?;

        Self::from_persisted(
            started_at,
            completed_at,
            total_reviews,
            hard,
            medium,
            easy,
            graduations,
        )
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_reviews(&self) -> u32 {
        self.total_reviews
    }

    #[must_use]
    pub fn hard(&self) -> u32 {
        self.hard
    }

    #[must_use]
    pub fn medium(&self) -> u32 {
        self.medium
    }

    #[must_use]
    pub fn easy(&self) -> u32 {
        self.easy
    }

    /// Cards that left the learning phase during this session.
    #[must_use]
    pub fn graduations(&self) -> u32 {
        self.graduations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardId, StudyDirection};
    use crate::time::fixed_now;

    #[test]
    fn summary_counts_qualities() {
        let now = fixed_now();
        let direction = StudyDirection::Forward;
        let logs = vec![
            ReviewLog::new(CardId::new(1), direction, ReviewQuality::Easy, now),
            ReviewLog::new(CardId::new(2), direction, ReviewQuality::Hard, now),
            ReviewLog::new(CardId::new(3), direction, ReviewQuality::Medium, now),
            ReviewLog::new(CardId::new(4), direction, ReviewQuality::Easy, now),
        ];

        let summary = SessionSummary::from_logs(now, now, &logs, 1).unwrap();

        assert_eq!(summary.total_reviews(), 4);
        assert_eq!(summary.hard(), 1);
        assert_eq!(summary.medium(), 1);
        assert_eq!(summary.easy(), 2);
        assert_eq!(summary.graduations(), 1);
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(now, now, 5, 1, 1, 1, 0).unwrap_err();
        assert!(matches!(err, SessionSummaryError::CountMismatch { .. }));
    }

    #[test]
    fn graduations_cannot_exceed_total() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(now, now, 2, 1, 1, 0, 3).unwrap_err();
        assert!(matches!(
            err,
            SessionSummaryError::TooManyGraduations { .. }
        ));
    }
}
