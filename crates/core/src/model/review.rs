use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, StudyDirection};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when decoding review data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid review quality value: {0}")]
    InvalidQuality(u8),
}

//
// ─── REVIEW QUALITY ───────────────────────────────────────────────────────────
//

/// Three-level recall signal collected after each card is answered.
///
/// The scheduler treats the value ordinally:
/// - `Hard`: recall failed or was a struggle; the card regresses
/// - `Medium`: recalled with effort; moderate progress
/// - `Easy`: recalled comfortably; fastest progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewQuality {
    /// Recall failed or took visible effort. Resets accumulated progress.
    Hard,
    /// Recalled with some effort. Earns partial graduation credit.
    Medium,
    /// Recalled comfortably. Earns full graduation credit.
    Easy,
}

impl ReviewQuality {
    /// Converts a numeric quality (0-2) to a `ReviewQuality`.
    ///
    /// This is the strict decoding used by persistence. For the scheduler's
    /// lenient no-op handling of out-of-range codes, see
    /// [`Scheduler::apply_review_code`](crate::scheduler::Scheduler::apply_review_code).
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidQuality` if the value is not in 0-2.
    pub fn from_u8(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Hard),
            1 => Ok(Self::Medium),
            2 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidQuality(value)),
        }
    }

    /// Stable numeric form used by persistence.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            ReviewQuality::Hard => 0,
            ReviewQuality::Medium => 1,
            ReviewQuality::Easy => 2,
        }
    }

    /// Graduation credit earned by this response while in the learning phase.
    #[must_use]
    pub fn success_points(self) -> f64 {
        match self {
            ReviewQuality::Hard => 0.0,
            ReviewQuality::Medium => 0.5,
            ReviewQuality::Easy => 1.0,
        }
    }
}

//
// ─── REVIEW LOG ───────────────────────────────────────────────────────────────
//

/// Record of a single processed response.
///
/// Stores which card was answered, in which direction, when, and what
/// quality was given. Used for history and session summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLog {
    pub card_id: CardId,
    pub direction: StudyDirection,
    pub reviewed_at: DateTime<Utc>,
    pub quality: ReviewQuality,
}

impl ReviewLog {
    #[must_use]
    pub fn new(
        card_id: CardId,
        direction: StudyDirection,
        quality: ReviewQuality,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id,
            direction,
            reviewed_at,
            quality,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
