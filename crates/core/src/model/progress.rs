use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CardId, StudyDirection};

/// Lower bound for the ease factor; cards never grow harder than this.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Upper bound for the ease factor.
pub const MAX_EASE_FACTOR: f64 = 2.5;
/// Ease assigned to a freshly created record.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

pub(crate) fn clamp_ease(ease: f64) -> f64 {
    ease.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("interval must be finite and >= 0, got {0}")]
    InvalidInterval(f64),

    #[error("learning-phase record requires a session position")]
    LearningWithoutPosition,

    #[error("review-phase record must not carry a session position")]
    ReviewWithPosition,
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Durable scheduling state for one card studied in one direction.
///
/// Pure data: every transition is performed by the
/// [`Scheduler`](crate::scheduler::Scheduler), which builds a new value
/// rather than mutating in place. Invariants enforced at construction:
///
/// - `ease_factor` stays within `[1.3, 2.5]`
/// - a learning-phase record always has a `session_position`; a
///   review-phase record never does
#[derive(Debug, Clone, PartialEq)]
pub struct CardProgress {
    pub(crate) card_id: CardId,
    pub(crate) direction: StudyDirection,
    pub(crate) repetitions: u32,
    pub(crate) interval_days: f64,
    pub(crate) ease_factor: f64,
    pub(crate) next_review_at: DateTime<Utc>,
    pub(crate) last_review_at: Option<DateTime<Utc>>,
    pub(crate) is_selected: bool,
    pub(crate) is_mastered: bool,
    pub(crate) learning_phase: bool,
    pub(crate) session_position: Option<u32>,
    pub(crate) hard_presses: u32,
    pub(crate) successful_reviews: f64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl CardProgress {
    /// Creates the record for a card's first exposure.
    ///
    /// The card starts in the learning phase with zero repetitions, default
    /// ease, no graduation credit, and is due at `due` (callers pass "now"
    /// or the calendar end of day).
    #[must_use]
    pub fn new_learning(
        card_id: CardId,
        direction: StudyDirection,
        session_position: u32,
        due: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id,
            direction,
            repetitions: 0,
            interval_days: 0.0,
            ease_factor: DEFAULT_EASE_FACTOR,
            next_review_at: due,
            last_review_at: None,
            is_selected: true,
            is_mastered: false,
            learning_phase: true,
            session_position: Some(session_position),
            hard_presses: 0,
            successful_reviews: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// The ease factor is clamped back into bounds rather than rejected, so
    /// rows written by older builds stay loadable.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the interval is negative or non-finite, or
    /// if the phase/session-position invariant is violated.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn from_persisted(
        card_id: CardId,
        direction: StudyDirection,
        repetitions: u32,
        interval_days: f64,
        ease_factor: f64,
        next_review_at: DateTime<Utc>,
        last_review_at: Option<DateTime<Utc>>,
        is_selected: bool,
        is_mastered: bool,
        learning_phase: bool,
        session_position: Option<u32>,
        hard_presses: u32,
        successful_reviews: f64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if !interval_days.is_finite() || interval_days < 0.0 {
            return Err(ProgressError::InvalidInterval(interval_days));
        }
        if learning_phase && session_position.is_none() {
            return Err(ProgressError::LearningWithoutPosition);
        }
        if !learning_phase && session_position.is_some() {
            return Err(ProgressError::ReviewWithPosition);
        }

        Ok(Self {
            card_id,
            direction,
            repetitions,
            interval_days,
            ease_factor: clamp_ease(ease_factor),
            next_review_at,
            last_review_at,
            is_selected,
            is_mastered,
            learning_phase,
            session_position,
            hard_presses,
            successful_reviews,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn direction(&self) -> StudyDirection {
        self.direction
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    #[must_use]
    pub fn interval_days(&self) -> f64 {
        self.interval_days
    }

    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    #[must_use]
    pub fn next_review_at(&self) -> DateTime<Utc> {
        self.next_review_at
    }

    #[must_use]
    pub fn last_review_at(&self) -> Option<DateTime<Utc>> {
        self.last_review_at
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    #[must_use]
    pub fn is_mastered(&self) -> bool {
        self.is_mastered
    }

    /// True while the card is drilled repeatedly within the current session.
    #[must_use]
    pub fn learning_phase(&self) -> bool {
        self.learning_phase
    }

    /// Ordering key among in-session learning cards; `None` once graduated.
    #[must_use]
    pub fn session_position(&self) -> Option<u32> {
        self.session_position
    }

    #[must_use]
    pub fn hard_presses(&self) -> u32 {
        self.hard_presses
    }

    /// Accumulated graduation credit (0.5 per Medium, 1.0 per Easy).
    #[must_use]
    pub fn successful_reviews(&self) -> f64 {
        self.successful_reviews
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the card is eligible for presentation at `now`.
    ///
    /// Learning cards are always eligible within a session; review cards
    /// only once their due time has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.learning_phase || self.next_review_at <= now
    }

    /// Returns a copy with the selection flag changed.
    ///
    /// Deselected records are retired logically, never deleted; scheduling
    /// state is preserved for re-selection.
    #[must_use]
    pub fn with_selected(mut self, selected: bool, now: DateTime<Utc>) -> Self {
        self.is_selected = selected;
        self.updated_at = now;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
