use chrono::{DateTime, Duration, Utc};

use crate::model::{CardId, CardProgress, ReviewQuality, StudyDirection, clamp_ease};
use crate::time::end_of_day;

/// Accumulated success points required to leave the learning phase.
pub const GRADUATION_POINTS: f64 = 3.0;
/// Upper bound on any review-phase interval.
pub const MAX_INTERVAL_DAYS: f64 = 365.0;

/// Interval assigned the moment a card graduates.
const GRADUATION_INTERVAL_DAYS: f64 = 1.0;
/// One-time ease bonus applied at graduation.
const GRADUATION_EASE_BONUS: f64 = 0.15;

/// Mastery thresholds; informational, never gates scheduling.
const MASTERY_MIN_INTERVAL_DAYS: f64 = 21.0;
const MASTERY_MIN_REPETITIONS: u32 = 4;

// Learning-phase retry delays per response.
const HARD_RETRY_MINUTES: i64 = 1;
const MEDIUM_RETRY_MINUTES: i64 = 10;
const EASY_RETRY_MINUTES: i64 = 60;

// Learning-phase re-queue distance: each response pushes the card behind
// the current maximum session position by this many slots.
const HARD_POSITION_STEP: u32 = 1;
const MEDIUM_POSITION_STEP: u32 = 5;
const EASY_POSITION_STEP: u32 = 10;

// Learning-phase ease adjustments.
const LEARNING_HARD_EASE_DELTA: f64 = -0.2;
const LEARNING_MEDIUM_EASE_DELTA: f64 = 0.05;
const LEARNING_EASY_EASE_DELTA: f64 = 0.1;

// Review-phase lapse penalty.
const REVIEW_HARD_EASE_DELTA: f64 = -0.2;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

//
// ─── APPLIED REVIEW ────────────────────────────────────────────────────────────
//

/// Outcome of applying a response: the next record plus the graduation event.
///
/// `graduated` is true only on the learning→review transition; it is the
/// single event callers count toward the user's daily goal.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReview {
    pub progress: CardProgress,
    pub graduated: bool,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Two-phase spaced-repetition scheduler.
///
/// Cards start in a short-cycle learning phase where each response re-queues
/// them within the session (minutes apart); once they accumulate
/// [`GRADUATION_POINTS`] of success credit they graduate to a long-cycle
/// review phase driven by an SM-2-derived interval model.
///
/// Stateless and pure: every method reads `now` exactly once from its
/// arguments and builds a new [`CardProgress`] from the old one. Safe to
/// share across threads.
///
/// # Examples
///
/// ```
/// # use vocab_core::scheduler::Scheduler;
/// # use vocab_core::model::{CardId, ReviewQuality, StudyDirection};
/// # use vocab_core::time::fixed_now;
/// let scheduler = Scheduler::new();
/// let fresh = scheduler.synthesize(CardId::new(1), StudyDirection::Forward, 0, fixed_now());
///
/// let applied = scheduler.apply_review(&fresh, ReviewQuality::Easy, 0, fixed_now());
/// assert!(applied.progress.learning_phase());
/// assert!(!applied.graduated);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synthesize the record for a card that has never been studied.
    ///
    /// The record starts in the learning phase, due by the end of the local
    /// calendar day, positioned directly behind the current queue tail.
    #[must_use]
    pub fn synthesize(
        &self,
        card_id: CardId,
        direction: StudyDirection,
        max_session_position: u32,
        now: DateTime<Utc>,
    ) -> CardProgress {
        CardProgress::new_learning(
            card_id,
            direction,
            max_session_position + 1,
            end_of_day(now),
            now,
        )
    }

    /// Apply a response to a record, producing the next record.
    ///
    /// `max_session_position` is the highest session position currently in
    /// use across the active queue; a re-queued learning card is placed
    /// behind all pending ones relative to it.
    #[must_use]
    pub fn apply_review(
        &self,
        progress: &CardProgress,
        quality: ReviewQuality,
        max_session_position: u32,
        now: DateTime<Utc>,
    ) -> AppliedReview {
        if progress.learning_phase() {
            self.apply_learning(progress, quality, max_session_position, now)
        } else {
            AppliedReview {
                progress: self.apply_reviewing(progress, quality, now),
                graduated: false,
            }
        }
    }

    /// Apply a raw quality code as received from the presentation layer.
    ///
    /// Codes outside the known range leave the record untouched and report
    /// no graduation; callers treat this as "nothing happened" rather than
    /// an error.
    #[must_use]
    pub fn apply_review_code(
        &self,
        progress: &CardProgress,
        code: u8,
        max_session_position: u32,
        now: DateTime<Utc>,
    ) -> AppliedReview {
        match ReviewQuality::from_u8(code) {
            Ok(quality) => self.apply_review(progress, quality, max_session_position, now),
            Err(_) => AppliedReview {
                progress: progress.clone(),
                graduated: false,
            },
        }
    }

    /// Sort key for queue assembly; higher sorts earlier.
    ///
    /// Learning cards map to `i32::MAX - session_position` so the lowest
    /// position is shown first and any learning card outranks any review
    /// card. Overdue review cards map to whole hours overdue; exactly-due
    /// cards get 0 and sort last.
    #[must_use]
    pub fn priority(progress: &CardProgress, now: DateTime<Utc>) -> i64 {
        if progress.learning_phase() {
            i64::from(i32::MAX) - i64::from(progress.session_position().unwrap_or(0))
        } else {
            now.signed_duration_since(progress.next_review_at())
                .num_hours()
                .max(0)
        }
    }

    //
    // ─── LEARNING PHASE ────────────────────────────────────────────────────────
    //

    fn apply_learning(
        &self,
        progress: &CardProgress,
        quality: ReviewQuality,
        max_session_position: u32,
        now: DateTime<Utc>,
    ) -> AppliedReview {
        let repetitions = progress.repetitions() + 1;

        if quality == ReviewQuality::Hard {
            let next = CardProgress {
                repetitions,
                ease_factor: clamp_ease(progress.ease_factor() + LEARNING_HARD_EASE_DELTA),
                next_review_at: now + Duration::minutes(HARD_RETRY_MINUTES),
                session_position: Some(max_session_position + HARD_POSITION_STEP),
                successful_reviews: 0.0,
                hard_presses: progress.hard_presses() + 1,
                last_review_at: Some(now),
                updated_at: now,
                ..progress.clone()
            };
            return AppliedReview {
                progress: next,
                graduated: false,
            };
        }

        let (ease_delta, position_step, retry_minutes) = match quality {
            ReviewQuality::Medium => (
                LEARNING_MEDIUM_EASE_DELTA,
                MEDIUM_POSITION_STEP,
                MEDIUM_RETRY_MINUTES,
            ),
            ReviewQuality::Easy => (
                LEARNING_EASY_EASE_DELTA,
                EASY_POSITION_STEP,
                EASY_RETRY_MINUTES,
            ),
            ReviewQuality::Hard => unreachable!("handled above"),
        };

        let ease_factor = clamp_ease(progress.ease_factor() + ease_delta);
        let successful_reviews = progress.successful_reviews() + quality.success_points();

        if successful_reviews >= GRADUATION_POINTS {
            let graduated = CardProgress {
                repetitions,
                interval_days: GRADUATION_INTERVAL_DAYS,
                ease_factor: clamp_ease(ease_factor + GRADUATION_EASE_BONUS),
                next_review_at: now + Duration::days(1),
                learning_phase: false,
                session_position: None,
                successful_reviews,
                is_mastered: is_mastered(GRADUATION_INTERVAL_DAYS, repetitions),
                last_review_at: Some(now),
                updated_at: now,
                ..progress.clone()
            };
            return AppliedReview {
                progress: graduated,
                graduated: true,
            };
        }

        let next = CardProgress {
            repetitions,
            ease_factor,
            next_review_at: now + Duration::minutes(retry_minutes),
            session_position: Some(max_session_position + position_step),
            successful_reviews,
            last_review_at: Some(now),
            updated_at: now,
            ..progress.clone()
        };
        AppliedReview {
            progress: next,
            graduated: false,
        }
    }

    //
    // ─── REVIEW PHASE ──────────────────────────────────────────────────────────
    //

    fn apply_reviewing(
        &self,
        progress: &CardProgress,
        quality: ReviewQuality,
        now: DateTime<Utc>,
    ) -> CardProgress {
        match quality {
            // Full regression. The card stays in the review phase; it does
            // not re-enter the session-scoped learning drill.
            ReviewQuality::Hard => CardProgress {
                repetitions: 1,
                interval_days: 1.0,
                ease_factor: clamp_ease(progress.ease_factor() + REVIEW_HARD_EASE_DELTA),
                next_review_at: now + Duration::days(1),
                successful_reviews: 0.0,
                hard_presses: progress.hard_presses() + 1,
                is_mastered: is_mastered(1.0, 1),
                last_review_at: Some(now),
                updated_at: now,
                ..progress.clone()
            },
            ReviewQuality::Medium => {
                let repetitions = progress.repetitions() + 1;
                let multiplier = medium_multiplier(progress.interval_days());
                let interval_days =
                    (progress.interval_days() * multiplier).min(MAX_INTERVAL_DAYS);
                let ease_factor = sm2_ease(progress.ease_factor(), 4);

                CardProgress {
                    repetitions,
                    interval_days,
                    ease_factor,
                    next_review_at: now + duration_from_days(interval_days),
                    is_mastered: is_mastered(interval_days, repetitions),
                    last_review_at: Some(now),
                    updated_at: now,
                    ..progress.clone()
                }
            }
            ReviewQuality::Easy => {
                let repetitions = progress.repetitions() + 1;
                let ease_factor = sm2_ease(progress.ease_factor(), 5);
                let interval_days = match repetitions {
                    1 => 1.0,
                    2 => 3.0,
                    3 => 7.0,
                    _ => progress.interval_days() * ease_factor,
                }
                .min(MAX_INTERVAL_DAYS);

                CardProgress {
                    repetitions,
                    interval_days,
                    ease_factor,
                    next_review_at: now + duration_from_days(interval_days),
                    is_mastered: is_mastered(interval_days, repetitions),
                    last_review_at: Some(now),
                    updated_at: now,
                    ..progress.clone()
                }
            }
        }
    }
}

/// Interval multiplier for a Medium response, keyed on interval magnitude:
/// short intervals still grow, long intervals shrink back.
fn medium_multiplier(interval_days: f64) -> f64 {
    if interval_days <= 3.0 {
        1.5
    } else if interval_days <= 7.0 {
        1.2
    } else if interval_days <= 21.0 {
        0.85
    } else {
        0.5
    }
}

/// Classic SM-2 ease update, `EF' = EF + (0.1 - (5-q)(0.08 + (5-q)*0.02))`,
/// clamped to the record bounds.
fn sm2_ease(ease: f64, quality_level: u8) -> f64 {
    let q = f64::from(quality_level);
    clamp_ease(ease + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
}

fn is_mastered(interval_days: f64, repetitions: u32) -> bool {
    interval_days >= MASTERY_MIN_INTERVAL_DAYS && repetitions >= MASTERY_MIN_REPETITIONS
}

/// Fractional-day interval as a concrete duration.
#[allow(clippy::cast_possible_truncation)]
fn duration_from_days(days: f64) -> Duration {
    Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
