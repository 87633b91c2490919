use chrono::{DateTime, Utc};

use storage::repository::{
    DailyProgressRepository, ProgressRepository, ReviewLogRecord, ReviewPersistence,
};
use vocab_core::{
    model::{CardId, CardProgress, ReviewQuality, StudyDirection},
    scheduler::{AppliedReview, Scheduler},
    time::{Clock, local_day},
};

use crate::error::StudyServiceError;

//
// ─── PERSISTED REVIEW ──────────────────────────────────────────────────────────
//

/// Result of a persisted review: updated record, log ID, and goal bookkeeping.
///
/// `daily_graduations` carries the day's new graduation total when this
/// response graduated the card; it is `None` otherwise, since only phase
/// transitions count toward the daily goal.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedReview {
    pub progress: CardProgress,
    pub log_id: i64,
    pub graduated: bool,
    pub daily_graduations: Option<u32>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a user's response to a progress record.
///
/// Wraps the pure scheduler with a clock read taken once per call and the
/// persistence handshake: record + log are written together, and a
/// graduation bumps the daily-progress counter.
pub struct StudyService {
    clock: Clock,
    scheduler: Scheduler,
}

impl StudyService {
    /// Create a study service with a real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    /// Apply a response to an in-memory record without persisting.
    #[must_use]
    pub fn review_progress(
        &self,
        progress: &CardProgress,
        quality: ReviewQuality,
        max_session_position: u32,
        reviewed_at: DateTime<Utc>,
    ) -> AppliedReview {
        self.scheduler
            .apply_review(progress, quality, max_session_position, reviewed_at)
    }

    /// Apply a response to an in-memory record and persist record + log.
    ///
    /// `progress` is only updated once persistence succeeds; on failure the
    /// caller's record is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if persistence fails.
    pub async fn review_persisted(
        &self,
        progress: &mut CardProgress,
        quality: ReviewQuality,
        max_session_position: u32,
        reviewed_at: DateTime<Utc>,
        reviews: &dyn ReviewPersistence,
    ) -> Result<(AppliedReview, i64), StudyServiceError> {
        let applied = self.review_progress(progress, quality, max_session_position, reviewed_at);
        let log = ReviewLogRecord::from_applied(quality, &applied, reviewed_at);

        let log_id = reviews.apply_review(&applied.progress, log).await?;
        *progress = applied.progress.clone();

        tracing::debug!(
            card = %progress.card_id(),
            direction = %progress.direction(),
            quality = ?quality,
            graduated = applied.graduated,
            "applied review"
        );

        Ok((applied, log_id))
    }

    /// Fetch (or synthesize) the record for a card, apply a response, and
    /// persist everything.
    ///
    /// A card studied for the first time has no record yet; it is
    /// synthesized with defaults and placed behind the active queue before
    /// the response is applied. A graduation increments the daily-progress
    /// counter for the local calendar day.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if lookup or persistence fails.
    pub async fn review_by_id(
        &self,
        card_id: CardId,
        direction: StudyDirection,
        quality: ReviewQuality,
        max_session_position: u32,
        progress_repo: &dyn ProgressRepository,
        reviews: &dyn ReviewPersistence,
        daily: &dyn DailyProgressRepository,
    ) -> Result<PersistedReview, StudyServiceError> {
        let reviewed_at = self.now();

        let mut progress = match progress_repo.get_progress(card_id, direction).await? {
            Some(existing) => existing,
            None => self
                .scheduler
                .synthesize(card_id, direction, max_session_position, reviewed_at),
        };

        let (applied, log_id) = self
            .review_persisted(
                &mut progress,
                quality,
                max_session_position,
                reviewed_at,
                reviews,
            )
            .await?;

        let daily_graduations = if applied.graduated {
            let count = daily
                .increment_graduations(local_day(reviewed_at))
                .await?;
            tracing::info!(
                card = %card_id,
                direction = %direction,
                today = count,
                "card graduated"
            );
            Some(count)
        } else {
            None
        };

        Ok(PersistedReview {
            progress,
            log_id,
            graduated: applied.graduated,
            daily_graduations,
        })
    }
}

impl Default for StudyService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
