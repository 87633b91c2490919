use std::sync::Arc;

use storage::repository::{
    DailyProgressRepository, ProgressRepository, ReviewPersistence, SessionSummaryRepository,
};
use vocab_core::Clock;
use vocab_core::model::{CardId, ReviewQuality, StudyDirection, StudySettings};

use crate::error::SessionError;
use crate::study_service::StudyService;

use super::queries::SessionQueries;
use super::service::{SessionReview, StudySession};

/// Result of answering a single card in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub review: SessionReview,
    pub is_complete: bool,
    pub summary_id: Option<i64>,
}

/// Orchestrates session start, persisted answering, and round re-queries.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    reviews: Arc<dyn ReviewPersistence>,
    daily: Arc<dyn DailyProgressRepository>,
    summaries: Arc<dyn SessionSummaryRepository>,
    settings: StudySettings,
    shuffle_new: bool,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        reviews: Arc<dyn ReviewPersistence>,
        daily: Arc<dyn DailyProgressRepository>,
        summaries: Arc<dyn SessionSummaryRepository>,
        settings: StudySettings,
    ) -> Self {
        Self {
            clock,
            progress,
            reviews,
            daily,
            summaries,
            settings,
            shuffle_new: false,
        }
    }

    #[must_use]
    pub fn with_shuffle_new(mut self, shuffle_new: bool) -> Self {
        self.shuffle_new = shuffle_new;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &StudySettings {
        &self.settings
    }

    /// Start a new session, introducing never-studied candidates.
    ///
    /// `new_candidates` come from the content layer (word list, selection
    /// UI); pairs that already have a progress record are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if nothing is eligible, or storage
    /// failures.
    pub async fn start_session(
        &self,
        new_candidates: &[(CardId, StudyDirection)],
    ) -> Result<StudySession, SessionError> {
        let now = self.clock.now();
        let queue = SessionQueries::build_queue_from_storage(
            self.progress.as_ref(),
            &self.settings,
            new_candidates,
            self.shuffle_new,
            now,
        )
        .await?;

        tracing::info!(
            total = queue.total(),
            learning = queue.learning_count(),
            reviews = queue.review_count(),
            "session started"
        );

        StudySession::new(queue, now)
    }

    /// Answer the current card: persist the transition, track the daily
    /// goal, and re-query the queue when the round is exhausted.
    ///
    /// When a re-query comes back empty the session is completed and its
    /// summary persisted; the summary ID is returned in the result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is finished, or
    /// review/persistence failures.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        quality: ReviewQuality,
    ) -> Result<SessionAnswerResult, SessionError> {
        if session.is_complete() {
            return Err(SessionError::Completed);
        }
        let Some(card) = session.current_card() else {
            return Err(SessionError::Completed);
        };
        let card_id = card.card_id();
        let direction = card.direction();

        let study = StudyService::new().with_clock(self.clock);
        let reviewed_at = self.clock.now();
        let persisted = study
            .review_by_id(
                card_id,
                direction,
                quality,
                session.max_session_position(),
                self.progress.as_ref(),
                self.reviews.as_ref(),
                self.daily.as_ref(),
            )
            .await
            .map_err(SessionError::Study)?;

        let review = session
            .record_review(quality, &persisted, reviewed_at)?
            .clone();

        let mut summary_id = None;
        if session.is_round_complete() {
            summary_id = self.advance_round(session).await?;
        }

        Ok(SessionAnswerResult {
            review,
            is_complete: session.is_complete(),
            summary_id,
        })
    }

    /// Terminate the session before the queue drains and persist the
    /// summary of what was answered so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished.
    pub async fn finish(&self, session: &mut StudySession) -> Result<i64, SessionError> {
        let now = self.clock.now();
        let summary = session.complete(now)?;
        let id = self.summaries.append_summary(&summary).await?;
        session.set_summary_id(id);

        tracing::info!(
            summary_id = id,
            total = summary.total_reviews(),
            graduations = summary.graduations(),
            "session finished early"
        );
        Ok(id)
    }

    /// Re-query storage for the next round.
    ///
    /// Learning cards re-queued at higher positions keep the session alive;
    /// an empty re-query means the session is genuinely done.
    async fn advance_round(
        &self,
        session: &mut StudySession,
    ) -> Result<Option<i64>, SessionError> {
        let now = self.clock.now();
        let queue = SessionQueries::build_queue_from_storage(
            self.progress.as_ref(),
            &self.settings,
            &[],
            false,
            now,
        )
        .await?;

        if queue.is_empty() {
            let summary = session.complete(now)?;
            let id = self.summaries.append_summary(&summary).await?;
            session.set_summary_id(id);

            tracing::info!(
                summary_id = id,
                total = summary.total_reviews(),
                graduations = summary.graduations(),
                "session completed"
            );
            return Ok(Some(id));
        }

        tracing::debug!(
            round = session.round() + 1,
            pending = queue.total(),
            "queue re-queried for next round"
        );
        session.install_round(queue)?;
        Ok(None)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryRepository, SessionSummaryRepository};
    use vocab_core::time::{fixed_clock, fixed_now, local_day};

    fn loop_service(repo: &InMemoryRepository) -> SessionLoopService {
        SessionLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            StudySettings::default(),
        )
    }

    #[tokio::test]
    async fn empty_storage_and_no_candidates_yields_empty_session() {
        let repo = InMemoryRepository::new();
        let err = loop_service(&repo).start_session(&[]).await.unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn single_card_drills_until_graduation() {
        let repo = InMemoryRepository::new();
        let service = loop_service(&repo);

        let mut session = service
            .start_session(&[(CardId::new(1), StudyDirection::Forward)])
            .await
            .unwrap();
        assert_eq!(session.round_size(), 1);

        // Easy x3 graduates on the third answer; the re-query then finds
        // nothing due and the session completes.
        let first = service
            .answer_current(&mut session, ReviewQuality::Easy)
            .await
            .unwrap();
        assert!(!first.is_complete);
        assert_eq!(session.round(), 2);

        let second = service
            .answer_current(&mut session, ReviewQuality::Easy)
            .await
            .unwrap();
        assert!(!second.is_complete);

        let third = service
            .answer_current(&mut session, ReviewQuality::Easy)
            .await
            .unwrap();
        assert!(third.review.graduated);
        assert!(third.is_complete);

        let summary_id = third.summary_id.expect("summary persisted");
        let summary = repo.get_summary(summary_id).await.unwrap();
        assert_eq!(summary.total_reviews(), 3);
        assert_eq!(summary.easy(), 3);
        assert_eq!(summary.graduations(), 1);

        assert_eq!(
            repo.graduations_on(local_day(fixed_now())).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn hard_answers_keep_the_session_alive() {
        let repo = InMemoryRepository::new();
        let service = loop_service(&repo);

        let mut session = service
            .start_session(&[(CardId::new(1), StudyDirection::Forward)])
            .await
            .unwrap();

        for round in 1..=4 {
            assert_eq!(session.round(), round);
            let result = service
                .answer_current(&mut session, ReviewQuality::Hard)
                .await
                .unwrap();
            assert!(!result.is_complete);
            assert!(!result.review.graduated);
        }

        let stored = repo
            .get_progress(CardId::new(1), StudyDirection::Forward)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.learning_phase());
        assert_eq!(stored.hard_presses(), 4);
        assert_eq!(stored.successful_reviews(), 0.0);
    }

    #[tokio::test]
    async fn finish_persists_partial_summary() {
        let repo = InMemoryRepository::new();
        let service = loop_service(&repo);

        let mut session = service
            .start_session(&[
                (CardId::new(1), StudyDirection::Forward),
                (CardId::new(2), StudyDirection::Forward),
            ])
            .await
            .unwrap();

        service
            .answer_current(&mut session, ReviewQuality::Medium)
            .await
            .unwrap();

        let summary_id = service.finish(&mut session).await.unwrap();
        assert_eq!(session.summary_id(), Some(summary_id));
        assert!(session.is_complete());

        let summary = repo.get_summary(summary_id).await.unwrap();
        assert_eq!(summary.total_reviews(), 1);
        assert_eq!(summary.medium(), 1);

        let err = service.finish(&mut session).await.unwrap_err();
        assert!(matches!(err, SessionError::Completed));
    }

    #[tokio::test]
    async fn answering_a_completed_session_is_rejected() {
        let repo = InMemoryRepository::new();
        let service = loop_service(&repo);

        let mut session = service
            .start_session(&[(CardId::new(1), StudyDirection::Forward)])
            .await
            .unwrap();
        service.finish(&mut session).await.unwrap();

        let err = service
            .answer_current(&mut session, ReviewQuality::Easy)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Completed));
    }
}
