use chrono::{DateTime, Utc};
use std::fmt;

use vocab_core::model::{
    CardId, CardProgress, ReviewLog, ReviewQuality, SessionSummary, StudyDirection,
};
use vocab_core::queue::StudyQueue;

use crate::error::SessionError;
use crate::study_service::PersistedReview;

use super::progress::SessionProgress;

//
// ─── SESSION REVIEW ────────────────────────────────────────────────────────────
//

/// Captures the outcome of answering one card within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReview {
    pub card_id: CardId,
    pub direction: StudyDirection,
    pub quality: ReviewQuality,
    pub graduated: bool,
    pub log_id: i64,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory walk over one study queue, round by round.
///
/// The queue is not static: answering a learning card re-queues it at a
/// higher session position, so when a round runs out the orchestrator
/// re-queries storage and installs the next round rather than assuming the
/// session is over. The session is complete only when a re-query comes back
/// empty (or the caller finishes early).
pub struct StudySession {
    entries: Vec<CardProgress>,
    current: usize,
    results: Vec<SessionReview>,
    logs: Vec<ReviewLog>,
    graduations: u32,
    round: u32,
    max_session_position: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary_id: Option<i64>,
}

impl StudySession {
    /// Create a session from the first queue round.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the queue has no cards.
    pub fn new(queue: StudyQueue, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if queue.is_empty() {
            return Err(SessionError::Empty);
        }

        let max_session_position = queue.max_session_position();
        Ok(Self {
            entries: queue.into_entries(),
            current: 0,
            results: Vec::new(),
            logs: Vec::new(),
            graduations: 0,
            round: 1,
            max_session_position,
            started_at,
            completed_at: None,
            summary_id: None,
        })
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    #[must_use]
    pub fn results(&self) -> &[SessionReview] {
        &self.results
    }

    /// Cards in the currently installed round.
    #[must_use]
    pub fn round_size(&self) -> usize {
        self.entries.len()
    }

    /// Which round is being walked, starting at 1.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Number of cards answered across all rounds.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.results.len()
    }

    /// Cards remaining in the current round.
    #[must_use]
    pub fn remaining_in_round(&self) -> usize {
        self.entries.len().saturating_sub(self.current)
    }

    /// Cards that graduated during this session.
    #[must_use]
    pub fn graduations(&self) -> u32 {
        self.graduations
    }

    /// Highest session position in use across the active queue.
    ///
    /// Fed back to the scheduler so re-queued learning cards land behind
    /// every pending one.
    #[must_use]
    pub fn max_session_position(&self) -> u32 {
        self.max_session_position
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.entries.len(),
            answered: self.answered_count(),
            remaining: self.remaining_in_round(),
            round: self.round,
            graduations: self.graduations,
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&CardProgress> {
        if self.current < self.entries.len() {
            Some(&self.entries[self.current])
        } else {
            None
        }
    }

    /// True once every card of the current round has been answered.
    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        self.current >= self.entries.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Record the persisted outcome for the current card and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session or round is already
    /// finished.
    pub fn record_review(
        &mut self,
        quality: ReviewQuality,
        persisted: &PersistedReview,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&SessionReview, SessionError> {
        if self.is_complete() || self.current_card().is_none() {
            return Err(SessionError::Completed);
        }

        let progress = &persisted.progress;
        if let Some(position) = progress.session_position() {
            self.max_session_position = self.max_session_position.max(position);
        }
        if persisted.graduated {
            self.graduations += 1;
        }

        self.logs.push(ReviewLog::new(
            progress.card_id(),
            progress.direction(),
            quality,
            reviewed_at,
        ));
        self.results.push(SessionReview {
            card_id: progress.card_id(),
            direction: progress.direction(),
            quality,
            graduated: persisted.graduated,
            log_id: persisted.log_id,
        });

        self.current += 1;
        self.results.last().ok_or(SessionError::Completed)
    }

    /// Install the next queue round after a storage re-query.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session already finished, or
    /// `SessionError::Empty` if the new round has no cards (callers should
    /// complete the session instead).
    pub fn install_round(&mut self, queue: StudyQueue) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if queue.is_empty() {
            return Err(SessionError::Empty);
        }

        self.max_session_position = self.max_session_position.max(queue.max_session_position());
        self.entries = queue.into_entries();
        self.current = 0;
        self.round += 1;
        Ok(())
    }

    /// Close the session and build its summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if already closed, or a summary
    /// error if the accumulated counts are inconsistent.
    pub fn complete(&mut self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }

        let summary = SessionSummary::from_logs(
            self.started_at,
            completed_at,
            &self.logs,
            self.graduations,
        )?;
        self.completed_at = Some(completed_at);
        Ok(summary)
    }

    pub(crate) fn set_summary_id(&mut self, id: i64) {
        self.summary_id = Some(id);
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("entries_len", &self.entries.len())
            .field("current", &self.current)
            .field("results_len", &self.results.len())
            .field("round", &self.round)
            .field("graduations", &self.graduations)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::queue::QueueBuilder;
    use vocab_core::scheduler::Scheduler;
    use vocab_core::time::fixed_now;

    fn learning(id: u64, position: u32) -> CardProgress {
        CardProgress::new_learning(
            CardId::new(id),
            StudyDirection::Forward,
            position,
            fixed_now(),
            fixed_now(),
        )
    }

    fn queue_of(records: Vec<CardProgress>) -> StudyQueue {
        QueueBuilder::new(fixed_now()).build(records, Vec::new())
    }

    fn persisted_for(card: &CardProgress, quality: ReviewQuality, max: u32) -> PersistedReview {
        let applied = Scheduler::new().apply_review(card, quality, max, fixed_now());
        PersistedReview {
            progress: applied.progress,
            log_id: 1,
            graduated: applied.graduated,
            daily_graduations: if applied.graduated { Some(1) } else { None },
        }
    }

    #[test]
    fn empty_queue_is_rejected() {
        let err = StudySession::new(queue_of(Vec::new()), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn session_walks_round_in_queue_order() {
        let mut session = StudySession::new(
            queue_of(vec![learning(1, 5), learning(2, 1)]),
            fixed_now(),
        )
        .unwrap();

        // Position 1 sorts first.
        assert_eq!(session.current_card().unwrap().card_id(), CardId::new(2));

        let card = session.current_card().unwrap().clone();
        let persisted = persisted_for(&card, ReviewQuality::Medium, session.max_session_position());
        session
            .record_review(ReviewQuality::Medium, &persisted, fixed_now())
            .unwrap();

        assert_eq!(session.current_card().unwrap().card_id(), CardId::new(1));
        assert!(!session.is_round_complete());
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn requeued_positions_raise_the_maximum() {
        let mut session = StudySession::new(queue_of(vec![learning(1, 3)]), fixed_now()).unwrap();
        assert_eq!(session.max_session_position(), 3);

        let card = session.current_card().unwrap().clone();
        // Easy pushes the card 10 slots behind the current maximum.
        let persisted = persisted_for(&card, ReviewQuality::Easy, session.max_session_position());
        session
            .record_review(ReviewQuality::Easy, &persisted, fixed_now())
            .unwrap();

        assert_eq!(session.max_session_position(), 13);
        assert!(session.is_round_complete());
        assert!(!session.is_complete());
    }

    #[test]
    fn install_round_resets_walk_and_counts_rounds() {
        let mut session = StudySession::new(queue_of(vec![learning(1, 1)]), fixed_now()).unwrap();

        let card = session.current_card().unwrap().clone();
        let persisted = persisted_for(&card, ReviewQuality::Hard, 1);
        session
            .record_review(ReviewQuality::Hard, &persisted, fixed_now())
            .unwrap();
        assert!(session.is_round_complete());

        session
            .install_round(queue_of(vec![persisted.progress.clone()]))
            .unwrap();
        assert_eq!(session.round(), 2);
        assert!(!session.is_round_complete());
        assert_eq!(session.remaining_in_round(), 1);

        let err = session.install_round(queue_of(Vec::new())).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn complete_builds_summary_and_locks_session() {
        let mut session = StudySession::new(
            queue_of(vec![learning(1, 1), learning(2, 2)]),
            fixed_now(),
        )
        .unwrap();

        for quality in [ReviewQuality::Easy, ReviewQuality::Hard] {
            let card = session.current_card().unwrap().clone();
            let persisted = persisted_for(&card, quality, session.max_session_position());
            session.record_review(quality, &persisted, fixed_now()).unwrap();
        }

        let done_at = fixed_now() + chrono::Duration::minutes(3);
        let summary = session.complete(done_at).unwrap();
        assert_eq!(summary.total_reviews(), 2);
        assert_eq!(summary.easy(), 1);
        assert_eq!(summary.hard(), 1);
        assert_eq!(summary.graduations(), 0);
        assert!(session.is_complete());

        let err = session.complete(done_at).unwrap_err();
        assert!(matches!(err, SessionError::Completed));

        let card = learning(3, 1);
        let persisted = persisted_for(&card, ReviewQuality::Easy, 1);
        let err = session
            .record_review(ReviewQuality::Easy, &persisted, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Completed));
    }
}
