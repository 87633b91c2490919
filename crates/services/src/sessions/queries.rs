use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;

use storage::repository::ProgressRepository;
use vocab_core::model::{CardId, CardProgress, StudyDirection, StudySettings};
use vocab_core::queue::{QueueBuilder, StudyQueue};
use vocab_core::scheduler::Scheduler;

use crate::error::SessionError;

/// Storage-backed queue assembly.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Build a queue round from repository data.
    ///
    /// Fetches every learning-phase record (always eligible) and the due
    /// review records, then introduces up to `new_cards_per_session` of the
    /// caller-supplied candidates that have no record yet. Introduced cards
    /// are synthesized behind the current queue tail and persisted
    /// immediately, so a card's record exists from its first exposure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn build_queue_from_storage(
        progress: &dyn ProgressRepository,
        settings: &StudySettings,
        new_candidates: &[(CardId, StudyDirection)],
        shuffle_new: bool,
        now: DateTime<Utc>,
    ) -> Result<StudyQueue, SessionError> {
        let scheduler = Scheduler::new();
        let mut learning = progress.learning_progress().await?;
        let due = progress
            .due_reviews(now, settings.session_size())
            .await?;

        let mut max_position = learning
            .iter()
            .filter_map(CardProgress::session_position)
            .max()
            .unwrap_or(0);

        let mut pool: Vec<(CardId, StudyDirection)> = new_candidates.to_vec();
        if shuffle_new {
            pool.as_mut_slice().shuffle(&mut rng());
        }

        let new_cap = usize::try_from(settings.new_cards_per_session()).unwrap_or(usize::MAX);
        let mut introduced = 0_usize;
        for (card_id, direction) in pool {
            if introduced >= new_cap {
                break;
            }
            if progress.get_progress(card_id, direction).await?.is_some() {
                continue;
            }

            let record = scheduler.synthesize(card_id, direction, max_position, now);
            max_position = record.session_position().unwrap_or(max_position);
            progress.upsert_progress(&record).await?;
            learning.push(record);
            introduced += 1;
        }

        Ok(QueueBuilder::new(now).build(learning, due))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use vocab_core::time::fixed_now;

    fn candidates(ids: &[u64]) -> Vec<(CardId, StudyDirection)> {
        ids.iter()
            .map(|id| (CardId::new(*id), StudyDirection::Forward))
            .collect()
    }

    #[tokio::test]
    async fn introduces_candidates_up_to_the_cap() {
        let repo = InMemoryRepository::new();
        let settings = StudySettings::new(10, 2, 20, false).unwrap();

        let queue = SessionQueries::build_queue_from_storage(
            &repo,
            &settings,
            &candidates(&[1, 2, 3, 4]),
            false,
            fixed_now(),
        )
        .await
        .unwrap();

        assert_eq!(queue.total(), 2);
        assert_eq!(queue.learning_count(), 2);

        // Introduced records are durable immediately.
        assert!(
            repo.get_progress(CardId::new(1), StudyDirection::Forward)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            repo.get_progress(CardId::new(3), StudyDirection::Forward)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn skips_candidates_that_already_have_records() {
        let repo = InMemoryRepository::new();
        let settings = StudySettings::new(10, 5, 20, false).unwrap();

        let first = SessionQueries::build_queue_from_storage(
            &repo,
            &settings,
            &candidates(&[1, 2]),
            false,
            fixed_now(),
        )
        .await
        .unwrap();
        assert_eq!(first.total(), 2);

        // Re-building with the same candidates introduces nothing new.
        let second = SessionQueries::build_queue_from_storage(
            &repo,
            &settings,
            &candidates(&[1, 2]),
            false,
            fixed_now(),
        )
        .await
        .unwrap();
        assert_eq!(second.total(), 2);
        assert_eq!(second.learning_count(), 2);
    }

    #[tokio::test]
    async fn introduced_cards_line_up_behind_existing_learning() {
        let repo = InMemoryRepository::new();
        let settings = StudySettings::new(10, 5, 20, false).unwrap();

        let existing = CardProgress::new_learning(
            CardId::new(1),
            StudyDirection::Forward,
            4,
            fixed_now(),
            fixed_now(),
        );
        repo.upsert_progress(&existing).await.unwrap();

        let queue = SessionQueries::build_queue_from_storage(
            &repo,
            &settings,
            &candidates(&[2, 3]),
            false,
            fixed_now(),
        )
        .await
        .unwrap();

        let positions: Vec<Option<u32>> = queue
            .entries()
            .iter()
            .map(CardProgress::session_position)
            .collect();
        assert_eq!(positions, vec![Some(4), Some(5), Some(6)]);
    }
}
