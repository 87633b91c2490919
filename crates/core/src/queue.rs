use chrono::{DateTime, Utc};
use std::cmp::Reverse;

use crate::model::CardProgress;
use crate::scheduler::Scheduler;

//
// ─── STUDY QUEUE ───────────────────────────────────────────────────────────────
//

/// Ordered presentation sequence for one queue round.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyQueue {
    entries: Vec<CardProgress>,
    learning_count: usize,
    review_count: usize,
}

impl StudyQueue {
    /// Total number of cards in this round.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is eligible for presentation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn learning_count(&self) -> usize {
        self.learning_count
    }

    #[must_use]
    pub fn review_count(&self) -> usize {
        self.review_count
    }

    #[must_use]
    pub fn entries(&self) -> &[CardProgress] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<CardProgress> {
        self.entries
    }

    /// Highest session position currently in use across the queue.
    ///
    /// Callers pass this back to the scheduler so re-queued learning cards
    /// land behind every pending one.
    #[must_use]
    pub fn max_session_position(&self) -> u32 {
        self.entries
            .iter()
            .filter_map(CardProgress::session_position)
            .max()
            .unwrap_or(0)
    }
}

//
// ─── QUEUE BUILDER ─────────────────────────────────────────────────────────────
//

/// Assembles one presentation round from already-fetched records.
///
/// Pure: no I/O and no filtering by time window. Storage supplies "all
/// learning-phase records" and "review-phase records due by `now`". The
/// builder only sorts, descending by [`Scheduler::priority`], so learning
/// cards (keyed near `i32::MAX`) precede overdue reviews and the most
/// overdue review comes first. Ties keep insertion order.
pub struct QueueBuilder {
    now: DateTime<Utc>,
}

impl QueueBuilder {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Build an ordered round from learning and due review records.
    #[must_use]
    pub fn build(
        self,
        learning: impl IntoIterator<Item = CardProgress>,
        due_reviews: impl IntoIterator<Item = CardProgress>,
    ) -> StudyQueue {
        let mut entries: Vec<CardProgress> = learning.into_iter().collect();
        let learning_count = entries.len();
        entries.extend(due_reviews);
        let review_count = entries.len() - learning_count;

        // Stable sort: equal priorities preserve insertion order.
        let now = self.now;
        entries.sort_by_key(|progress| Reverse(Scheduler::priority(progress, now)));

        StudyQueue {
            entries,
            learning_count,
            review_count,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
