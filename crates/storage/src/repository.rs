use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use vocab_core::model::{
    CardId, CardProgress, ReviewQuality, SessionSummary, StudyDirection, StudySettings,
};
use vocab_core::scheduler::AppliedReview;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one processed response.
///
/// Captures the scheduling state the response produced so history queries
/// never need to replay the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLogRecord {
    pub id: Option<i64>,
    pub card_id: CardId,
    pub direction: StudyDirection,
    pub quality: ReviewQuality,
    pub reviewed_at: DateTime<Utc>,
    pub interval_days: f64,
    pub ease_factor: f64,
    pub learning_phase: bool,
    pub graduated: bool,
    pub next_review_at: DateTime<Utc>,
}

impl ReviewLogRecord {
    /// Build the log row for a just-applied response.
    #[must_use]
    pub fn from_applied(
        quality: ReviewQuality,
        applied: &AppliedReview,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        let progress = &applied.progress;
        Self {
            id: None,
            card_id: progress.card_id(),
            direction: progress.direction(),
            quality,
            reviewed_at,
            interval_days: progress.interval_days(),
            ease_factor: progress.ease_factor(),
            learning_phase: progress.learning_phase(),
            graduated: applied.graduated,
            next_review_at: progress.next_review_at(),
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for progress records.
///
/// The scheduler core only ever asks for "all learning-phase records" and
/// "review-phase records due by `t`"; anything fancier stays behind this
/// boundary.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist or update a progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &CardProgress) -> Result<(), StorageError>;

    /// Fetch the record for one card/direction pair, if it exists.
    ///
    /// Callers synthesize a default record on `None`; a missing record is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_progress(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Option<CardProgress>, StorageError>;

    /// All selected learning-phase records, ordered by session position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn learning_progress(&self) -> Result<Vec<CardProgress>, StorageError>;

    /// Selected review-phase records due by `now`, most overdue first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CardProgress>, StorageError>;

    /// Flip the selection flag: logical retirement, never deletion.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record exists for the pair.
    async fn set_selected(
        &self,
        card_id: CardId,
        direction: StudyDirection,
        selected: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ReviewLogRepository: Send + Sync {
    /// Append a review log row, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_log(&self, log: ReviewLogRecord) -> Result<i64, StorageError>;

    /// All log rows for one card/direction pair, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn logs_for_card(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Vec<ReviewLogRecord>, StorageError>;
}

/// Atomic record + log write used by the session orchestrator.
#[async_trait]
pub trait ReviewPersistence: Send + Sync {
    /// Persist the updated record and its log row together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the log does not belong to the
    /// record, or other storage errors.
    async fn apply_review(
        &self,
        progress: &CardProgress,
        log: ReviewLogRecord,
    ) -> Result<i64, StorageError>;
}

/// Graduations-per-day counter backing the daily goal.
#[async_trait]
pub trait DailyProgressRepository: Send + Sync {
    /// Add one graduation to `day` and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn increment_graduations(&self, day: NaiveDate) -> Result<u32, StorageError>;

    /// Graduations recorded on `day`; zero if none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn graduations_on(&self, day: NaiveDate) -> Result<u32, StorageError>;
}

#[async_trait]
pub trait SessionSummaryRepository: Send + Sync {
    /// Persist a completed session summary, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// Summaries completed within the given bounds, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_summaries(
        &self,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError>;
}

/// Single-row study settings persistence.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load the stored settings, if any were saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_settings(&self) -> Result<Option<StudySettings>, StorageError>;

    /// Persist the settings, replacing any previous row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &StudySettings) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(CardId, StudyDirection), CardProgress>>>,
    logs: Arc<Mutex<Vec<ReviewLogRecord>>>,
    daily: Arc<Mutex<HashMap<NaiveDate, u32>>>,
    summaries: Arc<Mutex<Vec<SessionSummary>>>,
    settings: Arc<Mutex<Option<StudySettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, progress: &CardProgress) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        guard.insert(
            (progress.card_id(), progress.direction()),
            progress.clone(),
        );
        Ok(())
    }

    async fn get_progress(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Option<CardProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(&(card_id, direction)).cloned())
    }

    async fn learning_progress(&self) -> Result<Vec<CardProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        let mut out: Vec<CardProgress> = guard
            .values()
            .filter(|p| p.learning_phase() && p.is_selected())
            .cloned()
            .collect();
        out.sort_by_key(|p| (p.session_position(), p.card_id().value()));
        Ok(out)
    }

    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CardProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        let mut out: Vec<CardProgress> = guard
            .values()
            .filter(|p| !p.learning_phase() && p.is_selected() && p.next_review_at() <= now)
            .cloned()
            .collect();
        out.sort_by_key(|p| (p.next_review_at(), p.card_id().value()));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn set_selected(
        &self,
        card_id: CardId,
        direction: StudyDirection,
        selected: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        match guard.get(&(card_id, direction)) {
            Some(existing) => {
                let updated = existing.clone().with_selected(selected, now);
                guard.insert((card_id, direction), updated);
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }
}

#[async_trait]
impl ReviewLogRepository for InMemoryRepository {
    async fn append_log(&self, mut log: ReviewLogRecord) -> Result<i64, StorageError> {
        let mut guard = self.logs.lock().map_err(lock_err)?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("log id overflow".into()))?;
        log.id = Some(id);
        guard.push(log);
        Ok(id)
    }

    async fn logs_for_card(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let guard = self.logs.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|l| l.card_id == card_id && l.direction == direction)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewPersistence for InMemoryRepository {
    async fn apply_review(
        &self,
        progress: &CardProgress,
        log: ReviewLogRecord,
    ) -> Result<i64, StorageError> {
        if log.card_id != progress.card_id() || log.direction != progress.direction() {
            return Err(StorageError::Conflict);
        }
        self.upsert_progress(progress).await?;
        self.append_log(log).await
    }
}

#[async_trait]
impl DailyProgressRepository for InMemoryRepository {
    async fn increment_graduations(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let mut guard = self.daily.lock().map_err(lock_err)?;
        let count = guard.entry(day).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }

    async fn graduations_on(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let guard = self.daily.lock().map_err(lock_err)?;
        Ok(guard.get(&day).copied().unwrap_or(0))
    }
}

#[async_trait]
impl SessionSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self.summaries.lock().map_err(lock_err)?;
        guard.push(summary.clone());
        i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("summary id overflow".into()))
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self.summaries.lock().map_err(lock_err)?;
        let index = usize::try_from(id.checked_sub(1).ok_or(StorageError::NotFound)?)
            .map_err(|_| StorageError::NotFound)?;
        guard.get(index).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let guard = self.summaries.lock().map_err(lock_err)?;
        let mut out: Vec<SessionSummary> = guard
            .iter()
            .filter(|s| completed_from.is_none_or(|from| s.completed_at() >= from))
            .filter(|s| completed_until.is_none_or(|until| s.completed_at() <= until))
            .cloned()
            .collect();
        out.sort_by_key(|s| std::cmp::Reverse(s.completed_at()));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<StudySettings>, StorageError> {
        let guard = self.settings.lock().map_err(lock_err)?;
        Ok(guard.clone())
    }

    async fn save_settings(&self, settings: &StudySettings) -> Result<(), StorageError> {
        let mut guard = self.settings.lock().map_err(lock_err)?;
        *guard = Some(settings.clone());
        Ok(())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub logs: Arc<dyn ReviewLogRepository>,
    pub reviews: Arc<dyn ReviewPersistence>,
    pub daily: Arc<dyn DailyProgressRepository>,
    pub summaries: Arc<dyn SessionSummaryRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo.clone()),
            logs: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            daily: Arc::new(repo.clone()),
            summaries: Arc::new(repo.clone()),
            settings: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
