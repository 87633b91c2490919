use chrono::{DateTime, Utc};

use vocab_core::model::{CardId, CardProgress, StudyDirection};

use super::{SqliteRepository, mapping};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, progress: &CardProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (
                card_id, direction, repetitions, interval_days, ease_factor,
                next_review_at, last_review_at, is_selected, is_mastered,
                learning_phase, session_position, hard_presses,
                successful_reviews, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(card_id, direction) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                repetitions = excluded.repetitions,
                interval_days = excluded.interval_days,
                ease_factor = excluded.ease_factor,
                next_review_at = excluded.next_review_at,
                last_review_at = excluded.last_review_at,
                is_selected = excluded.is_selected,
                is_mastered = excluded.is_mastered,
                learning_phase = excluded.learning_phase,
                session_position = excluded.session_position,
                hard_presses = excluded.hard_presses,
                successful_reviews = excluded.successful_reviews,
                updated_at = excluded.updated_at
            ",
        )
        .bind(mapping::card_id_to_i64(progress.card_id())?)
        .bind(progress.direction().as_str())
        .bind(i64::from(progress.repetitions()))
        .bind(progress.interval_days())
        .bind(progress.ease_factor())
        .bind(progress.next_review_at())
        .bind(progress.last_review_at())
        .bind(progress.is_selected())
        .bind(progress.is_mastered())
        .bind(progress.learning_phase())
        .bind(progress.session_position().map(i64::from))
        .bind(i64::from(progress.hard_presses()))
        .bind(progress.successful_reviews())
        .bind(progress.created_at())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_progress(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Option<CardProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                card_id, direction, repetitions, interval_days, ease_factor,
                next_review_at, last_review_at, is_selected, is_mastered,
                learning_phase, session_position, hard_presses,
                successful_reviews, created_at, updated_at
            FROM progress
            WHERE card_id = ?1 AND direction = ?2
            ",
        )
        .bind(mapping::card_id_to_i64(card_id)?)
        .bind(direction.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_progress_row(&r)).transpose()
    }

    async fn learning_progress(&self) -> Result<Vec<CardProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                card_id, direction, repetitions, interval_days, ease_factor,
                next_review_at, last_review_at, is_selected, is_mastered,
                learning_phase, session_position, hard_presses,
                successful_reviews, created_at, updated_at
            FROM progress
            WHERE learning_phase = 1 AND is_selected = 1
            ORDER BY session_position ASC, card_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(mapping::map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CardProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                card_id, direction, repetitions, interval_days, ease_factor,
                next_review_at, last_review_at, is_selected, is_mastered,
                learning_phase, session_position, hard_presses,
                successful_reviews, created_at, updated_at
            FROM progress
            WHERE learning_phase = 0 AND is_selected = 1 AND next_review_at <= ?1
            ORDER BY next_review_at ASC, card_id ASC
            LIMIT ?2
            ",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(mapping::map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn set_selected(
        &self,
        card_id: CardId,
        direction: StudyDirection,
        selected: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE progress
            SET is_selected = ?3, updated_at = ?4
            WHERE card_id = ?1 AND direction = ?2
            ",
        )
        .bind(mapping::card_id_to_i64(card_id)?)
        .bind(direction.as_str())
        .bind(selected)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
