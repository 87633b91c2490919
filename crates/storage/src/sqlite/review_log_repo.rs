use vocab_core::model::{CardId, CardProgress, StudyDirection};

use super::{SqliteRepository, mapping};
use crate::repository::{
    ReviewLogRecord, ReviewLogRepository, ReviewPersistence, StorageError,
};

#[async_trait::async_trait]
impl ReviewLogRepository for SqliteRepository {
    async fn append_log(&self, log: ReviewLogRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO review_logs (
                    card_id, direction, quality, reviewed_at,
                    interval_days, ease_factor, learning_phase, graduated, next_review_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(mapping::card_id_to_i64(log.card_id)?)
        .bind(log.direction.as_str())
        .bind(mapping::quality_to_i64(log.quality))
        .bind(log.reviewed_at)
        .bind(log.interval_days)
        .bind(log.ease_factor)
        .bind(log.learning_phase)
        .bind(log.graduated)
        .bind(log.next_review_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn logs_for_card(
        &self,
        card_id: CardId,
        direction: StudyDirection,
    ) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, card_id, direction, quality, reviewed_at,
                    interval_days, ease_factor, learning_phase, graduated, next_review_at
                FROM review_logs
                WHERE card_id = ?1 AND direction = ?2
                ORDER BY reviewed_at ASC, id ASC
            ",
        )
        .bind(mapping::card_id_to_i64(card_id)?)
        .bind(direction.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(mapping::map_review_log_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ReviewPersistence for SqliteRepository {
    async fn apply_review(
        &self,
        progress: &CardProgress,
        log: ReviewLogRecord,
    ) -> Result<i64, StorageError> {
        if log.card_id != progress.card_id() || log.direction != progress.direction() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

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
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
                INSERT INTO review_logs (
                    card_id, direction, quality, reviewed_at,
                    interval_days, ease_factor, learning_phase, graduated, next_review_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(mapping::card_id_to_i64(log.card_id)?)
        .bind(log.direction.as_str())
        .bind(mapping::quality_to_i64(log.quality))
        .bind(log.reviewed_at)
        .bind(log.interval_days)
        .bind(log.ease_factor)
        .bind(log.learning_phase)
        .bind(log.graduated)
        .bind(log.next_review_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }
}
