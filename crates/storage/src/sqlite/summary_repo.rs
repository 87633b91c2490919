use chrono::{DateTime, Utc};

use vocab_core::model::SessionSummary;

use super::{SqliteRepository, mapping};
use crate::repository::{SessionSummaryRepository, StorageError};

#[async_trait::async_trait]
impl SessionSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO session_summaries (
                    started_at, completed_at, total_reviews,
                    hard, medium, easy, graduations
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.total_reviews()))
        .bind(i64::from(summary.hard()))
        .bind(i64::from(summary.medium()))
        .bind(i64::from(summary.easy()))
        .bind(i64::from(summary.graduations()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    started_at, completed_at, total_reviews,
                    hard, medium, easy, graduations
                FROM session_summaries
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        mapping::map_summary_row(&row)
    }

    async fn list_summaries(
        &self,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    started_at, completed_at, total_reviews,
                    hard, medium, easy, graduations
                FROM session_summaries
                WHERE (?1 IS NULL OR completed_at >= ?1)
                  AND (?2 IS NULL OR completed_at <= ?2)
                ORDER BY completed_at DESC, id DESC
                LIMIT ?3
            ",
        )
        .bind(completed_from)
        .bind(completed_until)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(mapping::map_summary_row(&row)?);
        }
        Ok(out)
    }
}
