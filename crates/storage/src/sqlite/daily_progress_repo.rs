use chrono::NaiveDate;
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{DailyProgressRepository, StorageError};

fn u32_from_row(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid graduated: {v}")))
}

#[async_trait::async_trait]
impl DailyProgressRepository for SqliteRepository {
    async fn increment_graduations(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
                INSERT INTO daily_progress (day, graduated)
                VALUES (?1, 1)
                ON CONFLICT(day) DO UPDATE SET graduated = graduated + 1
                RETURNING graduated
            ",
        )
        .bind(day.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_row(row.try_get::<i64, _>("graduated").map_err(ser)?)
    }

    async fn graduations_on(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT graduated FROM daily_progress WHERE day = ?1")
            .bind(day.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => u32_from_row(row.try_get::<i64, _>("graduated").map_err(ser)?),
            None => Ok(0),
        }
    }
}
