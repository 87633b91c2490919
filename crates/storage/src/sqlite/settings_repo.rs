use vocab_core::model::StudySettings;

use super::{SqliteRepository, mapping};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait::async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<Option<StudySettings>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT daily_goal, new_cards_per_session, session_size, shuffle_new
                FROM study_settings
                WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_settings_row(&r)).transpose()
    }

    async fn save_settings(&self, settings: &StudySettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO study_settings (
                    id, daily_goal, new_cards_per_session, session_size, shuffle_new
                )
                VALUES (1, ?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    daily_goal = excluded.daily_goal,
                    new_cards_per_session = excluded.new_cards_per_session,
                    session_size = excluded.session_size,
                    shuffle_new = excluded.shuffle_new
            ",
        )
        .bind(i64::from(settings.daily_goal()))
        .bind(i64::from(settings.new_cards_per_session()))
        .bind(i64::from(settings.session_size()))
        .bind(settings.shuffle_new())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
