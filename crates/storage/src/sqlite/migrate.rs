use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (progress records, review logs, daily progress,
/// study settings, session summaries, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    card_id INTEGER NOT NULL,
                    direction TEXT NOT NULL CHECK (direction IN ('forward', 'reverse')),
                    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
                    interval_days REAL NOT NULL CHECK (interval_days >= 0),
                    ease_factor REAL NOT NULL,
                    next_review_at TEXT NOT NULL,
                    last_review_at TEXT,
                    is_selected INTEGER NOT NULL,
                    is_mastered INTEGER NOT NULL,
                    learning_phase INTEGER NOT NULL,
                    session_position INTEGER,
                    hard_presses INTEGER NOT NULL CHECK (hard_presses >= 0),
                    successful_reviews REAL NOT NULL CHECK (successful_reviews >= 0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (card_id, direction)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_due
                ON progress (learning_phase, is_selected, next_review_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_logs (
                    id INTEGER PRIMARY KEY,
                    card_id INTEGER NOT NULL,
                    direction TEXT NOT NULL CHECK (direction IN ('forward', 'reverse')),
                    quality INTEGER NOT NULL CHECK (quality BETWEEN 0 AND 2),
                    reviewed_at TEXT NOT NULL,
                    interval_days REAL NOT NULL,
                    ease_factor REAL NOT NULL,
                    learning_phase INTEGER NOT NULL,
                    graduated INTEGER NOT NULL,
                    next_review_at TEXT NOT NULL,
                    FOREIGN KEY (card_id, direction)
                        REFERENCES progress(card_id, direction) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_logs_card
                ON review_logs (card_id, direction, reviewed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS daily_progress (
                    day TEXT PRIMARY KEY,
                    graduated INTEGER NOT NULL CHECK (graduated >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS study_settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    daily_goal INTEGER NOT NULL CHECK (daily_goal > 0),
                    new_cards_per_session INTEGER NOT NULL CHECK (new_cards_per_session > 0),
                    session_size INTEGER NOT NULL CHECK (session_size > 0),
                    shuffle_new INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_summaries (
                    id INTEGER PRIMARY KEY,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    total_reviews INTEGER NOT NULL CHECK (total_reviews >= 0),
                    hard INTEGER NOT NULL CHECK (hard >= 0),
                    medium INTEGER NOT NULL CHECK (medium >= 0),
                    easy INTEGER NOT NULL CHECK (easy >= 0),
                    graduations INTEGER NOT NULL CHECK (graduations >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
