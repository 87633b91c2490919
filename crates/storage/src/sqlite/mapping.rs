use sqlx::Row;

use vocab_core::model::{
    CardId, CardProgress, ReviewQuality, SessionSummary, StudyDirection, StudySettings,
};

use crate::repository::{ReviewLogRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("card_id overflow".into()))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    u64::try_from(v)
        .map(CardId::new)
        .map_err(|_| StorageError::Serialization("card_id sign overflow".into()))
}

pub(crate) fn parse_direction(s: &str) -> Result<StudyDirection, StorageError> {
    s.parse()
        .map_err(|_| StorageError::Serialization(format!("invalid direction: {s}")))
}

pub(crate) fn quality_to_i64(quality: ReviewQuality) -> i64 {
    i64::from(quality.as_u8())
}

pub(crate) fn quality_from_i64(v: i64) -> Result<ReviewQuality, StorageError> {
    let code = u8::try_from(v).map_err(|_| ser(format!("invalid quality: {v}")))?;
    ReviewQuality::from_u8(code).map_err(ser)
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<CardProgress, StorageError> {
    let card_id = card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?;
    let direction_str: String = row.try_get("direction").map_err(ser)?;
    let direction = parse_direction(&direction_str)?;

    let repetitions = u32_from_i64("repetitions", row.try_get::<i64, _>("repetitions").map_err(ser)?)?;
    let session_position = row
        .try_get::<Option<i64>, _>("session_position")
        .map_err(ser)?
        .map(|v| u32_from_i64("session_position", v))
        .transpose()?;
    let hard_presses =
        u32_from_i64("hard_presses", row.try_get::<i64, _>("hard_presses").map_err(ser)?)?;

    CardProgress::from_persisted(
        card_id,
        direction,
        repetitions,
        row.try_get("interval_days").map_err(ser)?,
        row.try_get("ease_factor").map_err(ser)?,
        row.try_get("next_review_at").map_err(ser)?,
        row.try_get("last_review_at").map_err(ser)?,
        row.try_get("is_selected").map_err(ser)?,
        row.try_get("is_mastered").map_err(ser)?,
        row.try_get("learning_phase").map_err(ser)?,
        session_position,
        hard_presses,
        row.try_get("successful_reviews").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_review_log_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ReviewLogRecord, StorageError> {
    let direction_str: String = row.try_get("direction").map_err(ser)?;

    Ok(ReviewLogRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        card_id: card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
        direction: parse_direction(&direction_str)?,
        quality: quality_from_i64(row.try_get::<i64, _>("quality").map_err(ser)?)?,
        reviewed_at: row.try_get("reviewed_at").map_err(ser)?,
        interval_days: row.try_get("interval_days").map_err(ser)?,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        learning_phase: row.try_get("learning_phase").map_err(ser)?,
        graduated: row.try_get("graduated").map_err(ser)?,
        next_review_at: row.try_get("next_review_at").map_err(ser)?,
    })
}

pub(crate) fn map_summary_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionSummary, StorageError> {
    SessionSummary::from_persisted(
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        u32_from_i64("total_reviews", row.try_get::<i64, _>("total_reviews").map_err(ser)?)?,
        u32_from_i64("hard", row.try_get::<i64, _>("hard").map_err(ser)?)?,
        u32_from_i64("medium", row.try_get::<i64, _>("medium").map_err(ser)?)?,
        u32_from_i64("easy", row.try_get::<i64, _>("easy").map_err(ser)?)?,
        u32_from_i64("graduations", row.try_get::<i64, _>("graduations").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_settings_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StudySettings, StorageError> {
    StudySettings::new(
        u32_from_i64("daily_goal", row.try_get::<i64, _>("daily_goal").map_err(ser)?)?,
        u32_from_i64(
            "new_cards_per_session",
            row.try_get::<i64, _>("new_cards_per_session").map_err(ser)?,
        )?,
        u32_from_i64("session_size", row.try_get::<i64, _>("session_size").map_err(ser)?)?,
        row.try_get("shuffle_new").map_err(ser)?,
    )
    .map_err(ser)
}
