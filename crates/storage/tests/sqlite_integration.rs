use chrono::Duration;

use storage::repository::{
    DailyProgressRepository, ProgressRepository, ReviewLogRecord, ReviewLogRepository,
    ReviewPersistence, SessionSummaryRepository, SettingsRepository, StorageError,
};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{
    CardId, CardProgress, ReviewQuality, SessionSummary, StudyDirection, StudySettings,
};
use vocab_core::scheduler::Scheduler;
use vocab_core::time::fixed_now;

fn learning_record(id: u64, position: u32) -> CardProgress {
    CardProgress::new_learning(
        CardId::new(id),
        StudyDirection::Forward,
        position,
        fixed_now(),
        fixed_now(),
    )
}

fn review_record(id: u64, direction: StudyDirection, overdue_hours: i64) -> CardProgress {
    CardProgress::from_persisted(
        CardId::new(id),
        direction,
        4,
        7.0,
        2.1,
        fixed_now() - Duration::hours(overdue_hours),
        Some(fixed_now() - Duration::days(7)),
        true,
        false,
        false,
        None,
        1,
        3.5,
        fixed_now() - Duration::days(40),
        fixed_now() - Duration::days(7),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_phase_and_position() {
    let repo = connect("memdb_roundtrip").await;

    let learning = learning_record(1, 3);
    repo.upsert_progress(&learning).await.unwrap();

    let fetched = repo
        .get_progress(CardId::new(1), StudyDirection::Forward)
        .await
        .unwrap()
        .expect("stored record");
    assert_eq!(fetched, learning);

    let review = review_record(1, StudyDirection::Reverse, 5);
    repo.upsert_progress(&review).await.unwrap();

    let fetched = repo
        .get_progress(CardId::new(1), StudyDirection::Reverse)
        .await
        .unwrap()
        .expect("stored record");
    assert!(!fetched.learning_phase());
    assert_eq!(fetched.session_position(), None);
    assert_eq!(fetched.repetitions(), 4);
    assert_eq!(fetched.successful_reviews(), 3.5);
}

#[tokio::test]
async fn sqlite_upsert_keeps_created_at() {
    let repo = connect("memdb_upsert").await;

    let original = learning_record(1, 1);
    repo.upsert_progress(&original).await.unwrap();

    let scheduler = Scheduler::new();
    let later = fixed_now() + Duration::minutes(5);
    let applied = scheduler.apply_review(&original, ReviewQuality::Medium, 1, later);
    repo.upsert_progress(&applied.progress).await.unwrap();

    let fetched = repo
        .get_progress(CardId::new(1), StudyDirection::Forward)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.created_at(), original.created_at());
    assert_eq!(fetched.updated_at(), later);
    assert_eq!(fetched.successful_reviews(), 0.5);
}

#[tokio::test]
async fn sqlite_learning_and_due_queries() {
    let repo = connect("memdb_queries").await;

    repo.upsert_progress(&learning_record(1, 8)).await.unwrap();
    repo.upsert_progress(&learning_record(2, 2)).await.unwrap();
    repo.upsert_progress(&review_record(3, StudyDirection::Forward, 50))
        .await
        .unwrap();
    repo.upsert_progress(&review_record(4, StudyDirection::Forward, 2))
        .await
        .unwrap();

    // Future review card stays out of the due list.
    let mut future = review_record(5, StudyDirection::Forward, 0);
    future = CardProgress::from_persisted(
        future.card_id(),
        future.direction(),
        future.repetitions(),
        future.interval_days(),
        future.ease_factor(),
        fixed_now() + Duration::days(2),
        future.last_review_at(),
        true,
        false,
        false,
        None,
        future.hard_presses(),
        future.successful_reviews(),
        future.created_at(),
        future.updated_at(),
    )
    .unwrap();
    repo.upsert_progress(&future).await.unwrap();

    let learning = repo.learning_progress().await.unwrap();
    let ids: Vec<u64> = learning.iter().map(|p| p.card_id().value()).collect();
    assert_eq!(ids, vec![2, 1], "ordered by session position");

    let due = repo.due_reviews(fixed_now(), 10).await.unwrap();
    let ids: Vec<u64> = due.iter().map(|p| p.card_id().value()).collect();
    assert_eq!(ids, vec![3, 4], "most overdue first");

    let limited = repo.due_reviews(fixed_now(), 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].card_id(), CardId::new(3));
}

#[tokio::test]
async fn sqlite_set_selected_retires_and_restores() {
    let repo = connect("memdb_selected").await;

    repo.upsert_progress(&learning_record(1, 1)).await.unwrap();
    repo.set_selected(CardId::new(1), StudyDirection::Forward, false, fixed_now())
        .await
        .unwrap();

    assert!(repo.learning_progress().await.unwrap().is_empty());

    repo.set_selected(CardId::new(1), StudyDirection::Forward, true, fixed_now())
        .await
        .unwrap();
    assert_eq!(repo.learning_progress().await.unwrap().len(), 1);

    let err = repo
        .set_selected(CardId::new(7), StudyDirection::Reverse, false, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_apply_review_writes_record_and_log_atomically() {
    let repo = connect("memdb_apply").await;
    let scheduler = Scheduler::new();

    let card = learning_record(1, 1);
    repo.upsert_progress(&card).await.unwrap();

    let applied = scheduler.apply_review(&card, ReviewQuality::Easy, 1, fixed_now());
    let log = ReviewLogRecord::from_applied(ReviewQuality::Easy, &applied, fixed_now());
    let log_id = repo.apply_review(&applied.progress, log).await.unwrap();

    let logs = repo
        .logs_for_card(CardId::new(1), StudyDirection::Forward)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, Some(log_id));
    assert_eq!(logs[0].quality, ReviewQuality::Easy);
    assert!(!logs[0].graduated);
    assert!(logs[0].learning_phase);

    let stored = repo
        .get_progress(CardId::new(1), StudyDirection::Forward)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.successful_reviews(), 1.0);
}

#[tokio::test]
async fn sqlite_apply_review_rejects_foreign_log() {
    let repo = connect("memdb_conflict").await;
    let scheduler = Scheduler::new();

    let card = learning_record(1, 1);
    let applied = scheduler.apply_review(&card, ReviewQuality::Hard, 1, fixed_now());
    let mut log = ReviewLogRecord::from_applied(ReviewQuality::Hard, &applied, fixed_now());
    log.direction = StudyDirection::Reverse;

    let err = repo.apply_review(&applied.progress, log).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_daily_progress_counts_per_day() {
    let repo = connect("memdb_daily").await;
    let today = fixed_now().date_naive();

    assert_eq!(repo.increment_graduations(today).await.unwrap(), 1);
    assert_eq!(repo.increment_graduations(today).await.unwrap(), 2);
    assert_eq!(repo.graduations_on(today).await.unwrap(), 2);

    let other = today.succ_opt().unwrap();
    assert_eq!(repo.graduations_on(other).await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_settings_round_trip() {
    let repo = connect("memdb_settings").await;

    assert!(repo.get_settings().await.unwrap().is_none());

    let settings = StudySettings::new(8, 4, 12, true).unwrap();
    repo.save_settings(&settings).await.unwrap();
    assert_eq!(repo.get_settings().await.unwrap(), Some(settings));

    let replaced = StudySettings::new(20, 10, 40, false).unwrap();
    repo.save_settings(&replaced).await.unwrap();
    assert_eq!(repo.get_settings().await.unwrap(), Some(replaced));
}

#[tokio::test]
async fn sqlite_summaries_list_newest_first() {
    let repo = connect("memdb_summaries").await;
    let now = fixed_now();

    for days_ago in [4_i64, 2, 0] {
        let started = now - Duration::days(days_ago) - Duration::minutes(10);
        let completed = started + Duration::minutes(10);
        let summary = SessionSummary::from_persisted(started, completed, 5, 1, 2, 2, 1).unwrap();
        repo.append_summary(&summary).await.unwrap();
    }

    let all = repo.list_summaries(None, None, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].completed_at() > all[1].completed_at());
    assert!(all[1].completed_at() > all[2].completed_at());

    let recent = repo
        .list_summaries(Some(now - Duration::days(3)), None, 10)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);

    let fetched = repo.get_summary(1).await.unwrap();
    assert_eq!(fetched.total_reviews(), 5);
    assert!(matches!(
        repo.get_summary(99).await.unwrap_err(),
        StorageError::NotFound
    ));
}
