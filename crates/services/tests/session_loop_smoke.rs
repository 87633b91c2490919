use std::sync::Arc;

use services::{Clock, SessionLoopService};
use storage::repository::{
    DailyProgressRepository, InMemoryRepository, ProgressRepository, SessionSummaryRepository,
};
use vocab_core::model::{CardId, CardProgress, ReviewQuality, StudyDirection, StudySettings};
use vocab_core::time::{fixed_now, local_day};

fn loop_service(repo: &InMemoryRepository) -> SessionLoopService {
    SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        StudySettings::default(),
    )
}

#[tokio::test]
async fn session_loop_drills_new_cards_to_graduation() {
    let repo = InMemoryRepository::new();
    let service = loop_service(&repo);

    let candidates: Vec<(CardId, StudyDirection)> = (1..=3)
        .map(|id| (CardId::new(id), StudyDirection::Forward))
        .collect();

    let mut session = service.start_session(&candidates).await.unwrap();
    assert_eq!(session.round_size(), 3);

    // Answer Easy until every card graduates and the queue drains.
    let mut answers = 0;
    while !session.is_complete() {
        let result = service
            .answer_current(&mut session, ReviewQuality::Easy)
            .await
            .unwrap();
        answers += 1;
        assert!(answers <= 9, "session failed to converge");
        if result.is_complete {
            break;
        }
    }

    // Three Easy responses per card.
    assert_eq!(answers, 9);
    assert_eq!(session.graduations(), 3);

    let summary_id = session.summary_id().expect("summary persisted");
    let summary = repo.get_summary(summary_id).await.unwrap();
    assert_eq!(summary.total_reviews(), 9);
    assert_eq!(summary.easy(), 9);
    assert_eq!(summary.graduations(), 3);

    // Every graduation moved the daily goal.
    assert_eq!(
        repo.graduations_on(local_day(fixed_now())).await.unwrap(),
        3
    );

    // All records left the learning phase with a one-day interval.
    for id in 1..=3 {
        let stored = repo
            .get_progress(CardId::new(id), StudyDirection::Forward)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.learning_phase());
        assert_eq!(stored.interval_days(), 1.0);
        assert_eq!(stored.session_position(), None);
    }
}

#[tokio::test]
async fn session_presents_learning_cards_before_overdue_reviews() {
    let repo = InMemoryRepository::new();

    // One learning card at position 3 and one review card 50 hours overdue.
    let learning = CardProgress::new_learning(
        CardId::new(1),
        StudyDirection::Forward,
        3,
        fixed_now(),
        fixed_now(),
    );
    repo.upsert_progress(&learning).await.unwrap();

    let overdue = CardProgress::from_persisted(
        CardId::new(2),
        StudyDirection::Forward,
        4,
        7.0,
        2.1,
        fixed_now() - chrono::Duration::hours(50),
        Some(fixed_now() - chrono::Duration::days(7)),
        true,
        false,
        false,
        None,
        0,
        3.0,
        fixed_now() - chrono::Duration::days(30),
        fixed_now() - chrono::Duration::days(7),
    )
    .unwrap();
    repo.upsert_progress(&overdue).await.unwrap();

    let service = loop_service(&repo);
    let mut session = service.start_session(&[]).await.unwrap();

    assert_eq!(session.round_size(), 2);
    assert_eq!(session.current_card().unwrap().card_id(), CardId::new(1));

    // Answer the learning card; the overdue review comes next.
    service
        .answer_current(&mut session, ReviewQuality::Medium)
        .await
        .unwrap();
    assert_eq!(session.current_card().unwrap().card_id(), CardId::new(2));

    // A Medium on the overdue review grows its interval and keeps it out
    // of the next round.
    let result = service
        .answer_current(&mut session, ReviewQuality::Medium)
        .await
        .unwrap();
    assert!(!result.review.graduated);

    let stored = repo
        .get_progress(CardId::new(2), StudyDirection::Forward)
        .await
        .unwrap()
        .unwrap();
    assert!((stored.interval_days() - 7.0 * 1.2).abs() < 1e-9);

    // The learning card is still pending, so the session goes on.
    assert!(!session.is_complete());
    assert_eq!(session.round(), 2);
    assert_eq!(session.round_size(), 1);
}
