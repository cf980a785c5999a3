//! Climbing the whole solo ladder with real rounds.

use std::sync::Arc;
use std::time::Duration;
use trivia_core::{
    DifficultyTier, EngineError, InMemoryStore, ProgressStore, Question, QuestionBank, Round,
    SoloTracker,
};
use uuid::Uuid;

fn bank(per_tier: usize) -> Arc<QuestionBank> {
    let questions = DifficultyTier::ALL
        .iter()
        .flat_map(|tier| {
            (0..per_tier).map(move |i| Question {
                id: format!("{}-{}", tier, i),
                text: format!("{} #{}", tier, i),
                options: vec!["yes".into(), "no".into()],
                correct_option_index: 1,
                tier: *tier,
                time_limit_seconds: 5,
            })
        })
        .collect();
    Arc::new(QuestionBank::new(questions).unwrap())
}

#[tokio::test]
async fn every_tier_advances_exactly_once() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = SoloTracker::new(bank(3), store.clone());
    let user_id = Uuid::new_v4();
    let mut session = tracker.session(user_id).await.unwrap();

    for tier in DifficultyTier::ALL {
        assert_eq!(session.progress().current_tier, tier);
        let mut advances = Vec::new();
        for i in 0..3 {
            let q = session.start_tier(tier).unwrap();
            let answer = session.submit_answer(&q.id, Some(i % 2)).await.unwrap();
            advances.extend(answer.advanced_to);
        }
        assert_eq!(advances, tier.next().into_iter().collect::<Vec<_>>());
        assert_eq!(
            session.start_tier(tier),
            Err(EngineError::TierComplete(tier))
        );
    }

    let progress = session.progress();
    assert_eq!(progress.current_tier, DifficultyTier::Impossible);
    assert_eq!(progress.questions_answered, 15);
    assert_eq!(progress.answered_question_ids.len(), 15);

    let stored = store.load_progress(user_id).await.unwrap().unwrap();
    assert_eq!(&stored, progress);
}

#[tokio::test]
async fn progress_survives_a_new_session() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = SoloTracker::new(bank(2), store);
    let user_id = Uuid::new_v4();

    let mut first = tracker.session(user_id).await.unwrap();
    let q = first.start_tier(DifficultyTier::Easy).unwrap();
    first.submit_answer(&q.id, Some(1)).await.unwrap();

    let mut second = tracker.session(user_id).await.unwrap();
    assert_eq!(second.progress().correct_answers, 1);
    assert_eq!(second.start_tier(DifficultyTier::Easy).unwrap().id, "easy-1");
}

#[tokio::test(start_paused = true)]
async fn timed_out_round_is_still_part_of_history() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = SoloTracker::new(bank(1), store);
    let mut session = tracker.session(Uuid::new_v4()).await.unwrap();

    let question = session.start_tier(DifficultyTier::Easy).unwrap();
    let outcome = Round::start(question.clone(), Duration::from_millis(800))
        .settle()
        .await;
    assert!(outcome.timed_out);

    let answer = session.settle_round(&outcome).await.unwrap();
    assert!(!answer.correct);
    assert_eq!(answer.advanced_to, Some(DifficultyTier::Medium));
    assert!(session.progress().answered_question_ids.contains(&question.id));
    assert_eq!(session.progress().correct_answers, 0);
}
