//! services/api/src/web/play_task.rs
//!
//! The asynchronous "worker" functions that drive solo and challenge play for a
//! single connection. Each runs until its question stream is exhausted or its
//! `CancellationToken` fires, pushing `ServerMessage`s to the connection's writer.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, PlayerAnswer},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trivia_core::{
    ChallengeRun, ChallengeStatus, DifficultyTier, EngineError, EngineResult, Question, Round,
    RoundOutcome,
};
use uuid::Uuid;

pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Plays one question: shows it, streams the countdown, applies answers from the
/// client and reports feedback. Returns `None` if play was cancelled first.
///
/// Answers still queued from an earlier question are discarded before this one is
/// shown, and only answers naming this question are applied.
async fn play_round(
    question: Question,
    index: usize,
    total: Option<usize>,
    feedback_delay: Duration,
    outbound: &Outbound,
    answers: &mut mpsc::Receiver<PlayerAnswer>,
    token: &CancellationToken,
) -> Option<RoundOutcome> {
    while let Ok(stale) = answers.try_recv() {
        debug!(question_id = %stale.question_id, "Discarding answer queued before this round");
    }

    let question_id = question.id.clone();
    let _ = outbound.send(ServerMessage::Question {
        question: (&question).into(),
        index,
        total,
    });

    let round = Round::start(question, feedback_delay);
    let mut watcher = round.subscribe();

    let mut last_tick = None;
    loop {
        let state = watcher.borrow_and_update().clone();
        if state.phase.is_resolved() {
            let _ = outbound.send(ServerMessage::Feedback {
                question_id: state.active_question.id.clone(),
                correct: state.active_question.is_correct(state.selected_option_index),
                timed_out: state.selected_option_index.is_none(),
                correct_option_index: state.active_question.correct_option_index,
            });
            break;
        }
        if last_tick != Some(state.seconds_remaining) {
            last_tick = Some(state.seconds_remaining);
            let _ = outbound.send(ServerMessage::Tick {
                seconds_remaining: state.seconds_remaining,
            });
        }

        tokio::select! {
            _ = token.cancelled() => {
                round.abandon();
                return None;
            }
            Some(answer) = answers.recv() => {
                if answer.question_id != question_id {
                    debug!(
                        live = %question_id,
                        answered = %answer.question_id,
                        "Ignoring answer for another question"
                    );
                } else if let Err(e) = round.submit_answer(answer.option_index) {
                    let _ = outbound.send(ServerMessage::Error { message: e.to_string() });
                }
            }
            changed = watcher.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tokio::select! {
        _ = token.cancelled() => None,
        outcome = round.settle() => Some(outcome),
    }
}

/// Plays the solo ladder from `tier` until the tier runs out or play is cancelled.
/// Advancing to the next tier does not switch the questions being played.
pub async fn solo_process(
    app_state: Arc<AppState>,
    user_id: Uuid,
    tier: DifficultyTier,
    outbound: Outbound,
    mut answers: mpsc::Receiver<PlayerAnswer>,
    token: CancellationToken,
) -> EngineResult<()> {
    info!(%user_id, %tier, "Solo play started.");
    let feedback_delay = app_state.config.round_feedback_delay;
    let mut session = app_state.solo.session(user_id).await?;
    let _ = outbound.send(ServerMessage::Progress {
        progress: session.progress().into(),
    });

    let mut index = 0;
    loop {
        let question = match session.start_tier(tier) {
            Ok(question) => question,
            Err(EngineError::TierComplete(tier)) => {
                let _ = outbound.send(ServerMessage::TierComplete { tier: tier.into() });
                break;
            }
            Err(e) => return Err(e),
        };

        let Some(outcome) = play_round(
            question,
            index,
            None,
            feedback_delay,
            &outbound,
            &mut answers,
            &token,
        )
        .await
        else {
            info!(%user_id, "Solo play cancelled.");
            return Ok(());
        };
        index += 1;

        match session.settle_round(&outcome).await {
            Ok(answer) => {
                if let Some(next) = answer.advanced_to {
                    let _ = outbound.send(ServerMessage::TierAdvanced { tier: next.into() });
                }
            }
            // The answer still counts for this session; the next save carries it.
            Err(EngineError::Persistence(e)) => {
                warn!(%user_id, error = %e, "Solo progress could not be saved.");
                let _ = outbound.send(ServerMessage::Error {
                    message: "Your progress could not be saved.".to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        let _ = outbound.send(ServerMessage::Progress {
            progress: session.progress().into(),
        });
    }

    let _ = outbound.send(ServerMessage::SessionEnded);
    info!(%user_id, "Solo play finished.");
    Ok(())
}

/// Follows a challenge, plays this user's question set once it is active, and
/// ends the session when both players have finished.
pub async fn challenge_process(
    app_state: Arc<AppState>,
    user_id: Uuid,
    challenge_id: Uuid,
    outbound: Outbound,
    mut answers: mpsc::Receiver<PlayerAnswer>,
    token: CancellationToken,
) -> EngineResult<()> {
    let challenge = app_state.challenges.get(challenge_id).await?;
    if challenge.side_of(user_id).is_none() {
        return Err(EngineError::NotAParticipant {
            user_id,
            challenge_id,
        });
    }
    info!(%user_id, %challenge_id, "Joined challenge.");

    let (status_tx, mut status_rx) = watch::channel(challenge.status);
    let forward = outbound.clone();
    let _subscription = app_state
        .sync
        .subscribe(challenge_id, move |challenge| {
            status_tx.send_replace(challenge.status);
            let _ = forward.send(ServerMessage::ChallengeUpdated {
                challenge: (&challenge).into(),
            });
        })
        .await?;

    let status = tokio::select! {
        _ = token.cancelled() => return Ok(()),
        status = status_rx.wait_for(|s| *s >= ChallengeStatus::Active) => match status {
            Ok(status) => *status,
            Err(_) => return Ok(()),
        },
    };

    if status == ChallengeStatus::Active {
        let feedback_delay = app_state.config.round_feedback_delay;
        let mut run =
            ChallengeRun::begin(app_state.challenges.clone(), challenge_id, user_id).await?;

        while let Some(question) = run.current_question().cloned() {
            let (index, total) = run.position();
            let Some(outcome) = play_round(
                question,
                index,
                Some(total),
                feedback_delay,
                &outbound,
                &mut answers,
                &token,
            )
            .await
            else {
                info!(%user_id, %challenge_id, "Challenge play cancelled.");
                return Ok(());
            };
            run.record(&outcome).await?;
        }
        info!(%user_id, %challenge_id, "Finished challenge question set.");
        // Retries the flip if it failed when the last answer was written.
        app_state.challenges.finish_if_complete(challenge_id).await?;
    }

    tokio::select! {
        _ = token.cancelled() => return Ok(()),
        finished = status_rx.wait_for(|s| *s == ChallengeStatus::Finished) => {
            if finished.is_err() {
                return Ok(());
            }
        }
    }

    let _ = outbound.send(ServerMessage::SessionEnded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use trivia_core::{InMemoryStore, QuestionBank};

    fn question(id: &str, tier: DifficultyTier) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 0,
            tier,
            time_limit_seconds: 10,
        }
    }

    fn app_state(store: Arc<InMemoryStore>, questions: Vec<Question>) -> Arc<AppState> {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".into(),
            db_max_connections: 1,
            log_level: tracing::Level::INFO,
            round_feedback_delay: Duration::from_millis(100),
            cors_origin: "http://localhost:3000".into(),
        };
        let bank = Arc::new(QuestionBank::new(questions).unwrap());
        Arc::new(AppState::new(
            Arc::new(config),
            bank,
            store.clone(),
            store.clone(),
            store,
        ))
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        rx.recv().await.expect("outbound channel closed")
    }

    fn answer(question_id: &str, option_index: usize) -> PlayerAnswer {
        PlayerAnswer {
            question_id: question_id.to_string(),
            option_index,
        }
    }

    /// Skips ticks and returns the next feedback message.
    async fn next_feedback(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        loop {
            match next_message(rx).await {
                ServerMessage::Tick { .. } => continue,
                other => return other,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn solo_play_reports_feedback_and_tier_advance() {
        let store = Arc::new(InMemoryStore::new());
        let state = app_state(
            store,
            vec![
                question("e1", DifficultyTier::Easy),
                question("m1", DifficultyTier::Medium),
            ],
        );
        let user = Uuid::new_v4();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (answer_tx, answer_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let task = tokio::spawn(solo_process(
            state,
            user,
            DifficultyTier::Easy,
            out_tx,
            answer_rx,
            token,
        ));

        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(
            next_message(&mut out_rx).await,
            ServerMessage::Question {
                index: 0,
                total: None,
                ..
            }
        ));
        assert_eq!(
            next_message(&mut out_rx).await,
            ServerMessage::Tick { seconds_remaining: 10 }
        );

        answer_tx.send(answer("e1", 0)).await.unwrap();
        assert_eq!(
            next_message(&mut out_rx).await,
            ServerMessage::Feedback {
                question_id: "e1".into(),
                correct: true,
                timed_out: false,
                correct_option_index: 0,
            }
        );
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::TierAdvanced { .. }));
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::TierComplete { .. }));
        assert_eq!(next_message(&mut out_rx).await, ServerMessage::SessionEnded);

        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_solo_play_stops_without_recording() {
        let store = Arc::new(InMemoryStore::new());
        let state = app_state(store.clone(), vec![question("e1", DifficultyTier::Easy)]);
        let user = Uuid::new_v4();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_answer_tx, answer_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let task = tokio::spawn(solo_process(
            state.clone(),
            user,
            DifficultyTier::Easy,
            out_tx,
            answer_rx,
            token.clone(),
        ));

        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Question { .. }));
        token.cancel();
        task.await.unwrap().unwrap();

        let session = state.solo.session(user).await.unwrap();
        assert_eq!(session.progress().questions_answered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn extra_clicks_do_not_answer_the_next_question() {
        let store = Arc::new(InMemoryStore::new());
        let state = app_state(
            store,
            vec![
                question("e1", DifficultyTier::Easy),
                question("e2", DifficultyTier::Easy),
            ],
        );
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (answer_tx, answer_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let task = tokio::spawn(solo_process(
            state,
            Uuid::new_v4(),
            DifficultyTier::Easy,
            out_tx,
            answer_rx,
            token.clone(),
        ));

        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Question { .. }));
        answer_tx.send(answer("e1", 0)).await.unwrap();
        answer_tx.send(answer("e1", 2)).await.unwrap();

        assert_eq!(
            next_feedback(&mut out_rx).await,
            ServerMessage::Feedback {
                question_id: "e1".into(),
                correct: true,
                timed_out: false,
                correct_option_index: 0,
            }
        );
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(
            next_message(&mut out_rx).await,
            ServerMessage::Question { index: 1, .. }
        ));

        assert_eq!(
            next_feedback(&mut out_rx).await,
            ServerMessage::Feedback {
                question_id: "e2".into(),
                correct: false,
                timed_out: true,
                correct_option_index: 0,
            }
        );

        token.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn answers_naming_another_question_are_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let state = app_state(store, vec![question("e1", DifficultyTier::Easy)]);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (answer_tx, answer_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let task = tokio::spawn(solo_process(
            state,
            Uuid::new_v4(),
            DifficultyTier::Easy,
            out_tx,
            answer_rx,
            token.clone(),
        ));

        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Progress { .. }));
        assert!(matches!(next_message(&mut out_rx).await, ServerMessage::Question { .. }));
        answer_tx.send(answer("m7", 1)).await.unwrap();
        answer_tx.send(answer("e1", 0)).await.unwrap();

        assert_eq!(
            next_feedback(&mut out_rx).await,
            ServerMessage::Feedback {
                question_id: "e1".into(),
                correct: true,
                timed_out: false,
                correct_option_index: 0,
            }
        );

        token.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn outsiders_cannot_join_a_challenge() {
        let store = Arc::new(InMemoryStore::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_friendship(a, b).await;
        let state = app_state(store, vec![question("e1", DifficultyTier::Easy)]);
        let challenge = state
            .challenges
            .create(a, b, DifficultyTier::Easy, 1)
            .await
            .unwrap();

        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (_answer_tx, answer_rx) = mpsc::channel(4);
        let result = challenge_process(
            state,
            Uuid::new_v4(),
            challenge.id,
            out_tx,
            answer_rx,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(EngineError::NotAParticipant { .. })));
    }
}
