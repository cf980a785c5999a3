//! crates/trivia_core/src/round.rs
//!
//! The lifecycle of exactly one live question: countdown, answer capture,
//! timeout, feedback delay, settlement.
//!
//! The countdown runs as a spawned task that only ever touches its own round's
//! state, and only while that round is still `Counting`. Every exit path cancels it:
//! an answer, the timeout itself, settling, and dropping the `Round`.

use crate::domain::{Question, RoundOutcome, RoundPhase, RoundState};
use crate::error::{EngineError, EngineResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// A live round. Must be started from within a tokio runtime.
pub struct Round {
    state: Arc<watch::Sender<RoundState>>,
    countdown: CancellationToken,
    feedback_delay: Duration,
}

impl Round {
    /// Loads the question and immediately starts counting down from its time limit.
    pub fn start(question: Question, feedback_delay: Duration) -> Self {
        let seconds = question.time_limit_seconds;
        let (sender, _) = watch::channel(RoundState {
            active_question: question,
            phase: RoundPhase::Loaded,
            seconds_remaining: seconds,
            is_answered: false,
            selected_option_index: None,
        });
        let state = Arc::new(sender);
        let countdown = CancellationToken::new();

        state.send_modify(|s| {
            s.phase = if s.seconds_remaining == 0 {
                RoundPhase::TimedOut
            } else {
                RoundPhase::Counting
            };
        });

        if state.borrow().phase == RoundPhase::Counting {
            tokio::spawn(run_countdown(state.clone(), countdown.clone()));
        }

        Self {
            state,
            countdown,
            feedback_delay,
        }
    }

    /// Watch the round for rendering; every tick and phase change is published.
    pub fn subscribe(&self) -> watch::Receiver<RoundState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RoundState {
        self.state.borrow().clone()
    }

    /// Captures the player's choice. Only the first answer while counting is accepted.
    pub fn submit_answer(&self, option_index: usize) -> EngineResult<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|s| {
            let question = &s.active_question;
            if option_index >= question.options.len() {
                result = Err(EngineError::InvalidOption {
                    question_id: question.id.clone(),
                    index: option_index,
                });
                return false;
            }
            if s.phase != RoundPhase::Counting {
                result = Err(EngineError::AlreadyAnswered(question.id.clone()));
                return false;
            }
            s.phase = RoundPhase::Answered;
            s.is_answered = true;
            s.selected_option_index = Some(option_index);
            true
        });

        if result.is_ok() {
            self.countdown.cancel();
        }
        result
    }

    /// Waits for an answer or the timeout, holds for the feedback delay, then
    /// hands the result to the caller. This is where the next question may load.
    pub async fn settle(self) -> RoundOutcome {
        let mut watcher = self.state.subscribe();
        // The sender lives in `self`, so this can only return once resolved.
        let _ = watcher.wait_for(|s| s.phase.is_resolved()).await;
        self.countdown.cancel();

        tokio::time::sleep(self.feedback_delay).await;
        self.state.send_modify(|s| s.phase = RoundPhase::Settled);

        let state = self.state.borrow();
        let outcome = RoundOutcome {
            question_id: state.active_question.id.clone(),
            selected_option_index: state.selected_option_index,
            correct: state.active_question.is_correct(state.selected_option_index),
            timed_out: state.selected_option_index.is_none(),
        };
        debug!(
            question_id = %outcome.question_id,
            correct = outcome.correct,
            timed_out = outcome.timed_out,
            "Round settled"
        );
        outcome
    }

    /// Ends the round without a result, e.g. when the player leaves mid-question.
    pub fn abandon(self) {
        debug!(question_id = %self.state.borrow().active_question.id, "Round abandoned");
    }
}

impl Drop for Round {
    fn drop(&mut self) {
        self.countdown.cancel();
    }
}

async fn run_countdown(state: Arc<watch::Sender<RoundState>>, cancelled: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancelled.cancelled() => return,
            _ = tokio::time::sleep(TICK) => {}
        }

        let mut expired = false;
        let live = state.send_if_modified(|s| {
            if s.phase != RoundPhase::Counting {
                return false;
            }
            s.seconds_remaining = s.seconds_remaining.saturating_sub(1);
            if s.seconds_remaining == 0 {
                s.phase = RoundPhase::TimedOut;
                expired = true;
            }
            true
        });

        if !live || expired {
            return;
        }
    }
}
