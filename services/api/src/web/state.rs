//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trivia_core::{
    ChallengeManager, ChallengeStore, ChallengeSync, DifficultyTier, FriendsService,
    ProgressStore, QuestionBank, SoloTracker,
};
use uuid::Uuid;

/// How many answers may wait for the play task; clicks beyond this are dropped.
const ANSWER_QUEUE: usize = 4;

/// An answer from the client, tagged with the question it was given for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAnswer {
    pub question_id: String,
    pub option_index: usize,
}

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub solo: SoloTracker,
    pub challenges: Arc<ChallengeManager>,
    pub sync: ChallengeSync,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        bank: Arc<QuestionBank>,
        progress: Arc<dyn ProgressStore>,
        challenges: Arc<dyn ChallengeStore>,
        friends: Arc<dyn FriendsService>,
    ) -> Self {
        Self {
            config,
            solo: SoloTracker::new(bank.clone(), progress),
            challenges: Arc::new(ChallengeManager::new(challenges.clone(), friends, bank)),
            sync: ChallengeSync::new(challenges),
        }
    }
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// What the connection is currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    Solo(DifficultyTier),
    Challenge(Uuid),
}

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub user_id: Uuid,
    pub current_mode: SessionMode,
    /// Feeds answers to the running play task, if any.
    pub answer_tx: Option<mpsc::Sender<PlayerAnswer>>,
    /// A token to cancel the current play task and its live round.
    pub cancellation_token: CancellationToken,
}

impl SessionState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_mode: SessionMode::Idle,
            answer_tx: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Stops any running play and prepares a fresh token and answer queue for the next one.
    pub fn begin_play(
        &mut self,
        mode: SessionMode,
    ) -> (CancellationToken, mpsc::Receiver<PlayerAnswer>) {
        self.stop_play();
        let (answer_tx, answer_rx) = mpsc::channel(ANSWER_QUEUE);
        self.cancellation_token = CancellationToken::new();
        self.answer_tx = Some(answer_tx);
        self.current_mode = mode;
        (self.cancellation_token.clone(), answer_rx)
    }

    pub fn stop_play(&mut self) {
        self.cancellation_token.cancel();
        self.answer_tx = None;
        self.current_mode = SessionMode::Idle;
    }
}
