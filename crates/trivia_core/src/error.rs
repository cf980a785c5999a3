//! crates/trivia_core/src/error.rs
//!
//! The single error type returned by every engine operation.

use crate::domain::{ChallengeStatus, DifficultyTier};
use crate::ports::PortError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    // --- Solo path ---
    #[error("Tier {requested} is locked; highest unlocked tier is {unlocked}")]
    TierLocked {
        requested: DifficultyTier,
        unlocked: DifficultyTier,
    },

    #[error("Every question in tier {0} has already been answered")]
    TierComplete(DifficultyTier),

    #[error("Question {0} has already been answered")]
    AlreadyAnswered(String),

    #[error("Question {0} is not the live question")]
    QuestionNotLive(String),

    #[error("Option {index} is out of range for question {question_id}")]
    InvalidOption { question_id: String, index: usize },

    // --- Challenge path ---
    #[error("User {0} cannot be challenged")]
    InvalidOpponent(Uuid),

    #[error("Challenges on tier {tier} need between 1 and {available} questions, got {requested}")]
    InvalidQuestionCount {
        tier: DifficultyTier,
        requested: u32,
        available: usize,
    },

    #[error("User {user_id} may not {action} challenge {challenge_id}")]
    NotAuthorized {
        user_id: Uuid,
        challenge_id: Uuid,
        action: &'static str,
    },

    #[error("Challenge {challenge_id} is {actual}; cannot {action}")]
    InvalidState {
        challenge_id: Uuid,
        actual: ChallengeStatus,
        action: &'static str,
    },

    #[error("User {user_id} is not a participant of challenge {challenge_id}")]
    NotAParticipant { user_id: Uuid, challenge_id: Uuid },

    #[error("Challenge {0} not found")]
    ChallengeNotFound(Uuid),

    // --- Store failures ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),
}

/// A convenience type alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;
