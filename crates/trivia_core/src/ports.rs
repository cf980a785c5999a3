//! crates/trivia_core/src/ports.rs
//!
//! Defines the service contracts (traits) the engine relies on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the backing store and the identity service.

use crate::domain::{Challenge, ChallengeStatus, PlayerSide, SoloProgress};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A conditional write found the record in a different state than required.
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Full challenge records, pushed whenever the stored record changes.
pub type ChallengeStream = Pin<Box<dyn Stream<Item = Challenge> + Send>>;

//=========================================================================================
// Challenge Updates
//=========================================================================================

/// The only writes a challenge record accepts. Each is applied atomically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeUpdate {
    /// Compare-and-set on `status`.
    Transition {
        from: ChallengeStatus,
        to: ChallengeStatus,
    },
    /// Increments one side's counters; the other side's fields are untouched.
    RecordAnswer {
        side: PlayerSide,
        correct: bool,
        finished: bool,
    },
    /// Flips `Active` to `Finished` when both sides are done. Safe to repeat.
    FinishIfComplete,
}

#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub challenge: Challenge,
    /// False when the update was a no-op (only possible for `FinishIfComplete`).
    pub changed: bool,
}

impl ChallengeUpdate {
    /// Applies the update to an in-memory record with the same semantics the stores use.
    pub fn apply(self, challenge: &mut Challenge) -> PortResult<bool> {
        match self {
            ChallengeUpdate::Transition { from, to } => {
                if challenge.status != from {
                    return Err(PortError::Conflict(format!(
                        "challenge {} is {}, expected {}",
                        challenge.id, challenge.status, from
                    )));
                }
                challenge.status = to;
                Ok(true)
            }
            ChallengeUpdate::RecordAnswer {
                side,
                correct,
                finished,
            } => {
                if challenge.status != ChallengeStatus::Active {
                    return Err(PortError::Conflict(format!(
                        "challenge {} is {}, answers need active",
                        challenge.id, challenge.status
                    )));
                }
                let score = challenge.score_mut(side);
                if score.has_finished {
                    return Err(PortError::Conflict(format!(
                        "{:?} already finished challenge {}",
                        side, challenge.id
                    )));
                }
                if correct {
                    score.correct_count += 1;
                } else {
                    score.wrong_count += 1;
                }
                score.has_finished = finished;
                Ok(true)
            }
            ChallengeUpdate::FinishIfComplete => {
                if challenge.status == ChallengeStatus::Active && challenge.both_finished() {
                    challenge.status = ChallengeStatus::Finished;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load_progress(&self, user_id: Uuid) -> PortResult<Option<SoloProgress>>;

    /// Inserts or replaces the user's record.
    async fn save_progress(&self, progress: &SoloProgress) -> PortResult<()>;
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn create_challenge(&self, challenge: &Challenge) -> PortResult<()>;

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge>;

    async fn update_challenge(
        &self,
        challenge_id: Uuid,
        update: ChallengeUpdate,
    ) -> PortResult<UpdateResult>;

    /// Challenges where the user plays either side, newest first.
    async fn challenges_for_user(&self, user_id: Uuid) -> PortResult<Vec<Challenge>>;

    /// Yields the current record at once, then the full record after every change.
    async fn watch_challenge(&self, challenge_id: Uuid) -> PortResult<ChallengeStream>;
}

#[async_trait]
pub trait FriendsService: Send + Sync {
    async fn is_friend(&self, user_a: Uuid, user_b: Uuid) -> PortResult<bool>;
}
