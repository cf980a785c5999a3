//! crates/trivia_core/src/challenge.rs
//!
//! The two-party challenge protocol.
//!
//! A challenge moves `Pending → Accepted → Active → Finished`. Each participant
//! only ever writes its own score; the flip to `Finished` is an idempotent check
//! run by whichever side's final answer lands second.

use crate::domain::{Challenge, ChallengeStatus, DifficultyTier, Question, RoundOutcome};
use crate::error::{EngineError, EngineResult};
use crate::ports::{ChallengeStore, ChallengeUpdate, FriendsService, PortError};
use crate::question_bank::QuestionBank;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

//=========================================================================================
// Lifecycle Manager
//=========================================================================================

pub struct ChallengeManager {
    store: Arc<dyn ChallengeStore>,
    friends: Arc<dyn FriendsService>,
    bank: Arc<QuestionBank>,
}

impl ChallengeManager {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        friends: Arc<dyn FriendsService>,
        bank: Arc<QuestionBank>,
    ) -> Self {
        Self {
            store,
            friends,
            bank,
        }
    }

    /// Invites a friend. Nothing is stored unless every check passes.
    pub async fn create(
        &self,
        initiator_id: Uuid,
        opponent_id: Uuid,
        tier: DifficultyTier,
        question_count: u32,
    ) -> EngineResult<Challenge> {
        if opponent_id == initiator_id
            || !self.friends.is_friend(initiator_id, opponent_id).await?
        {
            warn!(%initiator_id, %opponent_id, "Rejected challenge to a non-friend");
            return Err(EngineError::InvalidOpponent(opponent_id));
        }

        let available = self.bank.tier_len(tier);
        if question_count == 0 || question_count as usize > available {
            return Err(EngineError::InvalidQuestionCount {
                tier,
                requested: question_count,
                available,
            });
        }

        let challenge = Challenge::new(initiator_id, opponent_id, tier, question_count);
        self.store.create_challenge(&challenge).await?;
        info!(
            challenge_id = %challenge.id,
            %initiator_id,
            %opponent_id,
            %tier,
            question_count,
            "Challenge created"
        );
        Ok(challenge)
    }

    pub async fn get(&self, challenge_id: Uuid) -> EngineResult<Challenge> {
        self.store
            .get_challenge(challenge_id)
            .await
            .map_err(|e| store_error(challenge_id, e))
    }

    pub async fn challenges_for(&self, user_id: Uuid) -> EngineResult<Vec<Challenge>> {
        Ok(self.store.challenges_for_user(user_id).await?)
    }

    /// Only the invited opponent may accept, and only while pending.
    pub async fn accept(&self, challenge_id: Uuid, user_id: Uuid) -> EngineResult<Challenge> {
        let challenge = self.get(challenge_id).await?;
        if challenge.opponent_id != user_id {
            return Err(EngineError::NotAuthorized {
                user_id,
                challenge_id,
                action: "accept",
            });
        }
        self.transition(
            &challenge,
            ChallengeStatus::Pending,
            ChallengeStatus::Accepted,
            "accept",
        )
        .await
    }

    /// Only the initiator may start, and only once the opponent has accepted.
    pub async fn start(&self, challenge_id: Uuid, user_id: Uuid) -> EngineResult<Challenge> {
        let challenge = self.get(challenge_id).await?;
        if challenge.initiator_id != user_id {
            return Err(EngineError::NotAuthorized {
                user_id,
                challenge_id,
                action: "start",
            });
        }
        self.transition(
            &challenge,
            ChallengeStatus::Accepted,
            ChallengeStatus::Active,
            "start",
        )
        .await
    }

    /// Writes one answer to the caller's own score, then runs the finish check if
    /// this write made both sides done. If only the check fails, the written record
    /// is returned still `Active`.
    pub async fn record_answer(
        &self,
        challenge_id: Uuid,
        player_id: Uuid,
        correct: bool,
        is_last_question: bool,
    ) -> EngineResult<Challenge> {
        let challenge = self.get(challenge_id).await?;
        let side = challenge
            .side_of(player_id)
            .ok_or(EngineError::NotAParticipant {
                user_id: player_id,
                challenge_id,
            })?;
        if challenge.status != ChallengeStatus::Active {
            return Err(EngineError::InvalidState {
                challenge_id,
                actual: challenge.status,
                action: "record an answer",
            });
        }
        if challenge.score(side).has_finished {
            return Err(EngineError::InvalidState {
                challenge_id,
                actual: challenge.status,
                action: "record an answer after finishing",
            });
        }

        let update = ChallengeUpdate::RecordAnswer {
            side,
            correct,
            finished: is_last_question,
        };
        let written = match self.store.update_challenge(challenge_id, update).await {
            Ok(result) => result.challenge,
            Err(PortError::Conflict(_)) => {
                let current = self.get(challenge_id).await?;
                return Err(EngineError::InvalidState {
                    challenge_id,
                    actual: current.status,
                    action: "record an answer",
                });
            }
            Err(e) => return Err(store_error(challenge_id, e)),
        };

        if !written.both_finished() {
            return Ok(written);
        }
        // The answer is stored either way; a failed flip is retried by `ChallengeRun::begin`.
        match self.finish_if_complete(challenge_id).await {
            Ok((finished, _)) => Ok(finished),
            Err(e) => {
                warn!(%challenge_id, error = %e, "Answer recorded but finish check failed");
                Ok(written)
            }
        }
    }

    /// Flips an active challenge to `Finished` when both players are done. Repeating
    /// the check is harmless; the flag reports whether this call did the flip.
    pub async fn finish_if_complete(&self, challenge_id: Uuid) -> EngineResult<(Challenge, bool)> {
        let result = self
            .store
            .update_challenge(challenge_id, ChallengeUpdate::FinishIfComplete)
            .await
            .map_err(|e| store_error(challenge_id, e))?;

        if result.changed {
            let c = &result.challenge;
            info!(
                %challenge_id,
                initiator_correct = c.initiator_score.correct_count,
                opponent_correct = c.opponent_score.correct_count,
                "Challenge finished"
            );
        }
        Ok((result.challenge, result.changed))
    }

    /// The identical question list both players answer: a prefix of the tier catalog.
    pub fn question_set(&self, challenge: &Challenge) -> Vec<Question> {
        self.bank
            .challenge_set(challenge.tier, challenge.question_count as usize)
            .to_vec()
    }

    async fn transition(
        &self,
        challenge: &Challenge,
        from: ChallengeStatus,
        to: ChallengeStatus,
        action: &'static str,
    ) -> EngineResult<Challenge> {
        let challenge_id = challenge.id;
        if challenge.status != from {
            return Err(EngineError::InvalidState {
                challenge_id,
                actual: challenge.status,
                action,
            });
        }

        match self
            .store
            .update_challenge(challenge_id, ChallengeUpdate::Transition { from, to })
            .await
        {
            Ok(result) => {
                info!(%challenge_id, %from, %to, "Challenge transitioned");
                Ok(result.challenge)
            }
            Err(PortError::Conflict(_)) => {
                let current = self.get(challenge_id).await?;
                Err(EngineError::InvalidState {
                    challenge_id,
                    actual: current.status,
                    action,
                })
            }
            Err(e) => Err(store_error(challenge_id, e)),
        }
    }
}

fn store_error(challenge_id: Uuid, error: PortError) -> EngineError {
    match error {
        PortError::NotFound(_) => EngineError::ChallengeNotFound(challenge_id),
        other => EngineError::Persistence(other),
    }
}

//=========================================================================================
// Per-player Driver
//=========================================================================================

/// One player's pass through an active challenge's question set.
pub struct ChallengeRun {
    manager: Arc<ChallengeManager>,
    challenge_id: Uuid,
    player_id: Uuid,
    questions: Vec<Question>,
    next_index: usize,
}

impl ChallengeRun {
    /// Resumes after however many answers this player has already recorded.
    /// Also completes a challenge left `Active` after both players finished.
    pub async fn begin(
        manager: Arc<ChallengeManager>,
        challenge_id: Uuid,
        player_id: Uuid,
    ) -> EngineResult<Self> {
        let challenge = manager.get(challenge_id).await?;
        let side = challenge
            .side_of(player_id)
            .ok_or(EngineError::NotAParticipant {
                user_id: player_id,
                challenge_id,
            })?;
        if challenge.status != ChallengeStatus::Active {
            return Err(EngineError::InvalidState {
                challenge_id,
                actual: challenge.status,
                action: "play",
            });
        }

        if challenge.both_finished() {
            manager.finish_if_complete(challenge_id).await?;
        }

        let questions = manager.question_set(&challenge);
        let score = challenge.score(side);
        let next_index = if score.has_finished {
            questions.len()
        } else {
            (score.answered() as usize).min(questions.len())
        };

        Ok(Self {
            manager,
            challenge_id,
            player_id,
            questions,
            next_index,
        })
    }

    pub fn challenge_id(&self) -> Uuid {
        self.challenge_id
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.next_index)
    }

    /// Zero-based index of the current question and the set size.
    pub fn position(&self) -> (usize, usize) {
        (self.next_index, self.questions.len())
    }

    pub fn is_done(&self) -> bool {
        self.next_index >= self.questions.len()
    }

    /// Records a settled round for the current question and moves to the next.
    /// A timed-out round counts as wrong and still advances.
    pub async fn record(&mut self, outcome: &RoundOutcome) -> EngineResult<Challenge> {
        let matches_current = self
            .current_question()
            .is_some_and(|q| q.id == outcome.question_id);
        if !matches_current {
            return Err(EngineError::QuestionNotLive(outcome.question_id.clone()));
        }

        let is_last = self.next_index + 1 == self.questions.len();
        let challenge = self
            .manager
            .record_answer(self.challenge_id, self.player_id, outcome.correct, is_last)
            .await?;
        self.next_index += 1;
        Ok(challenge)
    }
}
