//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the store and friends ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgListener;
use sqlx::{FromRow, PgPool};
use tracing::{error, warn};
use trivia_core::domain::{Challenge, PlayerScore, SoloProgress};
use trivia_core::ports::{
    ChallengeStore, ChallengeStream, ChallengeUpdate, FriendsService, PortError, PortResult,
    ProgressStore, UpdateResult,
};
use uuid::Uuid;

/// Channel the `challenges` trigger notifies on, with the row id as payload.
const CHANGE_CHANNEL: &str = "challenge_changes";

const CHALLENGE_COLUMNS: &str = "id, initiator_id, opponent_id, tier, question_count, status, \
     initiator_correct, initiator_wrong, initiator_finished, \
     opponent_correct, opponent_wrong, opponent_finished, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProgressStore`, `ChallengeStore`
/// and `FriendsService` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(challenge_id: Uuid) -> PortError {
    PortError::NotFound(format!("Challenge {} not found", challenge_id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProgressRecord {
    user_id: Uuid,
    current_tier: String,
    questions_answered: i32,
    correct_answers: i32,
    answered_question_ids: Vec<String>,
}
impl ProgressRecord {
    fn to_domain(self) -> PortResult<SoloProgress> {
        Ok(SoloProgress {
            user_id: self.user_id,
            current_tier: self.current_tier.parse().map_err(PortError::Unexpected)?,
            questions_answered: self.questions_answered as u32,
            correct_answers: self.correct_answers as u32,
            answered_question_ids: self.answered_question_ids.into_iter().collect(),
        })
    }
}

#[derive(FromRow)]
struct ChallengeRecord {
    id: Uuid,
    initiator_id: Uuid,
    opponent_id: Uuid,
    tier: String,
    question_count: i32,
    status: String,
    initiator_correct: i32,
    initiator_wrong: i32,
    initiator_finished: bool,
    opponent_correct: i32,
    opponent_wrong: i32,
    opponent_finished: bool,
    created_at: DateTime<Utc>,
}
impl ChallengeRecord {
    fn to_domain(self) -> PortResult<Challenge> {
        Ok(Challenge {
            id: self.id,
            initiator_id: self.initiator_id,
            opponent_id: self.opponent_id,
            tier: self.tier.parse().map_err(PortError::Unexpected)?,
            question_count: self.question_count as u32,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            initiator_score: PlayerScore {
                correct_count: self.initiator_correct as u32,
                wrong_count: self.initiator_wrong as u32,
                has_finished: self.initiator_finished,
            },
            opponent_score: PlayerScore {
                correct_count: self.opponent_correct as u32,
                wrong_count: self.opponent_wrong as u32,
                has_finished: self.opponent_finished,
            },
            created_at: self.created_at,
        })
    }
}

async fn fetch_challenge(pool: &PgPool, challenge_id: Uuid) -> PortResult<Challenge> {
    let record = sqlx::query_as::<_, ChallengeRecord>(&format!(
        "SELECT {} FROM challenges WHERE id = $1",
        CHALLENGE_COLUMNS
    ))
    .bind(challenge_id)
    .fetch_optional(pool)
    .await
    .map_err(unexpected)?
    .ok_or_else(|| not_found(challenge_id))?;
    record.to_domain()
}

//=========================================================================================
// `ProgressStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProgressStore for DbAdapter {
    async fn load_progress(&self, user_id: Uuid) -> PortResult<Option<SoloProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, current_tier, questions_answered, correct_answers, \
                    answered_question_ids \
             FROM solo_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(ProgressRecord::to_domain).transpose()
    }

    async fn save_progress(&self, progress: &SoloProgress) -> PortResult<()> {
        let answered: Vec<String> = progress.answered_question_ids.iter().cloned().collect();
        sqlx::query(
            "INSERT INTO solo_progress \
                 (user_id, current_tier, questions_answered, correct_answers, \
                  answered_question_ids) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 current_tier = EXCLUDED.current_tier, \
                 questions_answered = EXCLUDED.questions_answered, \
                 correct_answers = EXCLUDED.correct_answers, \
                 answered_question_ids = EXCLUDED.answered_question_ids, \
                 updated_at = NOW()",
        )
        .bind(progress.user_id)
        .bind(progress.current_tier.as_str())
        .bind(progress.questions_answered as i32)
        .bind(progress.correct_answers as i32)
        .bind(answered)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `ChallengeStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChallengeStore for DbAdapter {
    async fn create_challenge(&self, challenge: &Challenge) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO challenges \
                 (id, initiator_id, opponent_id, tier, question_count, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(challenge.id)
        .bind(challenge.initiator_id)
        .bind(challenge.opponent_id)
        .bind(challenge.tier.as_str())
        .bind(challenge.question_count as i32)
        .bind(challenge.status.as_str())
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge> {
        fetch_challenge(&self.pool, challenge_id).await
    }

    /// Applies the update under a row lock, so writes from the two participants
    /// are serialized per challenge.
    async fn update_challenge(
        &self,
        challenge_id: Uuid,
        update: ChallengeUpdate,
    ) -> PortResult<UpdateResult> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ChallengeRecord>(&format!(
            "SELECT {} FROM challenges WHERE id = $1 FOR UPDATE",
            CHALLENGE_COLUMNS
        ))
        .bind(challenge_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| not_found(challenge_id))?;

        let mut challenge = record.to_domain()?;
        let changed = update.apply(&mut challenge)?;

        if changed {
            sqlx::query(
                "UPDATE challenges SET status = $2, \
                     initiator_correct = $3, initiator_wrong = $4, initiator_finished = $5, \
                     opponent_correct = $6, opponent_wrong = $7, opponent_finished = $8 \
                 WHERE id = $1",
            )
            .bind(challenge_id)
            .bind(challenge.status.as_str())
            .bind(challenge.initiator_score.correct_count as i32)
            .bind(challenge.initiator_score.wrong_count as i32)
            .bind(challenge.initiator_score.has_finished)
            .bind(challenge.opponent_score.correct_count as i32)
            .bind(challenge.opponent_score.wrong_count as i32)
            .bind(challenge.opponent_score.has_finished)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(UpdateResult { challenge, changed })
    }

    async fn challenges_for_user(&self, user_id: Uuid) -> PortResult<Vec<Challenge>> {
        let records = sqlx::query_as::<_, ChallengeRecord>(&format!(
            "SELECT {} FROM challenges WHERE initiator_id = $1 OR opponent_id = $1 \
             ORDER BY created_at DESC",
            CHALLENGE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(ChallengeRecord::to_domain).collect()
    }

    /// Listens before reading the current row, so no change between the two is missed.
    /// If the listener connection drops, the row is re-read once it reconnects.
    async fn watch_challenge(&self, challenge_id: Uuid) -> PortResult<ChallengeStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(unexpected)?;
        listener.listen(CHANGE_CHANNEL).await.map_err(unexpected)?;

        let initial = fetch_challenge(&self.pool, challenge_id).await?;
        let pool = self.pool.clone();
        let payload = challenge_id.to_string();

        let updates = stream! {
            yield initial;
            loop {
                let refresh = match listener.try_recv().await {
                    Ok(Some(notification)) => notification.payload() == payload,
                    Ok(None) => {
                        warn!(%challenge_id, "Challenge listener reconnected; re-reading record");
                        true
                    }
                    Err(e) => {
                        error!(%challenge_id, error = %e, "Challenge listener failed");
                        break;
                    }
                };
                if !refresh {
                    continue;
                }
                match fetch_challenge(&pool, challenge_id).await {
                    Ok(challenge) => yield challenge,
                    Err(e) => {
                        error!(%challenge_id, error = %e, "Failed to re-read watched challenge");
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(updates))
    }
}

//=========================================================================================
// `FriendsService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FriendsService for DbAdapter {
    async fn is_friend(&self, user_a: Uuid, user_b: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (\
                 SELECT 1 FROM friendships \
                 WHERE accepted \
                   AND ((user_a = $1 AND user_b = $2) OR (user_a = $2 AND user_b = $1))\
             )",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }
}
