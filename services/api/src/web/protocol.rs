//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API
//! server, and the JSON views of engine records shared with the REST endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trivia_core::domain::{
    Challenge, ChallengeOutcome, ChallengeStatus, DifficultyTier, PlayerScore, Question,
    SoloProgress,
};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Shared Views
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TierDto {
    Easy,
    Medium,
    Hard,
    VeryHard,
    Impossible,
}

impl From<TierDto> for DifficultyTier {
    fn from(tier: TierDto) -> Self {
        match tier {
            TierDto::Easy => DifficultyTier::Easy,
            TierDto::Medium => DifficultyTier::Medium,
            TierDto::Hard => DifficultyTier::Hard,
            TierDto::VeryHard => DifficultyTier::VeryHard,
            TierDto::Impossible => DifficultyTier::Impossible,
        }
    }
}

impl From<DifficultyTier> for TierDto {
    fn from(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => TierDto::Easy,
            DifficultyTier::Medium => TierDto::Medium,
            DifficultyTier::Hard => TierDto::Hard,
            DifficultyTier::VeryHard => TierDto::VeryHard,
            DifficultyTier::Impossible => TierDto::Impossible,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusDto {
    Pending,
    Accepted,
    Active,
    Finished,
}

impl From<ChallengeStatus> for StatusDto {
    fn from(status: ChallengeStatus) -> Self {
        match status {
            ChallengeStatus::Pending => StatusDto::Pending,
            ChallengeStatus::Accepted => StatusDto::Accepted,
            ChallengeStatus::Active => StatusDto::Active,
            ChallengeStatus::Finished => StatusDto::Finished,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ScoreView {
    pub correct_count: u32,
    pub wrong_count: u32,
    pub has_finished: bool,
}

impl From<PlayerScore> for ScoreView {
    fn from(score: PlayerScore) -> Self {
        Self {
            correct_count: score.correct_count,
            wrong_count: score.wrong_count,
            has_finished: score.has_finished,
        }
    }
}

/// The shared challenge record as both participants see it.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ChallengeView {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub opponent_id: Uuid,
    pub tier: TierDto,
    pub question_count: u32,
    pub status: StatusDto,
    pub initiator_score: ScoreView,
    pub opponent_score: ScoreView,
    pub created_at: DateTime<Utc>,
    /// Set once finished, unless the match was drawn.
    pub winner_id: Option<Uuid>,
    pub is_draw: bool,
}

impl From<&Challenge> for ChallengeView {
    fn from(c: &Challenge) -> Self {
        let outcome = c.outcome();
        Self {
            id: c.id,
            initiator_id: c.initiator_id,
            opponent_id: c.opponent_id,
            tier: c.tier.into(),
            question_count: c.question_count,
            status: c.status.into(),
            initiator_score: c.initiator_score.into(),
            opponent_score: c.opponent_score.into(),
            created_at: c.created_at,
            winner_id: match outcome {
                Some(ChallengeOutcome::Winner(id)) => Some(id),
                _ => None,
            },
            is_draw: outcome == Some(ChallengeOutcome::Draw),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub current_tier: TierDto,
    pub questions_answered: u32,
    pub correct_answers: u32,
}

impl From<&SoloProgress> for ProgressView {
    fn from(p: &SoloProgress) -> Self {
        Self {
            current_tier: p.current_tier.into(),
            questions_answered: p.questions_answered,
            correct_answers: p.correct_answers,
        }
    }
}

/// A question as shown to the player. The correct option is never sent ahead of feedback.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub tier: TierDto,
    pub time_limit_seconds: u32,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            tier: q.tier.into(),
            time_limit_seconds: q.time_limit_seconds,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts solo play on a tier at or below the player's unlocked tier.
    StartSolo { tier: TierDto },

    /// Attaches to a challenge; play begins once the initiator has started it.
    JoinChallenge { challenge_id: Uuid },

    /// Picks an option for the live question. Answers naming any other question are ignored.
    Answer {
        question_id: String,
        option_index: usize,
    },

    /// Abandons whatever is being played.
    Leave,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A new question is live. `total` is only known in challenges.
    Question {
        question: QuestionView,
        index: usize,
        total: Option<usize>,
    },

    /// The countdown for the live question.
    Tick { seconds_remaining: u32 },

    /// The live question was answered or timed out.
    Feedback {
        question_id: String,
        correct: bool,
        timed_out: bool,
        correct_option_index: usize,
    },

    Progress { progress: ProgressView },

    TierAdvanced { tier: TierDto },

    /// Every question in the tier has been attempted.
    TierComplete { tier: TierDto },

    ChallengeUpdated { challenge: ChallengeView },

    /// Nothing more will be played on this session.
    SessionEnded,

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_messages() {
        let start: ClientMessage =
            serde_json::from_str(r#"{"type":"start_solo","tier":"very_hard"}"#).unwrap();
        assert_eq!(start, ClientMessage::StartSolo { tier: TierDto::VeryHard });

        let answer: ClientMessage =
            serde_json::from_str(r#"{"type":"answer","question_id":"e-01","option_index":2}"#)
                .unwrap();
        assert_eq!(
            answer,
            ClientMessage::Answer {
                question_id: "e-01".into(),
                option_index: 2,
            }
        );
        let untagged_answer = r#"{"type":"answer","option_index":2}"#;
        assert!(serde_json::from_str::<ClientMessage>(untagged_answer).is_err());

        let leave: ClientMessage = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert_eq!(leave, ClientMessage::Leave);

        let unknown_tier = r#"{"type":"start_solo","tier":"legendary"}"#;
        assert!(serde_json::from_str::<ClientMessage>(unknown_tier).is_err());
    }

    #[test]
    fn question_view_hides_the_answer() {
        let question = Question {
            id: "h-01".into(),
            text: "Which element has the atomic number 26?".into(),
            options: vec!["Iron".into(), "Cobalt".into()],
            correct_option_index: 0,
            tier: DifficultyTier::Hard,
            time_limit_seconds: 20,
        };
        let message = ServerMessage::Question {
            question: (&question).into(),
            index: 0,
            total: Some(10),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "question");
        assert_eq!(json["question"]["tier"], "hard");
        assert!(json["question"].get("correct_option_index").is_none());
    }

    #[test]
    fn finished_challenge_view_names_the_winner() {
        let mut challenge =
            Challenge::new(Uuid::new_v4(), Uuid::new_v4(), DifficultyTier::Easy, 2);
        challenge.status = ChallengeStatus::Finished;
        challenge.opponent_score.correct_count = 2;

        let view = ChallengeView::from(&challenge);
        assert_eq!(view.status, StatusDto::Finished);
        assert_eq!(view.winner_id, Some(challenge.opponent_id));
        assert!(!view.is_draw);
    }
}
