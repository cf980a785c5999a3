//! crates/trivia_core/src/domain.rs
//!
//! Defines the pure, core data structures for the trivia engine.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Questions and Tiers
//=========================================================================================

/// The five difficulty levels, in progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    VeryHard,
    Impossible,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 5] = [
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
        DifficultyTier::VeryHard,
        DifficultyTier::Impossible,
    ];

    /// The tier after this one, or `None` at the top of the ladder.
    pub fn next(self) -> Option<DifficultyTier> {
        match self {
            DifficultyTier::Easy => Some(DifficultyTier::Medium),
            DifficultyTier::Medium => Some(DifficultyTier::Hard),
            DifficultyTier::Hard => Some(DifficultyTier::VeryHard),
            DifficultyTier::VeryHard => Some(DifficultyTier::Impossible),
            DifficultyTier::Impossible => None,
        }
    }

    pub fn is_max(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
            DifficultyTier::VeryHard => "very_hard",
            DifficultyTier::Impossible => "impossible",
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DifficultyTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| format!("unknown difficulty tier '{}'", s))
    }
}

/// A single multiple-choice question. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub tier: DifficultyTier,
    pub time_limit_seconds: u32,
}

impl Question {
    /// A timeout (`None`) never matches the correct option.
    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected == Some(self.correct_option_index)
    }
}

//=========================================================================================
// Solo Progression
//=========================================================================================

/// One user's position on the solo ladder. Created lazily at `Easy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoloProgress {
    pub user_id: Uuid,
    pub current_tier: DifficultyTier,
    pub questions_answered: u32,
    pub correct_answers: u32,
    /// Every attempted question id, correct or not.
    pub answered_question_ids: BTreeSet<String>,
}

impl SoloProgress {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_tier: DifficultyTier::Easy,
            questions_answered: 0,
            correct_answers: 0,
            answered_question_ids: BTreeSet::new(),
        }
    }
}

//=========================================================================================
// Challenges
//=========================================================================================

/// Which participant of a challenge a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSide {
    Initiator,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerScore {
    pub correct_count: u32,
    pub wrong_count: u32,
    pub has_finished: bool,
}

impl PlayerScore {
    pub fn answered(&self) -> u32 {
        self.correct_count + self.wrong_count
    }
}

/// Lifecycle of a shared challenge record. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Active,
    Finished,
}

impl ChallengeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Accepted => "accepted",
            ChallengeStatus::Active => "active",
            ChallengeStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChallengeStatus::Pending),
            "accepted" => Ok(ChallengeStatus::Accepted),
            "active" => Ok(ChallengeStatus::Active),
            "finished" => Ok(ChallengeStatus::Finished),
            other => Err(format!("unknown challenge status '{}'", other)),
        }
    }
}

/// The shared two-party match record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub opponent_id: Uuid,
    pub tier: DifficultyTier,
    pub question_count: u32,
    pub status: ChallengeStatus,
    pub initiator_score: PlayerScore,
    pub opponent_score: PlayerScore,
    pub created_at: DateTime<Utc>,
}

/// How a finished challenge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Winner(Uuid),
    Draw,
}

impl Challenge {
    pub fn new(
        initiator_id: Uuid,
        opponent_id: Uuid,
        tier: DifficultyTier,
        question_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            initiator_id,
            opponent_id,
            tier,
            question_count,
            status: ChallengeStatus::Pending,
            initiator_score: PlayerScore::default(),
            opponent_score: PlayerScore::default(),
            created_at: Utc::now(),
        }
    }

    /// Maps a user to the side they play, if they take part at all.
    pub fn side_of(&self, user_id: Uuid) -> Option<PlayerSide> {
        if user_id == self.initiator_id {
            Some(PlayerSide::Initiator)
        } else if user_id == self.opponent_id {
            Some(PlayerSide::Opponent)
        } else {
            None
        }
    }

    pub fn score(&self, side: PlayerSide) -> &PlayerScore {
        match side {
            PlayerSide::Initiator => &self.initiator_score,
            PlayerSide::Opponent => &self.opponent_score,
        }
    }

    pub fn score_mut(&mut self, side: PlayerSide) -> &mut PlayerScore {
        match side {
            PlayerSide::Initiator => &mut self.initiator_score,
            PlayerSide::Opponent => &mut self.opponent_score,
        }
    }

    pub fn both_finished(&self) -> bool {
        self.initiator_score.has_finished && self.opponent_score.has_finished
    }

    /// Ranks by correct answers; only defined once the challenge is `Finished`.
    pub fn outcome(&self) -> Option<ChallengeOutcome> {
        if self.status != ChallengeStatus::Finished {
            return None;
        }
        let mine = self.initiator_score.correct_count;
        let theirs = self.opponent_score.correct_count;
        Some(match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => ChallengeOutcome::Winner(self.initiator_id),
            std::cmp::Ordering::Less => ChallengeOutcome::Winner(self.opponent_id),
            std::cmp::Ordering::Equal => ChallengeOutcome::Draw,
        })
    }
}

//=========================================================================================
// Rounds
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Loaded,
    Counting,
    Answered,
    TimedOut,
    Settled,
}

impl RoundPhase {
    /// True once an answer or a timeout has been recorded.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            RoundPhase::Answered | RoundPhase::TimedOut | RoundPhase::Settled
        )
    }
}

/// Ephemeral view of the one live question. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub active_question: Question,
    pub phase: RoundPhase,
    pub seconds_remaining: u32,
    pub is_answered: bool,
    pub selected_option_index: Option<usize>,
}

/// What a settled round hands back to its embedding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub question_id: String,
    pub selected_option_index: Option<usize>,
    pub correct: bool,
    pub timed_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_totally_ordered_and_round_trip_through_strings() {
        for pair in DifficultyTier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert!(DifficultyTier::Impossible.is_max());
        assert_eq!("very_hard".parse::<DifficultyTier>(), Ok(DifficultyTier::VeryHard));
        assert!("legendary".parse::<DifficultyTier>().is_err());
    }

    #[test]
    fn outcome_is_only_known_once_finished() {
        let mut challenge = Challenge::new(Uuid::new_v4(), Uuid::new_v4(), DifficultyTier::Easy, 3);
        challenge.initiator_score.correct_count = 2;
        assert_eq!(challenge.outcome(), None);

        challenge.status = ChallengeStatus::Finished;
        assert_eq!(
            challenge.outcome(),
            Some(ChallengeOutcome::Winner(challenge.initiator_id))
        );

        challenge.opponent_score.correct_count = 2;
        assert_eq!(challenge.outcome(), Some(ChallengeOutcome::Draw));
    }

    #[test]
    fn timeout_never_counts_as_correct() {
        let question = Question {
            id: "q".into(),
            text: "?".into(),
            options: vec!["a".into(), "b".into()],
            correct_option_index: 0,
            tier: DifficultyTier::Easy,
            time_limit_seconds: 10,
        };
        assert!(question.is_correct(Some(0)));
        assert!(!question.is_correct(Some(1)));
        assert!(!question.is_correct(None));
    }
}
