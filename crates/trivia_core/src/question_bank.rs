//! crates/trivia_core/src/question_bank.rs
//!
//! The immutable question catalog, grouped by tier in a stable order.

use crate::domain::{DifficultyTier, Question};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Question {0} needs at least two options")]
    TooFewOptions(String),
    #[error("Question {0} marks a correct option that does not exist")]
    CorrectOptionOutOfRange(String),
    #[error("Question id {0} appears more than once")]
    DuplicateId(String),
}

/// Read-only catalog. Both challenge participants must see the same order, so the
/// order questions are supplied in is the order they are played in.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_tier: HashMap<DifficultyTier, Vec<Question>>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut by_tier: HashMap<DifficultyTier, Vec<Question>> = HashMap::new();
        for question in questions {
            if question.options.len() < 2 {
                return Err(CatalogError::TooFewOptions(question.id));
            }
            if question.correct_option_index >= question.options.len() {
                return Err(CatalogError::CorrectOptionOutOfRange(question.id));
            }
            if !seen.insert(question.id.clone()) {
                return Err(CatalogError::DuplicateId(question.id));
            }
            by_tier.entry(question.tier).or_default().push(question);
        }
        Ok(Self { by_tier })
    }

    /// The tier's questions in catalog order. Empty for a tier with no questions.
    pub fn questions_for_tier(&self, tier: DifficultyTier) -> &[Question] {
        self.by_tier.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tier_len(&self, tier: DifficultyTier) -> usize {
        self.questions_for_tier(tier).len()
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.by_tier
            .values()
            .flat_map(|questions| questions.iter())
            .find(|q| q.id == question_id)
    }

    /// The deterministic subset both challenge participants play: a catalog prefix.
    pub fn challenge_set(&self, tier: DifficultyTier, count: usize) -> &[Question] {
        let questions = self.questions_for_tier(tier);
        &questions[..count.min(questions.len())]
    }
}
