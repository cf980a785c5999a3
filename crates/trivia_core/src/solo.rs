//! crates/trivia_core/src/solo.rs
//!
//! The per-user solo ladder: pick the next question of a tier, record answers,
//! and advance tiers once a tier's whole catalog has been attempted.

use crate::domain::{DifficultyTier, Question, RoundOutcome, SoloProgress};
use crate::error::{EngineError, EngineResult};
use crate::ports::ProgressStore;
use crate::question_bank::QuestionBank;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Entry point for solo play; hands out one `SoloSession` per connected player.
#[derive(Clone)]
pub struct SoloTracker {
    bank: Arc<QuestionBank>,
    store: Arc<dyn ProgressStore>,
}

impl SoloTracker {
    pub fn new(bank: Arc<QuestionBank>, store: Arc<dyn ProgressStore>) -> Self {
        Self { bank, store }
    }

    /// Loads the user's progress, creating it at `Easy` on first play.
    pub async fn session(&self, user_id: Uuid) -> EngineResult<SoloSession> {
        let progress = match self.store.load_progress(user_id).await? {
            Some(progress) => progress,
            None => {
                let progress = SoloProgress::new(user_id);
                self.store.save_progress(&progress).await?;
                info!(%user_id, "Created solo progress");
                progress
            }
        };

        Ok(SoloSession {
            bank: self.bank.clone(),
            store: self.store.clone(),
            progress,
            live: None,
        })
    }
}

/// The result of one recorded solo answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoloAnswer {
    pub question_id: String,
    pub correct: bool,
    pub correct_option_index: usize,
    /// Set when this answer completed the current tier.
    pub advanced_to: Option<DifficultyTier>,
}

struct LiveQuestion {
    question: Question,
    answered: bool,
}

pub struct SoloSession {
    bank: Arc<QuestionBank>,
    store: Arc<dyn ProgressStore>,
    progress: SoloProgress,
    live: Option<LiveQuestion>,
}

impl SoloSession {
    pub fn progress(&self) -> &SoloProgress {
        &self.progress
    }

    pub fn live_question(&self) -> Option<&Question> {
        self.live.as_ref().map(|live| &live.question)
    }

    /// Picks the earliest question of `tier`, in catalog order, not yet attempted.
    pub fn start_tier(&mut self, tier: DifficultyTier) -> EngineResult<Question> {
        if tier > self.progress.current_tier {
            return Err(EngineError::TierLocked {
                requested: tier,
                unlocked: self.progress.current_tier,
            });
        }

        let question = self
            .bank
            .questions_for_tier(tier)
            .iter()
            .find(|q| !self.progress.answered_question_ids.contains(&q.id))
            .cloned()
            .ok_or(EngineError::TierComplete(tier))?;

        self.live = Some(LiveQuestion {
            question: question.clone(),
            answered: false,
        });
        Ok(question)
    }

    /// Records an answer (`None` for a timeout) against the live question.
    ///
    /// The progress is updated in memory before it is persisted; on a store failure
    /// the update is kept and `Persistence` is returned.
    pub async fn submit_answer(
        &mut self,
        question_id: &str,
        option_index: Option<usize>,
    ) -> EngineResult<SoloAnswer> {
        let is_live = self
            .live
            .as_ref()
            .is_some_and(|live| live.question.id == question_id);
        if !is_live {
            if self.progress.answered_question_ids.contains(question_id) {
                return Err(EngineError::AlreadyAnswered(question_id.to_string()));
            }
            return Err(EngineError::QuestionNotLive(question_id.to_string()));
        }

        let live = self
            .live
            .as_mut()
            .ok_or_else(|| EngineError::QuestionNotLive(question_id.to_string()))?;
        if live.answered {
            return Err(EngineError::AlreadyAnswered(question_id.to_string()));
        }
        if let Some(index) = option_index {
            if index >= live.question.options.len() {
                return Err(EngineError::InvalidOption {
                    question_id: question_id.to_string(),
                    index,
                });
            }
        }

        live.answered = true;
        let correct = live.question.is_correct(option_index);
        let correct_option_index = live.question.correct_option_index;

        self.progress
            .answered_question_ids
            .insert(question_id.to_string());
        self.progress.questions_answered += 1;
        if correct {
            self.progress.correct_answers += 1;
        }
        let advanced_to = self.advance_if_complete();

        if let Err(e) = self.store.save_progress(&self.progress).await {
            error!(user_id = %self.progress.user_id, error = %e, "Failed to persist solo progress");
            return Err(EngineError::Persistence(e));
        }

        Ok(SoloAnswer {
            question_id: question_id.to_string(),
            correct,
            correct_option_index,
            advanced_to,
        })
    }

    /// Hands a settled round over to the tracker.
    pub async fn settle_round(&mut self, outcome: &RoundOutcome) -> EngineResult<SoloAnswer> {
        self.submit_answer(&outcome.question_id, outcome.selected_option_index)
            .await
    }

    fn advance_if_complete(&mut self) -> Option<DifficultyTier> {
        let tier = self.progress.current_tier;
        let next = tier.next()?;
        let complete = self
            .bank
            .questions_for_tier(tier)
            .iter()
            .all(|q| self.progress.answered_question_ids.contains(&q.id));
        if !complete {
            return None;
        }

        self.progress.current_tier = next;
        info!(user_id = %self.progress.user_id, from = %tier, to = %next, "Solo tier advanced");
        Some(next)
    }
}
