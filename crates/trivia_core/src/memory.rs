//! crates/trivia_core/src/memory.rs
//!
//! An in-process implementation of every port. Each challenge record lives in its
//! own watch channel, which both serializes writes to that record and doubles as
//! its change feed.

use crate::domain::{Challenge, SoloProgress};
use crate::ports::{
    ChallengeStore, ChallengeStream, ChallengeUpdate, FriendsService, PortError, PortResult,
    ProgressStore, UpdateResult,
};
use async_trait::async_trait;
use futures::stream;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    progress: RwLock<HashMap<Uuid, SoloProgress>>,
    challenges: RwLock<HashMap<Uuid, watch::Sender<Challenge>>>,
    friendships: RwLock<HashSet<(Uuid, Uuid)>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mutual friendship.
    pub async fn add_friendship(&self, user_a: Uuid, user_b: Uuid) {
        let mut friendships = self.friendships.write().await;
        friendships.insert((user_a, user_b));
        friendships.insert((user_b, user_a));
    }

    /// While set, every write fails with `PortError::Unexpected`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("store is unavailable".to_string()));
        }
        Ok(())
    }
}

fn missing(challenge_id: Uuid) -> PortError {
    PortError::NotFound(format!("Challenge {} not found", challenge_id))
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn load_progress(&self, user_id: Uuid) -> PortResult<Option<SoloProgress>> {
        Ok(self.progress.read().await.get(&user_id).cloned())
    }

    async fn save_progress(&self, progress: &SoloProgress) -> PortResult<()> {
        self.check_writable()?;
        self.progress
            .write()
            .await
            .insert(progress.user_id, progress.clone());
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for InMemoryStore {
    async fn create_challenge(&self, challenge: &Challenge) -> PortResult<()> {
        self.check_writable()?;
        let mut challenges = self.challenges.write().await;
        if challenges.contains_key(&challenge.id) {
            return Err(PortError::Conflict(format!(
                "Challenge {} already exists",
                challenge.id
            )));
        }
        let (sender, _) = watch::channel(challenge.clone());
        challenges.insert(challenge.id, sender);
        Ok(())
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge> {
        let challenges = self.challenges.read().await;
        let sender = challenges.get(&challenge_id).ok_or_else(|| missing(challenge_id))?;
        let challenge = sender.borrow().clone();
        Ok(challenge)
    }

    async fn update_challenge(
        &self,
        challenge_id: Uuid,
        update: ChallengeUpdate,
    ) -> PortResult<UpdateResult> {
        self.check_writable()?;
        let challenges = self.challenges.read().await;
        let sender = challenges.get(&challenge_id).ok_or_else(|| missing(challenge_id))?;

        let mut applied = Err(PortError::Unexpected("update not applied".to_string()));
        sender.send_if_modified(|challenge| {
            let mut candidate = challenge.clone();
            applied = update.apply(&mut candidate).map(|changed| (candidate.clone(), changed));
            match &applied {
                Ok((_, true)) => {
                    *challenge = candidate;
                    true
                }
                _ => false,
            }
        });

        let (challenge, changed) = applied?;
        Ok(UpdateResult { challenge, changed })
    }

    async fn challenges_for_user(&self, user_id: Uuid) -> PortResult<Vec<Challenge>> {
        let challenges = self.challenges.read().await;
        let mut found: Vec<Challenge> = challenges
            .values()
            .map(|sender| sender.borrow().clone())
            .filter(|c| c.initiator_id == user_id || c.opponent_id == user_id)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn watch_challenge(&self, challenge_id: Uuid) -> PortResult<ChallengeStream> {
        let receiver = {
            let challenges = self.challenges.read().await;
            challenges
                .get(&challenge_id)
                .ok_or_else(|| missing(challenge_id))?
                .subscribe()
        };

        let updates = stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if !first {
                receiver.changed().await.ok()?;
            }
            let challenge = receiver.borrow_and_update().clone();
            Some((challenge, (receiver, false)))
        });
        Ok(Box::pin(updates))
    }
}

#[async_trait]
impl FriendsService for InMemoryStore {
    async fn is_friend(&self, user_a: Uuid, user_b: Uuid) -> PortResult<bool> {
        Ok(self.friendships.read().await.contains(&(user_a, user_b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChallengeStatus, DifficultyTier, PlayerSide};
    use futures::StreamExt;

    #[tokio::test]
    async fn friendships_are_mutual() {
        let store = InMemoryStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.add_friendship(a, b).await;

        assert!(store.is_friend(a, b).await.unwrap());
        assert!(store.is_friend(b, a).await.unwrap());
        assert!(!store.is_friend(a, c).await.unwrap());
    }

    #[tokio::test]
    async fn failed_conditional_update_leaves_record_untouched() {
        let store = InMemoryStore::new();
        let challenge = Challenge::new(Uuid::new_v4(), Uuid::new_v4(), DifficultyTier::Easy, 2);
        store.create_challenge(&challenge).await.unwrap();

        let err = store
            .update_challenge(
                challenge.id,
                ChallengeUpdate::RecordAnswer {
                    side: PlayerSide::Initiator,
                    correct: true,
                    finished: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.get_challenge(challenge.id).await.unwrap(), challenge);
    }

    #[tokio::test]
    async fn watch_yields_current_then_changes() {
        let store = InMemoryStore::new();
        let challenge = Challenge::new(Uuid::new_v4(), Uuid::new_v4(), DifficultyTier::Easy, 2);
        store.create_challenge(&challenge).await.unwrap();

        let mut updates = store.watch_challenge(challenge.id).await.unwrap();
        assert_eq!(updates.next().await.unwrap().status, ChallengeStatus::Pending);

        store
            .update_challenge(
                challenge.id,
                ChallengeUpdate::Transition {
                    from: ChallengeStatus::Pending,
                    to: ChallengeStatus::Accepted,
                },
            )
            .await
            .unwrap();
        assert_eq!(updates.next().await.unwrap().status, ChallengeStatus::Accepted);
    }

    #[tokio::test]
    async fn unknown_challenge_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_challenge(Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
        assert!(store.watch_challenge(Uuid::new_v4()).await.is_err());
    }
}
