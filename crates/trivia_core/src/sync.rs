//! crates/trivia_core/src/sync.rs
//!
//! Pushes the shared challenge record to each participant as it changes.

use crate::domain::{Challenge, ChallengeStatus};
use crate::error::{EngineError, EngineResult};
use crate::ports::{ChallengeStore, ChallengeStream, PortError};
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

type Callback = Box<dyn FnMut(Challenge) + Send>;

#[derive(Clone)]
pub struct ChallengeSync {
    store: Arc<dyn ChallengeStore>,
}

impl ChallengeSync {
    pub fn new(store: Arc<dyn ChallengeStore>) -> Self {
        Self { store }
    }

    /// Calls `on_change` with the current record, then with every later version.
    ///
    /// A subscriber never sees an earlier status after a later one. The callback
    /// runs on a background task and must not call back into its own `Subscription`.
    pub async fn subscribe<F>(&self, challenge_id: Uuid, on_change: F) -> EngineResult<Subscription>
    where
        F: FnMut(Challenge) + Send + 'static,
    {
        let updates = self
            .store
            .watch_challenge(challenge_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => EngineError::ChallengeNotFound(challenge_id),
                other => EngineError::Persistence(other),
            })?;

        let on_change: Callback = Box::new(on_change);
        let callback = Arc::new(Mutex::new(Some(on_change)));
        let cancelled = CancellationToken::new();
        tokio::spawn(deliver(updates, callback.clone(), cancelled.clone()));
        debug!(%challenge_id, "Challenge subscription opened");

        Ok(Subscription {
            challenge_id,
            callback,
            cancelled,
        })
    }
}

/// Handle for one subscription. Dropping it unsubscribes.
pub struct Subscription {
    challenge_id: Uuid,
    callback: Arc<Mutex<Option<Callback>>>,
    cancelled: CancellationToken,
}

impl Subscription {
    /// Stops delivery. Once this returns the callback is never invoked again.
    pub fn unsubscribe(&self) {
        self.cancelled.cancel();
        let removed = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if removed.is_some() {
            debug!(challenge_id = %self.challenge_id, "Challenge subscription closed");
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn deliver(
    mut updates: ChallengeStream,
    callback: Arc<Mutex<Option<Callback>>>,
    cancelled: CancellationToken,
) {
    let mut last_status: Option<ChallengeStatus> = None;
    loop {
        let next = tokio::select! {
            _ = cancelled.cancelled() => break,
            next = updates.next() => next,
        };
        let Some(challenge) = next else { break };

        if last_status.is_some_and(|last| challenge.status < last) {
            debug!(
                challenge_id = %challenge.id,
                status = %challenge.status,
                "Dropping stale challenge update"
            );
            continue;
        }
        last_status = Some(challenge.status);

        let mut guard = callback.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(on_change) => on_change(challenge),
            None => break,
        }
    }
}
