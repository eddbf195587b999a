use std::sync::Arc;

use shared::{domain::AppState, protocol::EventEnvelope};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::{
    normalizer::{AppView, RateNormalizer},
    reducer::reduce,
};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// Feed position of the event that produced `state`; `None` for resets.
    pub sequence: Option<u64>,
    pub state: Arc<AppState>,
}

struct StoreInner {
    state: Arc<AppState>,
    last_sequence: Option<u64>,
}

/// Single-writer holder of the current snapshot.
pub struct StateStore {
    inner: RwLock<StoreInner>,
    updates: broadcast::Sender<StateUpdate>,
}

impl StateStore {
    pub fn new(state: AppState, last_sequence: Option<u64>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(StoreInner {
                state: Arc::new(state),
                last_sequence,
            }),
            updates,
        }
    }

    pub async fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.inner.read().await.state)
    }

    pub async fn last_sequence(&self) -> Option<u64> {
        self.inner.read().await.last_sequence
    }

    /// Snapshot and cursor read under one lock, for checkpointing.
    pub async fn checkpoint(&self) -> (Arc<AppState>, Option<u64>) {
        let guard = self.inner.read().await;
        (Arc::clone(&guard.state), guard.last_sequence)
    }

    pub async fn view(&self, normalizer: &RateNormalizer) -> AppView {
        let state = self.snapshot().await;
        normalizer.normalize(Some(&state))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateUpdate> {
        self.updates.subscribe()
    }

    /// Replace the snapshot wholesale, e.g. after loading a checkpoint.
    pub async fn reset(&self, state: AppState, last_sequence: Option<u64>) {
        let state = Arc::new(state);
        {
            let mut guard = self.inner.write().await;
            guard.state = Arc::clone(&state);
            guard.last_sequence = last_sequence;
        }
        let _ = self.updates.send(StateUpdate {
            sequence: None,
            state,
        });
    }

    /// Reduce one envelope into a new snapshot.
    ///
    /// Envelopes at or below the last applied sequence are replays and are
    /// skipped; `None` is returned for them.
    pub async fn apply(&self, envelope: &EventEnvelope) -> Option<StateUpdate> {
        let update = {
            let mut guard = self.inner.write().await;
            if guard
                .last_sequence
                .is_some_and(|last| envelope.sequence <= last)
            {
                debug!(
                    sequence = envelope.sequence,
                    last_sequence = guard.last_sequence,
                    "store: skipping replayed event"
                );
                return None;
            }

            let next = Arc::new(reduce(&guard.state, &envelope.event));
            guard.state = Arc::clone(&next);
            guard.last_sequence = Some(envelope.sequence);
            StateUpdate {
                sequence: Some(envelope.sequence),
                state: next,
            }
        };

        debug!(
            sequence = envelope.sequence,
            event = envelope.event.name(),
            policies = update.state.policies.len(),
            "store: applied event"
        );
        let _ = self.updates.send(update.clone());
        Some(update)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(AppState::initial(), None)
    }
}
