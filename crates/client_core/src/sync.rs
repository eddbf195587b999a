use std::sync::Arc;

use futures::StreamExt;
use shared::{
    domain::{Address, AppState},
    protocol::ContractEvent,
};
use storage::CheckpointStore;
use tracing::{error, info, warn};

use crate::{
    contract::{EventFeed, IssuanceContract},
    error::SyncError,
    retry::{retry_every, RetryPolicy},
    store::StateStore,
};

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub retry: RetryPolicy,
    /// Persist after this many applied events; sync-complete markers always persist.
    pub checkpoint_every: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            checkpoint_every: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub token: Address,
    pub applied_events: u64,
    pub last_sequence: Option<u64>,
}

/// Drives the event feed into the [`StateStore`] and checkpoints it.
pub struct BackgroundSync {
    app_address: Address,
    contract: Arc<dyn IssuanceContract>,
    feed: Arc<dyn EventFeed>,
    checkpoints: Arc<dyn CheckpointStore>,
    store: Arc<StateStore>,
    options: SyncOptions,
}

impl BackgroundSync {
    pub fn new(
        app_address: Address,
        contract: Arc<dyn IssuanceContract>,
        feed: Arc<dyn EventFeed>,
        checkpoints: Arc<dyn CheckpointStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            app_address,
            contract,
            feed,
            checkpoints,
            store: Arc::new(StateStore::default()),
            options,
        }
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// Resolve the app token and seed the store from the last checkpoint.
    ///
    /// Token resolution is retried per [`SyncOptions::retry`]; running out of
    /// attempts is returned as [`SyncError::Initialization`].
    pub async fn initialize(&self) -> Result<Address, SyncError> {
        let contract = Arc::clone(&self.contract);
        let resolved = retry_every(&self.options.retry, || {
            let contract = Arc::clone(&contract);
            async move {
                let token = contract.token().await?;
                let symbol = contract.token_symbol(token).await?;
                Ok::<_, anyhow::Error>((token, symbol))
            }
        })
        .await;

        let (token, symbol) = match resolved {
            Ok(resolved) => resolved,
            Err(source) => {
                error!(
                    app = ?self.app_address,
                    "could not start background sync because the contract did not return its token: {source:#}"
                );
                return Err(SyncError::Initialization {
                    attempts: self.options.retry.max_attempts(),
                    source,
                });
            }
        };

        let checkpoint = self
            .checkpoints
            .load_checkpoint(self.app_address)
            .await
            .map_err(|source| SyncError::Checkpoint { source })?;
        let (mut state, last_sequence) = match checkpoint {
            Some(checkpoint) => {
                info!(
                    app = ?self.app_address,
                    last_sequence = checkpoint.last_sequence,
                    policies = checkpoint.state.policies.len(),
                    "sync: resuming from checkpoint"
                );
                (checkpoint.state, checkpoint.last_sequence)
            }
            None => {
                info!(app = ?self.app_address, "sync: no checkpoint; starting from initial state");
                (AppState::initial(), None)
            }
        };
        state.token_symbol = Some(symbol);
        self.store.reset(state, last_sequence).await;

        info!(app = ?self.app_address, token = ?token, "sync: initialized");
        Ok(token)
    }

    /// Initialize, then apply the feed until it ends.
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let token = self.initialize().await?;

        let from_sequence = self.store.last_sequence().await.map(|last| last + 1);
        let mut events = self
            .feed
            .subscribe(from_sequence)
            .await
            .map_err(|source| SyncError::Feed { source })?;

        let mut applied_events = 0u64;
        let mut since_checkpoint = 0u64;
        while let Some(next) = events.next().await {
            let envelope = match next {
                Ok(envelope) => envelope,
                Err(source) => {
                    if let Err(err) = self.persist().await {
                        warn!(app = ?self.app_address, "sync: checkpoint after feed failure failed: {err}");
                    }
                    return Err(SyncError::Feed { source });
                }
            };

            if self.store.apply(&envelope).await.is_none() {
                continue;
            }
            applied_events += 1;
            since_checkpoint += 1;

            let synced = matches!(envelope.event, ContractEvent::SyncStatusSynced);
            if synced || since_checkpoint >= self.options.checkpoint_every.max(1) {
                if let Err(err) = self.persist().await {
                    warn!(sequence = envelope.sequence, "sync: checkpoint failed: {err}");
                } else {
                    since_checkpoint = 0;
                }
            }
        }

        self.persist().await?;
        let last_sequence = self.store.last_sequence().await;
        info!(
            app = ?self.app_address,
            applied_events,
            last_sequence,
            "sync: event feed ended"
        );
        Ok(SyncSummary {
            token,
            applied_events,
            last_sequence,
        })
    }

    /// Write the current snapshot and cursor to the checkpoint store.
    pub async fn persist(&self) -> Result<(), SyncError> {
        let (state, last_sequence) = self.store.checkpoint().await;
        self.checkpoints
            .save_checkpoint(self.app_address, &state, last_sequence)
            .await
            .map_err(|source| SyncError::Checkpoint { source })
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
