use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Address, AppState, PolicyId},
    protocol::TransactionReceipt,
    U256,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod contract;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod reducer;
pub mod retry;
pub mod store;
pub mod sync;

pub use contract::{
    EventFeed, EventStream, IssuanceContract, MissingTransactionApi, TransactionApi,
};
pub use error::{SyncError, TransactionError};
pub use gateway::GatewayClient;
pub use normalizer::{raw_rate_from_percent, AppView, PolicyView, RateNormalizer};
pub use retry::{retry_every, RetryPolicy};
pub use store::{StateStore, StateUpdate};
pub use sync::{BackgroundSync, SyncOptions, SyncSummary};

/// What a presentation layer sees: a read channel over the normalized
/// state and the three write operations.
#[async_trait]
pub trait IssuanceHandle: Send + Sync {
    async fn snapshot(&self) -> Arc<AppState>;
    async fn view(&self) -> AppView;
    fn subscribe_state(&self) -> broadcast::Receiver<StateUpdate>;
    async fn add_policy(
        &self,
        beneficiary: Address,
        block_inflation_rate: U256,
    ) -> Result<TransactionReceipt, TransactionError>;
    async fn remove_policy(&self, policy_id: PolicyId)
        -> Result<TransactionReceipt, TransactionError>;
    async fn execute_issuance(&self) -> Result<TransactionReceipt, TransactionError>;
}

pub struct IssuanceClient {
    store: Arc<StateStore>,
    transactions: Arc<dyn TransactionApi>,
    normalizer: RateNormalizer,
}

impl IssuanceClient {
    pub fn new(
        store: Arc<StateStore>,
        transactions: Arc<dyn TransactionApi>,
        normalizer: RateNormalizer,
    ) -> Self {
        Self {
            store,
            transactions,
            normalizer,
        }
    }

    /// A read-only client; every submission fails.
    pub fn read_only(store: Arc<StateStore>, normalizer: RateNormalizer) -> Self {
        Self::new(store, Arc::new(MissingTransactionApi), normalizer)
    }

    /// Add a policy from a human per-block percentage such as `"2.5"`.
    pub async fn add_policy_percent(
        &self,
        beneficiary: Address,
        percent: &str,
    ) -> Result<TransactionReceipt, TransactionError> {
        let rate = raw_rate_from_percent(percent).map_err(|source| {
            TransactionError::InvalidInput {
                request: "add_policy",
                source,
            }
        })?;
        self.add_policy(beneficiary, rate).await
    }

    fn log_outcome(
        request: &'static str,
        outcome: &Result<TransactionReceipt, TransactionError>,
    ) {
        match outcome {
            Ok(receipt) => info!(request, tx_hash = ?receipt.tx_hash, "client: submitted"),
            Err(err) => warn!(request, "client: submission failed: {err}"),
        }
    }
}

#[async_trait]
impl IssuanceHandle for IssuanceClient {
    async fn snapshot(&self) -> Arc<AppState> {
        self.store.snapshot().await
    }

    async fn view(&self) -> AppView {
        self.store.view(&self.normalizer).await
    }

    fn subscribe_state(&self) -> broadcast::Receiver<StateUpdate> {
        self.store.subscribe()
    }

    async fn add_policy(
        &self,
        beneficiary: Address,
        block_inflation_rate: U256,
    ) -> Result<TransactionReceipt, TransactionError> {
        let outcome = self
            .transactions
            .add_policy(beneficiary, block_inflation_rate)
            .await;
        Self::log_outcome("add_policy", &outcome);
        outcome
    }

    async fn remove_policy(
        &self,
        policy_id: PolicyId,
    ) -> Result<TransactionReceipt, TransactionError> {
        let outcome = self.transactions.remove_policy(policy_id).await;
        Self::log_outcome("remove_policy", &outcome);
        outcome
    }

    async fn execute_issuance(&self) -> Result<TransactionReceipt, TransactionError> {
        let outcome = self.transactions.execute_issuance().await;
        Self::log_outcome("execute_issuance", &outcome);
        outcome
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
