use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::{
    domain::{Address, PolicyId},
    protocol::{EventEnvelope, TransactionReceipt},
    U256,
};

use crate::error::TransactionError;

pub type EventStream = BoxStream<'static, Result<EventEnvelope>>;

/// Read-only calls against the issuance app and its token.
#[async_trait]
pub trait IssuanceContract: Send + Sync {
    async fn token(&self) -> Result<Address>;
    async fn token_symbol(&self, token: Address) -> Result<String>;
}

/// Transaction submission; results are surfaced and never retried here.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn add_policy(
        &self,
        beneficiary: Address,
        block_inflation_rate: U256,
    ) -> Result<TransactionReceipt, TransactionError>;
    async fn remove_policy(&self, policy_id: PolicyId)
        -> Result<TransactionReceipt, TransactionError>;
    async fn execute_issuance(&self) -> Result<TransactionReceipt, TransactionError>;
}

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Stream events starting at `from_sequence`, or from the beginning.
    async fn subscribe(&self, from_sequence: Option<u64>) -> Result<EventStream>;
}

/// Stand-in for processes that only follow the feed.
pub struct MissingTransactionApi;

impl MissingTransactionApi {
    fn unavailable(request: &'static str) -> TransactionError {
        TransactionError::Transport {
            request,
            source: anyhow!("transaction api is unavailable"),
        }
    }
}

#[async_trait]
impl TransactionApi for MissingTransactionApi {
    async fn add_policy(
        &self,
        _beneficiary: Address,
        _block_inflation_rate: U256,
    ) -> Result<TransactionReceipt, TransactionError> {
        Err(Self::unavailable("add_policy"))
    }

    async fn remove_policy(
        &self,
        _policy_id: PolicyId,
    ) -> Result<TransactionReceipt, TransactionError> {
        Err(Self::unavailable("remove_policy"))
    }

    async fn execute_issuance(&self) -> Result<TransactionReceipt, TransactionError> {
        Err(Self::unavailable("execute_issuance"))
    }
}
