use chrono::{DateTime, Utc};
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    codec::decimal_u256,
    domain::{Address, PolicyId},
};

/// Event emitted by the issuance app, or a sync marker from the feed.
///
/// Event fields sit next to the `event` tag. Unknown tags decode to
/// [`ContractEvent::Unrecognized`] so the reducer can pass them through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ContractEvent {
    #[serde(rename = "SYNC_STATUS_SYNCING")]
    SyncStatusSyncing,
    #[serde(rename = "SYNC_STATUS_SYNCED")]
    SyncStatusSynced,
    #[serde(rename_all = "camelCase")]
    AddPolicy {
        beneficiary: Address,
        #[serde(with = "decimal_u256")]
        block_inflation_rate: U256,
        policy_id: PolicyId,
    },
    #[serde(rename_all = "camelCase")]
    RemovePolicy { policy_id: PolicyId },
    ExecuteIssuance,
    #[serde(other)]
    Unrecognized,
}

impl ContractEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncStatusSyncing => "SYNC_STATUS_SYNCING",
            Self::SyncStatusSynced => "SYNC_STATUS_SYNCED",
            Self::AddPolicy { .. } => "AddPolicy",
            Self::RemovePolicy { .. } => "RemovePolicy",
            Self::ExecuteIssuance => "ExecuteIssuance",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// One frame of the gateway event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonic position in the app's event log.
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub event: ContractEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TransactionRequest {
    AddPolicy {
        beneficiary: Address,
        #[serde(with = "decimal_u256")]
        block_inflation_rate: U256,
    },
    RemovePolicy {
        policy_id: PolicyId,
    },
    ExecuteIssuance,
}

impl TransactionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPolicy { .. } => "add_policy",
            Self::RemovePolicy { .. } => "remove_policy",
            Self::ExecuteIssuance => "execute_issuance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: H256,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAddressResponse {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSymbolResponse {
    pub symbol: String,
}
