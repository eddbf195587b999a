use std::fmt;

use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};

use crate::codec::{decimal_u256, lenient_u64};

/// 20-byte account address, `0x`-hex on the wire.
pub type Address = H160;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(#[serde(with = "lenient_u64")] pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PolicyId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub beneficiary: Address,
    /// Raw fixed-point emission rate per block; `10^16` is 1%.
    #[serde(with = "decimal_u256")]
    pub block_inflation_rate: U256,
    pub executed: bool,
}

/// Denormalized view of the app, rebuilt one event at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub policies: Vec<Policy>,
    pub is_syncing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
}

impl AppState {
    /// State used when nothing was checkpointed yet.
    pub fn initial() -> Self {
        Self {
            policies: Vec::new(),
            is_syncing: true,
            token_symbol: None,
        }
    }

    pub fn contains(&self, id: PolicyId) -> bool {
        self.policies.iter().any(|policy| policy.id == id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::initial()
    }
}
