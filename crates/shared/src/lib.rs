pub mod codec;
pub mod constants;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod units;

pub use primitive_types::{H160, H256, U256, U512};
