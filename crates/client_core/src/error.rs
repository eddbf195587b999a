use shared::{error::ApiException, units::UnitsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not resolve the app token after {attempts} attempts: {source}")]
    Initialization {
        attempts: u32,
        source: anyhow::Error,
    },
    #[error("checkpoint store failed: {source}")]
    Checkpoint { source: anyhow::Error },
    #[error("event feed failed: {source}")]
    Feed { source: anyhow::Error },
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("gateway rejected {request}: {error}")]
    Rejected {
        request: &'static str,
        error: ApiException,
    },
    #[error("invalid input for {request}: {source}")]
    InvalidInput {
        request: &'static str,
        source: UnitsError,
    },
    #[error("failed to submit {request}: {source}")]
    Transport {
        request: &'static str,
        source: anyhow::Error,
    },
}
