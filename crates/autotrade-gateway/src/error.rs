//! Gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream connect failed: {0}")]
    UpstreamConnectFailure(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
