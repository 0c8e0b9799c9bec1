use minilib_net_abi::NetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),
    #[error("probe failed: {0}")]
    ProbeFailed(String),
}
