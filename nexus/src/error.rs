use dist_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NexusError {
    #[error("ledger node unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP request to ledger node failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from ledger node: {0}")]
    InvalidResponse(String),

    #[error("ledger API error: {message}")]
    Api { code: Option<i64>, message: String },
}

impl NexusError {
    /// Whether the node answered and refused, as opposed to not answering.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

impl From<NexusError> for StoreError {
    fn from(e: NexusError) -> Self {
        match e {
            NexusError::Api { message, .. } => StoreError::Rejected(message),
            NexusError::InvalidResponse(msg) => StoreError::Serialization(msg),
            other => StoreError::Transport(other.to_string()),
        }
    }
}
