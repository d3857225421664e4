//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown tier: {0:?}")]
    UnknownTier(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
