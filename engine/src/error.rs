use dist_registry::{PolicyError, RegistryError};
use dist_store::StoreError;
use thiserror::Error;

use crate::request::RequestError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("malformed request: {0}")]
    Request(#[from] RequestError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
