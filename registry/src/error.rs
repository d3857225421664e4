use dist_store::StoreError;
use dist_types::{Quantity, Tier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("tier {0} cannot hold registry entries")]
    UnstorableTier(Tier),

    #[error("shard capacity must be at least 1")]
    InvalidCapacity,

    #[error("collection {collection} has more than {limit} pages")]
    TooManyPages { collection: String, limit: usize },
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error(
        "tier thresholds must be strictly increasing: \
         {lower} = {lower_threshold} is not below {upper} = {upper_threshold}"
    )]
    NotIncreasing {
        lower: Tier,
        lower_threshold: Quantity,
        upper: Tier,
        upper_threshold: Quantity,
    },
}
