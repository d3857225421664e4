//! Fundamental types for the Distordia verification registry.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! namespaces, verification tiers, token quantities, and timestamps.

pub mod amount;
pub mod error;
pub mod namespace;
pub mod tier;
pub mod time;

pub use amount::Quantity;
pub use error::TypeError;
pub use namespace::Namespace;
pub use tier::Tier;
pub use time::{Clock, SystemClock, Timestamp};
