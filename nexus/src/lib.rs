//! Nexus ledger client.
//!
//! Talks to a local Nexus node's JSON API and exposes it as a
//! [`RecordStore`](dist_store::RecordStore):
//! - Every call is `POST {node_url}/{endpoint}` with a JSON body; the session
//!   id, once known, is injected as `session`.
//! - A response carrying an `error` object is an API error. Reads treat API
//!   errors as "absent" (missing record, zero balance, unknown namespace).
//! - Timeouts and connection failures are transport errors and surface as
//!   [`StoreError::Transport`](dist_store::StoreError::Transport).

pub mod client;
pub mod error;

pub use client::{NexusClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use error::NexusError;
