//! Reconciliation engine for the tiered verification registry.
//!
//! [`ReconciliationEngine::run_cycle`] processes pending verification and
//! dispute requests, then audits every verified namespace against its
//! current balance. The daemon binary drives it on an interval using
//! [`DaemonConfig`], [`init_logging`] and [`ShutdownController`].

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod report;
pub mod request;
pub mod shutdown;
pub mod spans;

pub use config::DaemonConfig;
pub use engine::ReconciliationEngine;
pub use error::EngineError;
pub use logging::{init_logging, LogFormat};
pub use report::{
    AuditCounts, AuditOutcome, CycleReport, DisputeCounts, IntakeOutcome, VerificationCounts,
};
pub use request::{Request, RequestBody, RequestError, RequestKind, RequestStatus};
pub use shutdown::{ShutdownController, ShutdownSignal};
