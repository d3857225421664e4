//! Per-cycle outcome counters.

use dist_types::Tier;
use tracing::info;

/// Outcome of one intake request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntakeOutcome {
    Approved,
    Rejected,
    Registered,
}

/// Outcome of auditing one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Still eligible for its tier (or higher); nothing written.
    Valid,
    /// Moved down to a lower verified tier.
    Updated { to: Tier },
    /// No longer eligible for any tier; entry removed.
    Revoked,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerificationCounts {
    pub approved: usize,
    pub rejected: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisputeCounts {
    pub registered: usize,
    pub rejected: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditCounts {
    pub valid: usize,
    pub updated: usize,
    pub revoked: usize,
    pub failed: usize,
    /// Stale copies of a namespace found in a lower tier and removed.
    pub duplicates_removed: usize,
}

impl AuditCounts {
    pub fn record(&mut self, outcome: AuditOutcome) {
        match outcome {
            AuditOutcome::Valid => self.valid += 1,
            AuditOutcome::Updated { .. } => self.updated += 1,
            AuditOutcome::Revoked => self.revoked += 1,
        }
    }
}

/// Everything one processing cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub verifications: VerificationCounts,
    pub disputes: DisputeCounts,
    pub audit: AuditCounts,
    /// The cycle stopped early on shutdown.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.verifications.failed + self.disputes.failed + self.audit.failed
    }

    /// Emit the end-of-cycle summary.
    pub fn log(&self) {
        info!(
            approved = self.verifications.approved,
            rejected = self.verifications.rejected,
            disputes = self.disputes.registered,
            valid = self.audit.valid,
            updated = self.audit.updated,
            revoked = self.audit.revoked,
            duplicates_removed = self.audit.duplicates_removed,
            failed = self.failures(),
            interrupted = self.interrupted,
            "cycle complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_span_every_phase() {
        let mut report = CycleReport::default();
        report.verifications.failed = 1;
        report.disputes.failed = 2;
        report.audit.failed = 3;
        assert_eq!(report.failures(), 6);
    }

    #[test]
    fn audit_counts_by_outcome() {
        let mut counts = AuditCounts::default();
        for outcome in [AuditOutcome::Valid, AuditOutcome::Revoked, AuditOutcome::Valid] {
            counts.record(outcome);
        }
        assert_eq!((counts.valid, counts.updated, counts.revoked), (2, 0, 1));
    }
}
