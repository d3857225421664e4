//! The reconciliation engine: one processing cycle over the registry.
//!
//! A cycle runs three phases, strictly in order:
//! 1. verification intake (pending `verification-request` records)
//! 2. dispute intake (pending `dispute-request` records, each followed by an
//!    audit of the disputed namespace)
//! 3. audit of every verified namespace, L3 first
//!
//! Failures are caught per item. A failed item is logged, counted and
//! skipped; its request stays pending and is retried next cycle. Nothing a
//! later phase does rolls back an earlier one.

use dist_registry::{
    effective_balance, DisputeLedger, ShardStore, TierPolicy, VerificationRegistry,
};
use dist_store::{Record, RecordStore, Resolution};
use dist_types::{Clock, Namespace, Quantity, Tier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use crate::report::{AuditOutcome, CycleReport, IntakeOutcome};
use crate::request::{is_pending, request_id, Request, RequestBody, RequestKind, RequestStatus};
use crate::shutdown::ShutdownSignal;
use crate::spans::{audit_span, cycle_span, request_span};
use crate::{DaemonConfig, EngineError};

/// Marker for a cycle stopped by shutdown between items.
struct Interrupted;

pub struct ReconciliationEngine<S> {
    ledger: Arc<S>,
    policy: TierPolicy,
    registry: VerificationRegistry<S>,
    disputes: DisputeLedger<S>,
    clock: Arc<dyn Clock>,
    shutdown: Option<ShutdownSignal>,
    cycles: AtomicU64,
}

impl<S: RecordStore> ReconciliationEngine<S> {
    /// Build an engine over `ledger`. Fails if `config` does not validate.
    pub fn new(
        ledger: Arc<S>,
        config: &DaemonConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let policy = TierPolicy::new(config.tier_thresholds)?;
        let shards = Arc::new(ShardStore::new(
            ledger.clone(),
            config.root_namespace.trim(),
            config.shard_capacity,
            clock.clone(),
        )?);
        Ok(Self {
            ledger,
            policy,
            registry: VerificationRegistry::new(shards.clone()),
            disputes: DisputeLedger::new(shards),
            clock,
            shutdown: None,
            cycles: AtomicU64::new(0),
        })
    }

    /// Stop cycles early once `signal` fires.
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    pub fn registry(&self) -> &VerificationRegistry<S> {
        &self.registry
    }

    pub fn disputes(&self) -> &DisputeLedger<S> {
        &self.disputes
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Run one full processing cycle.
    ///
    /// Never fails as a whole: per-item errors are counted in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        async {
            info!("starting verification cycle");
            let mut report = CycleReport::default();
            if self.run_phases(&mut report).await.is_err() {
                warn!("cycle interrupted by shutdown");
                report.interrupted = true;
            }
            report.log();
            report
        }
        .instrument(cycle_span(cycle))
        .await
    }

    async fn run_phases(&self, report: &mut CycleReport) -> Result<(), Interrupted> {
        self.verification_intake(report).await?;
        self.dispute_intake(report).await?;
        self.audit_all(report).await
    }

    fn checkpoint(&self) -> Result<(), Interrupted> {
        match &self.shutdown {
            Some(signal) if signal.is_triggered() => Err(Interrupted),
            _ => Ok(()),
        }
    }

    // ── Intake ─────────────────────────────────────────────────────────

    async fn verification_intake(&self, report: &mut CycleReport) -> Result<(), Interrupted> {
        info!("processing verification requests");
        for record in self.pending(RequestKind::Verification).await {
            self.checkpoint()?;
            let counts = &mut report.verifications;
            match self.intake_record(RequestKind::Verification, &record).await {
                Ok(IntakeOutcome::Approved) => counts.approved += 1,
                Ok(IntakeOutcome::Rejected) => counts.rejected += 1,
                Ok(IntakeOutcome::Registered) => {}
                Err(_) => counts.failed += 1,
            }
        }
        Ok(())
    }

    async fn dispute_intake(&self, report: &mut CycleReport) -> Result<(), Interrupted> {
        info!("processing dispute requests");
        for record in self.pending(RequestKind::Dispute).await {
            self.checkpoint()?;
            let counts = &mut report.disputes;
            match self.intake_record(RequestKind::Dispute, &record).await {
                Ok(IntakeOutcome::Registered) => counts.registered += 1,
                Ok(IntakeOutcome::Rejected) => counts.rejected += 1,
                Ok(IntakeOutcome::Approved) => {}
                Err(_) => counts.failed += 1,
            }
        }
        Ok(())
    }

    /// Pending request records of one kind. A failed listing yields none.
    async fn pending(&self, kind: RequestKind) -> Vec<Record> {
        match self.ledger.list_records_by_type(kind.type_tag()).await {
            Ok(records) => {
                let pending: Vec<Record> = records.into_iter().filter(is_pending).collect();
                debug!(%kind, count = pending.len(), "pending requests");
                pending
            }
            Err(e) => {
                error!(%kind, error = %e, "failed to list requests");
                Vec::new()
            }
        }
    }

    /// Parse and process one request record, logging any failure.
    async fn intake_record(
        &self,
        kind: RequestKind,
        record: &Record,
    ) -> Result<IntakeOutcome, EngineError> {
        let id = request_id(record);
        let span = request_span(kind, id.as_deref().unwrap_or("?"));
        async {
            let request = match Request::from_record(kind, record) {
                Ok(request) => request,
                Err(e) => match &id {
                    Some(id) => {
                        warn!(error = %e, "rejecting malformed request");
                        self.set_status(id, RequestStatus::Rejected, &e.to_string()).await;
                        return Ok(IntakeOutcome::Rejected);
                    }
                    None => {
                        warn!(error = %e, "skipping request without an id");
                        return Err(EngineError::from(e));
                    }
                },
            };
            self.intake(request).await.inspect_err(|e| {
                error!(error = %e, "failed to process request");
            })
        }
        .instrument(span)
        .await
    }

    /// Process one parsed request.
    pub async fn intake(&self, request: Request) -> Result<IntakeOutcome, EngineError> {
        let Request { id, namespace, body } = request;
        match body {
            RequestBody::Verification { tier } => self.verify(&id, &namespace, tier).await,
            RequestBody::Dispute { penalty, reason } => {
                self.register_dispute(&id, &namespace, penalty, reason).await
            }
        }
    }

    /// Upgrade-only gate: approve if the namespace's effective balance
    /// qualifies for the requested tier.
    async fn verify(
        &self,
        id: &str,
        namespace: &Namespace,
        requested: Tier,
    ) -> Result<IntakeOutcome, EngineError> {
        info!(%namespace, %requested, "processing verification request");

        let resolution = self.resolve(namespace).await;
        if !resolution.exists {
            info!(%namespace, "namespace not found");
            self.set_status(id, RequestStatus::Rejected, "Namespace not found")
                .await;
            return Ok(IntakeOutcome::Rejected);
        }

        let (balance, effective) = self.balances(namespace).await?;
        let eligible = self.policy.eligible_tier(effective);
        if eligible < requested {
            info!(%namespace, %eligible, %requested, %effective, "insufficient balance");
            let message =
                format!("Insufficient balance. Eligible for {eligible}, requested {requested}");
            self.set_status(id, RequestStatus::Rejected, &message).await;
            return Ok(IntakeOutcome::Rejected);
        }

        self.registry
            .add(namespace, resolution.address, requested, balance)
            .await?;
        self.set_status(id, RequestStatus::Approved, &format!("Verified as {requested}"))
            .await;
        info!(%namespace, tier = %requested, "namespace verified");
        Ok(IntakeOutcome::Approved)
    }

    async fn register_dispute(
        &self,
        id: &str,
        namespace: &Namespace,
        penalty: Quantity,
        reason: String,
    ) -> Result<IntakeOutcome, EngineError> {
        info!(%namespace, %penalty, "processing dispute");
        self.disputes
            .record(namespace, penalty, reason, Some(id.to_string()))
            .await?;
        self.set_status(id, RequestStatus::Registered, "Dispute registered")
            .await;

        // The dispute is recorded; a failed re-audit is picked up by the
        // full audit later in this cycle.
        if let Err(e) = self.audit_namespace(namespace, None).await {
            error!(%namespace, error = %e, "re-audit after dispute failed");
        }
        Ok(IntakeOutcome::Registered)
    }

    // ── Audit ──────────────────────────────────────────────────────────

    async fn audit_all(&self, report: &mut CycleReport) -> Result<(), Interrupted> {
        info!("auditing verified namespaces");
        // Tier each namespace holds after being audited in this sweep.
        let mut audited: HashMap<Namespace, Tier> = HashMap::new();

        for tier in Tier::VERIFIED_DESC {
            let entries = match self.registry.entries(tier).await {
                Ok(entries) => entries,
                Err(e) => {
                    error!(%tier, error = %e, "failed to read tier");
                    report.audit.failed += 1;
                    continue;
                }
            };

            for entry in entries {
                self.checkpoint()?;
                let namespace = entry.namespace;

                if let Some(&resident) = audited.get(&namespace) {
                    if resident != tier {
                        self.remove_stale(&namespace, tier, report).await;
                    }
                    continue;
                }

                let span = audit_span(&namespace, tier);
                match self
                    .audit_namespace(&namespace, Some(tier))
                    .instrument(span)
                    .await
                {
                    Ok(outcome) => {
                        report.audit.record(outcome);
                        let resident = match outcome {
                            AuditOutcome::Valid => tier,
                            AuditOutcome::Updated { to } => to,
                            AuditOutcome::Revoked => Tier::L0,
                        };
                        audited.insert(namespace, resident);
                    }
                    Err(e) => {
                        error!(%namespace, %tier, error = %e, "audit failed");
                        report.audit.failed += 1;
                    }
                }
            }
        }

        info!(
            valid = report.audit.valid,
            updated = report.audit.updated,
            revoked = report.audit.revoked,
            "audit complete"
        );
        Ok(())
    }

    /// Remove a copy of `namespace` left in `tier` by an interrupted move.
    async fn remove_stale(&self, namespace: &Namespace, tier: Tier, report: &mut CycleReport) {
        match self.registry.remove(namespace, tier).await {
            Ok(true) => {
                warn!(%namespace, %tier, "removed stale duplicate entry");
                report.audit.duplicates_removed += 1;
            }
            Ok(false) => {}
            Err(e) => {
                error!(%namespace, %tier, error = %e, "failed to remove duplicate entry");
                report.audit.failed += 1;
            }
        }
    }

    /// Re-check one namespace against its current balance and downgrade or
    /// revoke it if it no longer qualifies. Never upgrades.
    ///
    /// `current` is the tier to audit; `None` looks it up.
    pub async fn audit_namespace(
        &self,
        namespace: &Namespace,
        current: Option<Tier>,
    ) -> Result<AuditOutcome, EngineError> {
        let current = match current {
            Some(tier) => tier,
            None => self.registry.current_tier(namespace).await?,
        };
        if !current.is_verified() {
            return Ok(AuditOutcome::Valid);
        }

        let (balance, effective) = self.balances(namespace).await?;
        let eligible = self.policy.eligible_tier(effective);
        if eligible >= current {
            debug!(%namespace, %current, %eligible, "still eligible");
            return Ok(AuditOutcome::Valid);
        }

        self.registry.remove(namespace, current).await?;
        if eligible.is_verified() {
            let address = self.resolve(namespace).await.address;
            self.registry.add(namespace, address, eligible, balance).await?;
            info!(%namespace, from = %current, to = %eligible, "namespace downgraded");
            Ok(AuditOutcome::Updated { to: eligible })
        } else {
            info!(%namespace, from = %current, "verification revoked");
            Ok(AuditOutcome::Revoked)
        }
    }

    // ── Ledger helpers ─────────────────────────────────────────────────

    /// Raw balance and effective balance (raw minus active penalties).
    ///
    /// An unreadable balance counts as zero. Unreadable dispute pages fail
    /// the call.
    async fn balances(&self, namespace: &Namespace) -> Result<(Quantity, Quantity), EngineError> {
        let account = namespace.verification_account();
        let balance = match self.ledger.get_balance(&account).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(%account, error = %e, "balance unavailable, using zero");
                Quantity::ZERO
            }
        };
        let penalties = self.disputes.total_active_penalty(namespace).await?;
        let effective = effective_balance(balance, penalties);
        debug!(%namespace, %balance, %penalties, %effective, "effective balance");
        Ok((balance, effective))
    }

    /// Look a namespace up. A failed lookup counts as not found.
    async fn resolve(&self, namespace: &Namespace) -> Resolution {
        match self.ledger.resolve_identifier(namespace).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(%namespace, error = %e, "namespace lookup failed");
                Resolution::missing()
            }
        }
    }

    /// Write a request's new status. Failures are logged; the request then
    /// stays pending and is processed again next cycle.
    async fn set_status(&self, id: &str, status: RequestStatus, message: &str) {
        let fields = Record::new()
            .with("status", status.as_str())
            .with("message", message)
            .with("processed", self.clock.now().to_rfc3339());
        if let Err(e) = self.ledger.update_record(id, &fields).await {
            error!(id, %status, error = %e, "failed to update request status");
        }
    }
}
