//! Transaction orchestrator.
//!
//! Runs one operation end to end:
//! 1. Claim the account (single-flight, before any chain contact)
//! 2. Validate and scale the draft
//! 3. Raise the collateral allowance when the operation pulls collateral
//!    and the current allowance does not cover it, then wait for inclusion
//! 4. Submit the primary write and wait for inclusion
//! 5. On confirmation, refresh the account snapshot exactly once
//!
//! Progress is published on a `watch` channel; the final result comes back
//! as an `OperationReport`. Nothing is retried.

use alloy::primitives::{Address, B256};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::execution::engine::{PendingTx, TxReceiptSummary};
use crate::execution::facade::ContractFacade;
use crate::types::{Operation, OperationKind, OperationPhase, OperationStatus, PositionSnapshot};

use super::state_reader::AccountStateReader;
use super::validation::{self, ChainAction, ValidatedOperation};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum OperationOutcome {
    /// Primary write included. `refreshed` is the single post-confirmation
    /// snapshot read.
    Confirmed {
        receipt: TxReceiptSummary,
        refreshed: Result<PositionSnapshot, ClientError>,
    },
    Failed(ClientError),
}

/// Result of an operation that made it past validation.
#[derive(Debug)]
pub struct OperationReport {
    pub kind: OperationKind,
    /// Every phase the operation went through, in order.
    pub phases: Vec<OperationPhase>,
    pub outcome: OperationOutcome,
}

impl OperationReport {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, OperationOutcome::Confirmed { .. })
    }

    pub fn error(&self) -> Option<&ClientError> {
        match &self.outcome {
            OperationOutcome::Failed(e) => Some(e),
            OperationOutcome::Confirmed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// In-flight claim
// ---------------------------------------------------------------------------

/// Releases the account's in-flight claim on drop, whatever the outcome.
struct InFlightClaim<'a> {
    accounts: &'a Mutex<HashSet<Address>>,
    account: Address,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.remove(&self.account);
        }
    }
}

/// Phase history plus the live status it mirrors.
struct PhaseLog<'a> {
    kind: OperationKind,
    phases: Vec<OperationPhase>,
    status: &'a watch::Sender<OperationStatus>,
}

impl<'a> PhaseLog<'a> {
    fn start(kind: OperationKind, status: &'a watch::Sender<OperationStatus>) -> Self {
        status.send_replace(OperationStatus {
            kind: Some(kind),
            phase: OperationPhase::Draft,
            busy: true,
            still_pending: false,
            tx_hash: None,
        });
        Self {
            kind,
            phases: vec![OperationPhase::Draft],
            status,
        }
    }

    fn advance(&mut self, phase: OperationPhase) {
        debug!(kind = self.kind.as_str(), phase = ?phase, "operation phase");
        self.phases.push(phase);
        self.status.send_modify(|s| s.phase = phase);
    }

    fn broadcast(&mut self, phase: OperationPhase, tx_hash: B256) {
        self.phases.push(phase);
        self.status.send_modify(|s| {
            s.phase = phase;
            s.tx_hash = Some(tx_hash);
        });
    }

    fn finish(self) -> Vec<OperationPhase> {
        self.status.send_modify(|s| {
            s.busy = false;
            s.still_pending = false;
        });
        self.phases
    }
}

// ---------------------------------------------------------------------------
// OperationTracker
// ---------------------------------------------------------------------------

/// Accounts with an operation in flight plus the live status channel.
///
/// Clones share state. The client hands one tracker to every orchestrator it
/// builds, so a rebind never forgets an operation that is still running.
#[derive(Clone)]
pub struct OperationTracker {
    in_flight: Arc<Mutex<HashSet<Address>>>,
    status: Arc<watch::Sender<OperationStatus>>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        let (status, _) = watch::channel(OperationStatus::idle());
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            status: Arc::new(status),
        }
    }
}

impl OperationTracker {
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    pub fn is_busy(&self, account: Address) -> bool {
        self.in_flight
            .lock()
            .map(|accounts| accounts.contains(&account))
            .unwrap_or(true)
    }

    fn claim(&self, account: Address) -> Result<InFlightClaim<'_>, ClientError> {
        let mut accounts = self
            .in_flight
            .lock()
            .map_err(|_| ClientError::OperationInFlight { account })?;
        if !accounts.insert(account) {
            return Err(ClientError::OperationInFlight { account });
        }
        Ok(InFlightClaim {
            accounts: &self.in_flight,
            account,
        })
    }
}

// ---------------------------------------------------------------------------
// TxOrchestrator
// ---------------------------------------------------------------------------

pub struct TxOrchestrator {
    facade: Arc<ContractFacade>,
    reader: Arc<AccountStateReader>,
    tracker: OperationTracker,
    pending_notice: Duration,
}

impl TxOrchestrator {
    pub fn new(
        facade: Arc<ContractFacade>,
        reader: Arc<AccountStateReader>,
        pending_notice: Duration,
    ) -> Self {
        Self::with_tracker(facade, reader, pending_notice, OperationTracker::default())
    }

    /// Build an orchestrator that shares `tracker` with earlier bindings.
    pub fn with_tracker(
        facade: Arc<ContractFacade>,
        reader: Arc<AccountStateReader>,
        pending_notice: Duration,
        tracker: OperationTracker,
    ) -> Self {
        Self {
            facade,
            reader,
            tracker,
            pending_notice,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }

    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn is_busy(&self, account: Address) -> bool {
        self.tracker.is_busy(account)
    }

    /// Run `op` for `account`.
    ///
    /// `Err` means the operation never left `Draft`: another operation holds
    /// the account, or validation rejected the input. Everything after
    /// validation, including failures, comes back as a report.
    pub async fn run(
        &self,
        account: Address,
        op: &Operation,
        snapshot: Option<&PositionSnapshot>,
    ) -> Result<OperationReport, ClientError> {
        let _claim = self.tracker.claim(account)?;
        let kind = op.kind();
        let mut log = PhaseLog::start(kind, &self.tracker.status);

        let validated = match validation::validate(&self.facade, op, snapshot).await {
            Ok(v) => v,
            Err(e) => {
                debug!(kind = kind.as_str(), error = %e, "operation rejected by validation");
                log.finish();
                return Err(e);
            }
        };
        log.advance(OperationPhase::Validated);

        let outcome = match self.execute(account, &validated, &mut log).await {
            Ok(receipt) => {
                log.advance(OperationPhase::Confirmed);
                info!(
                    kind = kind.as_str(),
                    tx_hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "operation confirmed"
                );
                let refreshed = self.reader.refresh(account).await;
                if let Err(e) = &refreshed {
                    warn!(account = %account, error = %e, "post-confirmation refresh failed");
                }
                OperationOutcome::Confirmed { receipt, refreshed }
            }
            Err(e) => {
                log.advance(OperationPhase::Failed);
                warn!(
                    kind = kind.as_str(),
                    error_kind = e.kind().as_str(),
                    error = %e,
                    "operation failed"
                );
                OperationOutcome::Failed(e)
            }
        };

        Ok(OperationReport {
            kind,
            phases: log.finish(),
            outcome,
        })
    }

    async fn execute(
        &self,
        account: Address,
        op: &ValidatedOperation,
        log: &mut PhaseLog<'_>,
    ) -> Result<TxReceiptSummary, ClientError> {
        if let Some(required) = op.approval() {
            let current = self
                .facade
                .allowance(required.token, account)
                .await
                .map_err(|e| ClientError::ApprovalFailed {
                    token: required.token,
                    reason: e.to_string(),
                })?;

            if current >= required.amount.raw() {
                debug!(
                    token = %required.token,
                    allowance = %current,
                    "existing allowance covers amount, approval skipped"
                );
            } else {
                let pending = self.facade.approve(required.token, required.amount).await?;
                log.broadcast(OperationPhase::ApprovalPending, pending.tx_hash());
                info!(
                    token = %required.token,
                    amount = %required.amount,
                    tx_hash = %pending.tx_hash(),
                    "approval submitted"
                );
                self.await_inclusion(pending).await?;
                log.advance(OperationPhase::Approved);
            }
        }

        let pending = self.submit(&op.action).await?;
        log.broadcast(OperationPhase::Submitted, pending.tx_hash());
        info!(
            kind = op.kind().as_str(),
            tx_hash = %pending.tx_hash(),
            "operation submitted"
        );
        self.await_inclusion(pending).await
    }

    async fn submit(&self, action: &ChainAction) -> Result<PendingTx, ClientError> {
        let facade = &self.facade;
        match *action {
            ChainAction::Deposit { token, amount } => facade.deposit_collateral(token, amount).await,
            ChainAction::Mint { amount } => facade.mint_stablecoin(amount).await,
            ChainAction::DepositAndMint {
                token,
                collateral,
                mint,
            } => {
                facade
                    .deposit_collateral_and_mint(token, collateral, mint)
                    .await
            }
            ChainAction::Burn { amount } => facade.burn_stablecoin(amount).await,
            ChainAction::Redeem { token, amount } => facade.redeem_collateral(token, amount).await,
            ChainAction::RedeemForBurn {
                token,
                collateral,
                burn,
            } => {
                facade
                    .redeem_collateral_for_burn(token, collateral, burn)
                    .await
            }
            ChainAction::Liquidate {
                token,
                target,
                debt_to_cover,
            } => facade.liquidate(token, target, debt_to_cover).await,
        }
    }

    /// Wait for inclusion with no timeout. Past `pending_notice` the status
    /// flags the transaction as still pending and keeps waiting.
    async fn await_inclusion(&self, pending: PendingTx) -> Result<TxReceiptSummary, ClientError> {
        let tx_hash = pending.tx_hash();
        let mut inclusion = pending.included();

        tokio::select! {
            result = &mut inclusion => return result,
            _ = tokio::time::sleep(self.pending_notice) => {}
        }

        warn!(
            tx_hash = %tx_hash,
            waited_secs = self.pending_notice.as_secs_f64(),
            "transaction still pending"
        );
        self.tracker.status.send_modify(|s| s.still_pending = true);
        let result = inclusion.await;
        self.tracker.status.send_modify(|s| s.still_pending = false);
        result
    }
}
