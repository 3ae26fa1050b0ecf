//! The single application-state struct handed to the presentation layer.
//!
//! Every mutation goes through a transition method, so the rules about what
//! a confirmed, failed or rejected operation does to drafts and snapshots
//! live in one place.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::orchestrator::{OperationOutcome, OperationReport};
use crate::errors::{ClientError, ErrorKind};
use crate::session::Session;
use crate::types::{Field, Operation, OperationKind, PositionSnapshot};

/// One-line status shown to the user. `kind` is `None` for success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }

    fn error(err: &ClientError) -> Self {
        Self {
            kind: Some(err.kind()),
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    session: Option<Session>,
    contract_error: Option<String>,
    snapshot: Option<PositionSnapshot>,
    /// Why the shown snapshot may be out of date. `None` when fresh.
    stale: Option<String>,
    drafts: BTreeMap<OperationKind, Operation>,
    notice: Option<Notice>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: None,
            contract_error: None,
            snapshot: None,
            stale: None,
            drafts: OperationKind::ALL
                .iter()
                .map(|&kind| (kind, Operation::empty(kind)))
                .collect(),
            notice: None,
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Set while connected but the contracts could not be bound.
    pub fn contract_error(&self) -> Option<&str> {
        self.contract_error.as_deref()
    }

    pub fn snapshot(&self) -> Option<&PositionSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }

    pub fn stale_reason(&self) -> Option<&str> {
        self.stale.as_deref()
    }

    pub fn draft(&self, kind: OperationKind) -> &Operation {
        // Every kind is seeded in `new` and drafts are only ever replaced.
        &self.drafts[&kind]
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Whether the submit control for `kind` is enabled.
    pub fn can_submit(&self, kind: OperationKind, busy: bool) -> bool {
        !busy
            && self.session.is_some()
            && self.contract_error.is_none()
            && !self.draft(kind).has_blank_field()
    }

    // -- Transitions --------------------------------------------------------

    /// A new or re-derived session. Anything read for a different account or
    /// chain is dropped.
    pub fn set_session(&mut self, session: Option<Session>) {
        if self.session == session {
            return;
        }
        match session {
            None => {
                *self = Self::new();
            }
            Some(_) => {
                self.session = session;
                self.contract_error = None;
                self.snapshot = None;
                self.stale = None;
                self.notice = None;
            }
        }
    }

    pub fn set_contract_unavailable(&mut self, err: &ClientError) {
        self.contract_error = Some(err.to_string());
        self.notice = Some(Notice::error(err));
    }

    pub fn set_field(
        &mut self,
        kind: OperationKind,
        field: Field,
        value: impl Into<String>,
    ) -> Result<(), ClientError> {
        let draft = self
            .drafts
            .entry(kind)
            .or_insert_with(|| Operation::empty(kind));
        let slot = draft.field_mut(field).ok_or_else(|| {
            ClientError::validation("field", format!("{} has no {field:?} input", kind.as_str()))
        })?;
        *slot = value.into();
        Ok(())
    }

    /// Result of a snapshot read. On failure the previous snapshot stays
    /// visible, marked stale.
    pub fn apply_refresh(&mut self, result: &Result<PositionSnapshot, ClientError>) {
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot.clone());
                self.stale = None;
            }
            Err(e) => {
                self.stale = Some(e.to_string());
                self.notice = Some(Notice::error(e));
            }
        }
    }

    /// Outcome of an operation that passed validation. A confirmed operation
    /// clears its draft; a failed one keeps it so the user can retry.
    pub fn apply_report(&mut self, report: &OperationReport) {
        match &report.outcome {
            OperationOutcome::Confirmed { receipt, refreshed } => {
                self.drafts.insert(report.kind, Operation::empty(report.kind));
                self.notice = Some(Notice::info(format!(
                    "{} confirmed in {}",
                    report.kind.as_str(),
                    receipt.tx_hash
                )));
                // A failed refresh after confirmation still leaves the
                // success notice; the snapshot is only marked stale.
                match refreshed {
                    Ok(snapshot) => {
                        self.snapshot = Some(snapshot.clone());
                        self.stale = None;
                    }
                    Err(e) => self.stale = Some(e.to_string()),
                }
            }
            OperationOutcome::Failed(e) => {
                self.notice = Some(Notice::error(e));
            }
        }
    }

    /// The operation never left `Draft` (validation or single-flight).
    pub fn apply_rejection(&mut self, err: &ClientError) {
        self.notice = Some(Notice::error(err));
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
