use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of a [`ClientError`], surfaced to the
/// presentation layer next to the verbatim message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    UserRejected,
    ValidationError,
    ApprovalFailed,
    TransactionReverted,
    SnapshotUnavailable,
    HealthFactorUndefined,
    OperationInFlight,
    ContractUnavailable,
    NotConnected,
    Config,
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::UserRejected => "user_rejected",
            Self::ValidationError => "validation_error",
            Self::ApprovalFailed => "approval_failed",
            Self::TransactionReverted => "transaction_reverted",
            Self::SnapshotUnavailable => "snapshot_unavailable",
            Self::HealthFactorUndefined => "health_factor_undefined",
            Self::OperationInFlight => "operation_in_flight",
            Self::ContractUnavailable => "contract_unavailable",
            Self::NotConnected => "not_connected",
            Self::Config => "config",
            Self::Transport => "transport",
        }
    }

    /// Whether the user can recover by retrying or fixing input.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config)
    }
}

/// Typed error hierarchy for the StableFi client.
///
/// Library code returns these variants; the binary and config loader wrap
/// them with `anyhow::Context`.
#[derive(Error, Debug)]
pub enum ClientError {
    // -- Wallet -------------------------------------------------------------
    #[error("wallet provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("request rejected in wallet: {reason}")]
    UserRejected { reason: String },

    #[error("wallet not connected")]
    NotConnected,

    // -- Input --------------------------------------------------------------
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("another operation is already in flight for {account}")]
    OperationInFlight { account: Address },

    // -- Execution ----------------------------------------------------------
    #[error("approval of {token} failed: {reason}")]
    ApprovalFailed { token: Address, reason: String },

    #[error("transaction reverted: {reason}")]
    TxReverted {
        tx_hash: Option<String>,
        reason: String,
    },

    // -- Reads --------------------------------------------------------------
    #[error("account state unavailable: {reason}")]
    SnapshotUnavailable { reason: String },

    #[error("health factor undefined for account without debt")]
    HealthFactorUndefined,

    #[error("protocol contract unavailable: {reason}")]
    ContractUnavailable { reason: String },

    // -- Configuration ------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Transport(#[from] alloy::transports::TransportError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Self::UserRejected { .. } => ErrorKind::UserRejected,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::OperationInFlight { .. } => ErrorKind::OperationInFlight,
            Self::ApprovalFailed { .. } => ErrorKind::ApprovalFailed,
            Self::TxReverted { .. } => ErrorKind::TransactionReverted,
            Self::SnapshotUnavailable { .. } => ErrorKind::SnapshotUnavailable,
            Self::HealthFactorUndefined => ErrorKind::HealthFactorUndefined,
            Self::ContractUnavailable { .. } => ErrorKind::ContractUnavailable,
            Self::Config(_) => ErrorKind::Config,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Re-tag a read failure so the caller sees `SnapshotUnavailable`.
    pub(crate) fn into_snapshot_unavailable(self) -> Self {
        match self {
            Self::SnapshotUnavailable { .. } => self,
            other => Self::SnapshotUnavailable {
                reason: other.to_string(),
            },
        }
    }
}
