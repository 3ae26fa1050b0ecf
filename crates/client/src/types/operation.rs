use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// The user-initiated actions the dashboard can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deposit,
    Mint,
    DepositAndMint,
    Burn,
    Redeem,
    RedeemForBurn,
    Liquidate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        Self::Deposit,
        Self::Mint,
        Self::DepositAndMint,
        Self::Burn,
        Self::Redeem,
        Self::RedeemForBurn,
        Self::Liquidate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Mint => "mint",
            Self::DepositAndMint => "deposit_and_mint",
            Self::Burn => "burn",
            Self::Redeem => "redeem",
            Self::RedeemForBurn => "redeem_for_burn",
            Self::Liquidate => "liquidate",
        }
    }
}

/// Input fields an operation draft can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Collateral token address.
    Token,
    /// Primary amount: collateral for collateral-moving operations,
    /// stablecoin for Mint/Burn, debt to cover for Liquidate.
    Amount,
    /// Stablecoin leg of DepositAndMint / RedeemForBurn.
    StableAmount,
    /// Account to liquidate.
    Target,
}

/// A draft operation exactly as typed by the user. Nothing here has been
/// parsed; validation turns it into chain calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Deposit {
        token: String,
        amount: String,
    },
    Mint {
        amount: String,
    },
    DepositAndMint {
        token: String,
        collateral_amount: String,
        mint_amount: String,
    },
    Burn {
        amount: String,
    },
    Redeem {
        token: String,
        amount: String,
    },
    RedeemForBurn {
        token: String,
        collateral_amount: String,
        burn_amount: String,
    },
    Liquidate {
        token: String,
        target: String,
        debt_to_cover: String,
    },
}

impl Operation {
    /// Empty draft for `kind`.
    pub fn empty(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Deposit => Self::Deposit {
                token: String::new(),
                amount: String::new(),
            },
            OperationKind::Mint => Self::Mint {
                amount: String::new(),
            },
            OperationKind::DepositAndMint => Self::DepositAndMint {
                token: String::new(),
                collateral_amount: String::new(),
                mint_amount: String::new(),
            },
            OperationKind::Burn => Self::Burn {
                amount: String::new(),
            },
            OperationKind::Redeem => Self::Redeem {
                token: String::new(),
                amount: String::new(),
            },
            OperationKind::RedeemForBurn => Self::RedeemForBurn {
                token: String::new(),
                collateral_amount: String::new(),
                burn_amount: String::new(),
            },
            OperationKind::Liquidate => Self::Liquidate {
                token: String::new(),
                target: String::new(),
                debt_to_cover: String::new(),
            },
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Deposit { .. } => OperationKind::Deposit,
            Self::Mint { .. } => OperationKind::Mint,
            Self::DepositAndMint { .. } => OperationKind::DepositAndMint,
            Self::Burn { .. } => OperationKind::Burn,
            Self::Redeem { .. } => OperationKind::Redeem,
            Self::RedeemForBurn { .. } => OperationKind::RedeemForBurn,
            Self::Liquidate { .. } => OperationKind::Liquidate,
        }
    }

    /// Mutable access to one input field. `None` when this kind has no such
    /// field.
    pub fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        match (self, field) {
            (Self::Deposit { token, .. }, Field::Token)
            | (Self::DepositAndMint { token, .. }, Field::Token)
            | (Self::Redeem { token, .. }, Field::Token)
            | (Self::RedeemForBurn { token, .. }, Field::Token)
            | (Self::Liquidate { token, .. }, Field::Token) => Some(token),

            (Self::Deposit { amount, .. }, Field::Amount)
            | (Self::Mint { amount }, Field::Amount)
            | (Self::Burn { amount }, Field::Amount)
            | (Self::Redeem { amount, .. }, Field::Amount) => Some(amount),
            (Self::DepositAndMint { collateral_amount, .. }, Field::Amount)
            | (Self::RedeemForBurn { collateral_amount, .. }, Field::Amount) => {
                Some(collateral_amount)
            }
            (Self::Liquidate { debt_to_cover, .. }, Field::Amount) => Some(debt_to_cover),

            (Self::DepositAndMint { mint_amount, .. }, Field::StableAmount) => Some(mint_amount),
            (Self::RedeemForBurn { burn_amount, .. }, Field::StableAmount) => Some(burn_amount),

            (Self::Liquidate { target, .. }, Field::Target) => Some(target),

            _ => None,
        }
    }

    /// Every input this kind requires, in display order.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Self::Deposit { token, amount } | Self::Redeem { token, amount } => {
                vec![token.as_str(), amount.as_str()]
            }
            Self::Mint { amount } | Self::Burn { amount } => vec![amount.as_str()],
            Self::DepositAndMint {
                token,
                collateral_amount,
                mint_amount: stable,
            }
            | Self::RedeemForBurn {
                token,
                collateral_amount,
                burn_amount: stable,
            } => vec![token.as_str(), collateral_amount.as_str(), stable.as_str()],
            Self::Liquidate {
                token,
                target,
                debt_to_cover,
            } => vec![token.as_str(), target.as_str(), debt_to_cover.as_str()],
        }
    }

    /// Whether any required input is blank. The submit control stays
    /// disabled while this holds.
    pub fn has_blank_field(&self) -> bool {
        self.inputs().iter().any(|v| v.trim().is_empty())
    }
}

/// Lifecycle phase of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    Draft,
    Validated,
    ApprovalPending,
    Approved,
    Submitted,
    Confirmed,
    Failed,
}

impl OperationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

/// Live status published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    pub kind: Option<OperationKind>,
    pub phase: OperationPhase,
    /// Controls must be disabled while set.
    pub busy: bool,
    /// The awaited inclusion has outlived the configured notice delay.
    pub still_pending: bool,
    pub tx_hash: Option<B256>,
}

impl OperationStatus {
    pub fn idle() -> Self {
        Self {
            kind: None,
            phase: OperationPhase::Draft,
            busy: false,
            still_pending: false,
            tx_hash: None,
        }
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self::idle()
    }
}
