//! Client-side guardrails.
//!
//! Turns a user-typed `Operation` draft into a `ValidatedOperation` whose
//! amounts are already scaled for their tokens, or rejects it with a
//! `Validation` error naming the offending field. Checks against the
//! snapshot are advisory: the engine stays authoritative.

use alloy::primitives::Address;
use std::str::FromStr;

use crate::errors::ClientError;
use crate::execution::facade::ContractFacade;
use crate::types::{Operation, OperationKind, PositionSnapshot, TokenAmount};

/// A chain call with every amount in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAction {
    Deposit {
        token: Address,
        amount: TokenAmount,
    },
    Mint {
        amount: TokenAmount,
    },
    DepositAndMint {
        token: Address,
        collateral: TokenAmount,
        mint: TokenAmount,
    },
    Burn {
        amount: TokenAmount,
    },
    Redeem {
        token: Address,
        amount: TokenAmount,
    },
    RedeemForBurn {
        token: Address,
        collateral: TokenAmount,
        burn: TokenAmount,
    },
    Liquidate {
        token: Address,
        target: Address,
        debt_to_cover: TokenAmount,
    },
}

/// Allowance the engine needs on `token` before the primary call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRequirement {
    pub token: Address,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOperation {
    pub action: ChainAction,
}

impl ValidatedOperation {
    pub fn kind(&self) -> OperationKind {
        match self.action {
            ChainAction::Deposit { .. } => OperationKind::Deposit,
            ChainAction::Mint { .. } => OperationKind::Mint,
            ChainAction::DepositAndMint { .. } => OperationKind::DepositAndMint,
            ChainAction::Burn { .. } => OperationKind::Burn,
            ChainAction::Redeem { .. } => OperationKind::Redeem,
            ChainAction::RedeemForBurn { .. } => OperationKind::RedeemForBurn,
            ChainAction::Liquidate { .. } => OperationKind::Liquidate,
        }
    }

    /// Collateral moving from the wallet into the engine needs an allowance.
    pub fn approval(&self) -> Option<ApprovalRequirement> {
        match self.action {
            ChainAction::Deposit { token, amount } => Some(ApprovalRequirement { token, amount }),
            ChainAction::DepositAndMint {
                token, collateral, ..
            } => Some(ApprovalRequirement {
                token,
                amount: collateral,
            }),
            _ => None,
        }
    }
}

/// Validate `op` against the latest known snapshot.
///
/// Burn, Redeem and RedeemForBurn need a loaded snapshot to bound their
/// amounts. Liquidate is only checked for well-formed input.
pub async fn validate(
    facade: &ContractFacade,
    op: &Operation,
    snapshot: Option<&PositionSnapshot>,
) -> Result<ValidatedOperation, ClientError> {
    let action = match op {
        Operation::Deposit { token, amount } => {
            let token = collateral_token("token", token, snapshot)?;
            let amount = facade.parse_amount("amount", token, amount).await?;
            ChainAction::Deposit { token, amount }
        }
        Operation::Mint { amount } => ChainAction::Mint {
            amount: facade.parse_stable_amount("amount", amount)?,
        },
        Operation::DepositAndMint {
            token,
            collateral_amount,
            mint_amount,
        } => {
            let token = collateral_token("token", token, snapshot)?;
            let collateral = facade
                .parse_amount("collateral_amount", token, collateral_amount)
                .await?;
            let mint = facade.parse_stable_amount("mint_amount", mint_amount)?;
            ChainAction::DepositAndMint {
                token,
                collateral,
                mint,
            }
        }
        Operation::Burn { amount } => {
            let snapshot = require_snapshot(snapshot)?;
            let amount = facade.parse_stable_amount("amount", amount)?;
            check_burnable("amount", amount, snapshot)?;
            ChainAction::Burn { amount }
        }
        Operation::Redeem { token, amount } => {
            let snapshot = require_snapshot(snapshot)?;
            let token = collateral_token("token", token, Some(snapshot))?;
            let amount = facade.parse_amount("amount", token, amount).await?;
            check_redeemable("amount", token, amount, snapshot)?;
            ChainAction::Redeem { token, amount }
        }
        Operation::RedeemForBurn {
            token,
            collateral_amount,
            burn_amount,
        } => {
            let snapshot = require_snapshot(snapshot)?;
            let token = collateral_token("token", token, Some(snapshot))?;
            let collateral = facade
                .parse_amount("collateral_amount", token, collateral_amount)
                .await?;
            let burn = facade.parse_stable_amount("burn_amount", burn_amount)?;
            check_redeemable("collateral_amount", token, collateral, snapshot)?;
            check_burnable("burn_amount", burn, snapshot)?;
            ChainAction::RedeemForBurn {
                token,
                collateral,
                burn,
            }
        }
        Operation::Liquidate {
            token,
            target,
            debt_to_cover,
        } => {
            let token = parse_address("token", token)?;
            let target = parse_address("target", target)?;
            let debt_to_cover = facade.parse_stable_amount("debt_to_cover", debt_to_cover)?;
            ChainAction::Liquidate {
                token,
                target,
                debt_to_cover,
            }
        }
    };
    Ok(ValidatedOperation { action })
}

fn require_snapshot(
    snapshot: Option<&PositionSnapshot>,
) -> Result<&PositionSnapshot, ClientError> {
    snapshot.ok_or_else(|| ClientError::validation("position", "not loaded yet; refresh first"))
}

fn parse_address(field: &'static str, input: &str) -> Result<Address, ClientError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(field, "is required"));
    }
    Address::from_str(trimmed)
        .map_err(|_| ClientError::validation(field, format!("'{trimmed}' is not a valid address")))
}

/// Parse a collateral address and, when a snapshot is known, require it to
/// be one the engine accepts.
fn collateral_token(
    field: &'static str,
    input: &str,
    snapshot: Option<&PositionSnapshot>,
) -> Result<Address, ClientError> {
    let token = parse_address(field, input)?;
    if let Some(snapshot) = snapshot {
        if !snapshot.is_accepted(token) {
            return Err(ClientError::validation(
                field,
                format!("{token} is not an accepted collateral"),
            ));
        }
    }
    Ok(token)
}

fn check_burnable(
    field: &'static str,
    amount: TokenAmount,
    snapshot: &PositionSnapshot,
) -> Result<(), ClientError> {
    let balance = snapshot.max_burnable();
    if amount.raw() > balance.raw() {
        return Err(ClientError::validation(
            field,
            format!("{amount} exceeds stablecoin balance of {balance}"),
        ));
    }
    Ok(())
}

fn check_redeemable(
    field: &'static str,
    token: Address,
    amount: TokenAmount,
    snapshot: &PositionSnapshot,
) -> Result<(), ClientError> {
    let max = snapshot.max_redeemable(token);
    if amount.raw() > max {
        let deposited = TokenAmount::new(max, amount.decimals());
        return Err(ClientError::validation(
            field,
            format!("{amount} exceeds deposited collateral of {deposited}"),
        ));
    }
    Ok(())
}
