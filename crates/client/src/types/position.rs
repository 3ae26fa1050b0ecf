use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

use super::units::{base_units_to_decimal, format_base_units, Wad};

/// Health factor as read from the engine.
///
/// `Infinite` covers both an account without debt (the engine reports
/// `type(uint256).max`) and a health-factor read the engine refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactor {
    Finite(Wad),
    Infinite,
}

impl HealthFactor {
    /// Map a raw WAD reading, treating `U256::MAX` as the no-debt sentinel.
    pub fn from_raw(raw: U256) -> Self {
        if raw == U256::MAX {
            Self::Infinite
        } else {
            Self::Finite(Wad(raw))
        }
    }

    /// Below 1.0 the position is open to liquidation.
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, Self::Finite(hf) if *hf < Wad::ONE)
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Finite(hf) => Some(hf.to_decimal()),
            Self::Infinite => None,
        }
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(hf) => write!(f, "{hf}"),
            Self::Infinite => f.write_str("infinite"),
        }
    }
}

impl Serialize for HealthFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An accepted collateral token and its (immutable) decimal count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CollateralToken {
    pub address: Address,
    pub decimals: u8,
}

/// Amount of one collateral token the account has deposited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollateralPosition {
    pub token: CollateralToken,
    /// Base units of `token`.
    pub deposited: U256,
}

impl CollateralPosition {
    pub fn deposited_decimal(&self) -> Decimal {
        base_units_to_decimal(self.deposited, self.token.decimals)
    }

    pub fn deposited_display(&self) -> String {
        format_base_units(self.deposited, self.token.decimals)
    }
}

/// Point-in-time view of an account's position, fetched atomically and
/// replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub account: Address,
    pub stablecoin_balance: Wad,
    pub total_minted: Wad,
    pub collateral_value_usd: Wad,
    pub health_factor: HealthFactor,
    /// Collateral tokens in the engine's order.
    pub accepted_collaterals: Vec<Address>,
    pub collateral_deposits: Vec<CollateralPosition>,
    pub fetched_at: i64,
}

impl PositionSnapshot {
    pub fn is_accepted(&self, token: Address) -> bool {
        self.accepted_collaterals.contains(&token)
    }

    pub fn deposit_of(&self, token: Address) -> Option<&CollateralPosition> {
        self.collateral_deposits
            .iter()
            .find(|p| p.token.address == token)
    }

    /// Largest stablecoin amount the account can burn from its wallet.
    pub fn max_burnable(&self) -> Wad {
        self.stablecoin_balance
    }

    /// Largest amount of `token` (base units) the account can redeem.
    pub fn max_redeemable(&self, token: Address) -> U256 {
        self.deposit_of(token)
            .map(|p| p.deposited)
            .unwrap_or(U256::ZERO)
    }

    pub fn is_liquidatable(&self) -> bool {
        self.health_factor.is_liquidatable()
    }
}
