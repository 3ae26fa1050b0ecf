//! Fixed-point amounts at the chain boundary.
//!
//! User input arrives as decimal strings and leaves as unsigned base-unit
//! integers scaled by `10^decimals`. Floating point never touches an amount.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::constants::STABLECOIN_DECIMALS;
use crate::errors::ClientError;

// ---------------------------------------------------------------------------
// WAD (1e18): stablecoin amounts, USD values, health factors
// ---------------------------------------------------------------------------

/// WAD-scaled value (18 decimals) as reported by the engine.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(pub U256);

impl Wad {
    pub const ONE: Wad = Wad(U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]));
    pub const ZERO: Wad = Wad(U256::ZERO);

    /// Convert to `Decimal` for display. Saturates at `Decimal::MAX`.
    pub fn to_decimal(self) -> Decimal {
        base_units_to_decimal(self.0, STABLECOIN_DECIMALS)
    }

    pub fn raw(self) -> U256 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Debug for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wad({})", format_base_units(self.0, STABLECOIN_DECIMALS))
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_base_units(self.0, STABLECOIN_DECIMALS))
    }
}

impl From<U256> for Wad {
    fn from(val: U256) -> Self {
        Self(val)
    }
}

impl Serialize for Wad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// TokenAmount: the only amount shape accepted by write entry points
// ---------------------------------------------------------------------------

/// Base-unit amount together with the decimal scale it was encoded at.
///
/// Constructed only inside the crate, after the token's decimals have been
/// resolved, so a raw user string can never reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    pub(crate) fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_base_units(self.raw, self.decimals))
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// A user-typed amount that passed the syntax checks: unsigned digits with
/// at most one decimal point, not zero. Kept as digits so no precision is
/// lost before scaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountInput {
    whole: String,
    /// Trailing zeros stripped.
    fraction: String,
}

impl AmountInput {
    /// Fractional digits that carry value.
    pub fn precision(&self) -> usize {
        self.fraction.len()
    }
}

impl fmt::Display for AmountInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            f.write_str(&self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}

/// Parse a user-typed amount. Rejects empty, non-numeric, zero and negative
/// input with a `Validation` error naming `field`.
pub fn parse_amount_input(field: &'static str, input: &str) -> Result<AmountInput, ClientError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(field, "is required"));
    }
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
        return Err(ClientError::validation(field, format!("'{trimmed}' is not a number")));
    }

    let whole = whole.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    if negative || (whole.is_empty() && fraction.is_empty()) {
        return Err(ClientError::validation(field, "must be greater than zero"));
    }
    Ok(AmountInput {
        whole: if whole.is_empty() { "0" } else { whole }.to_string(),
        fraction: fraction.to_string(),
    })
}

/// Scale a parsed amount into base units at `decimals` precision.
///
/// Fails when the value carries more fractional digits than the token
/// supports; amounts are never silently truncated.
pub fn to_base_units(field: &'static str, value: &AmountInput, decimals: u8) -> Result<U256, ClientError> {
    if value.precision() > usize::from(decimals) {
        return Err(ClientError::validation(
            field,
            format!("supports at most {decimals} decimal places"),
        ));
    }
    parse_units(&value.to_string(), decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| ClientError::validation(field, format!("'{value}' is out of range: {e}")))
}

/// Format base units as a plain decimal string without trailing zeros,
/// e.g. `12345000000000000000` at 18 decimals → `"12.345"`.
pub fn format_base_units(raw: U256, decimals: u8) -> String {
    match format_units(raw, decimals) {
        Ok(formatted) => trim_fraction(formatted),
        Err(_) => raw.to_string(),
    }
}

/// Lossless `Decimal` view of a base-unit amount, saturating at
/// `Decimal::MAX` when the value exceeds 96 bits of mantissa.
pub fn base_units_to_decimal(raw: U256, decimals: u8) -> Decimal {
    i128::try_from(raw)
        .ok()
        .and_then(|m| Decimal::try_from_i128_with_scale(m, u32::from(decimals)).ok())
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}

fn trim_fraction(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
