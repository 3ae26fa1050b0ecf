//! Revert data → human-readable reason.
//!
//! Handles `Error(string)`, `Panic(uint256)` and the engine's custom errors.
//! Anything else falls back to hex.

use alloy::primitives::U256;
use alloy::sol_types::SolInterface;

use super::contracts::IStableEngine::IStableEngineErrors;
use crate::types::Wad;

/// `Error(string)` selector: `keccak256("Error(string)")[0..4]`.
const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// `Panic(uint256)` selector: `keccak256("Panic(uint256)")[0..4]`.
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Decode a revert reason from raw return data.
pub fn decode_revert_reason(data: &[u8]) -> String {
    if data.is_empty() {
        return "execution reverted".into();
    }

    if data.len() < 4 {
        return format!("0x{}", hex::encode(data));
    }

    // Error(string): selector(4) + offset(32) + length(32) + data
    if data[..4] == ERROR_SELECTOR && data.len() >= 68 {
        if let Ok(len_bytes) = <[u8; 8]>::try_from(&data[60..68]) {
            let str_len = u64::from_be_bytes(len_bytes) as usize;
            if data.len() >= 68 + str_len {
                return String::from_utf8_lossy(&data[68..68 + str_len]).into_owned();
            }
        }
    }

    // Panic(uint256): selector(4) + code(32)
    if data[..4] == PANIC_SELECTOR && data.len() >= 36 {
        let code = U256::from_be_slice(&data[4..36]);
        return match code.saturating_to::<u64>() {
            0x01 => "Panic: assertion failed".into(),
            0x11 => "Panic: arithmetic overflow/underflow".into(),
            0x12 => "Panic: division by zero".into(),
            0x21 => "Panic: enum conversion out of range".into(),
            0x32 => "Panic: array index out of bounds".into(),
            0x41 => "Panic: too much memory allocated".into(),
            _ => format!("Panic(0x{code:x})"),
        };
    }

    if let Ok(err) = IStableEngineErrors::abi_decode(data) {
        return describe_engine_error(&err);
    }

    format!("0x{}", hex::encode(data))
}

fn describe_engine_error(err: &IStableEngineErrors) -> String {
    match err {
        IStableEngineErrors::StableEngine__NeedsMoreThanZero(_) => {
            "amount must be more than zero".into()
        }
        IStableEngineErrors::StableEngine__TokenNotAllowed(e) => {
            format!("token {} is not accepted as collateral", e.token)
        }
        IStableEngineErrors::StableEngine__TransferFailed(_) => "token transfer failed".into(),
        IStableEngineErrors::StableEngine__BreaksHealthFactor(e) => format!(
            "operation would break the health factor ({})",
            Wad(e.healthFactor)
        ),
        IStableEngineErrors::StableEngine__MintFailed(_) => "stablecoin mint failed".into(),
        IStableEngineErrors::StableEngine__HealthFactorOk(_) => {
            "position is healthy and cannot be liquidated".into()
        }
        IStableEngineErrors::StableEngine__HealthFactorNotImproved(_) => {
            "liquidation did not improve the health factor".into()
        }
    }
}
