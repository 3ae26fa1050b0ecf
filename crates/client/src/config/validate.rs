use anyhow::{bail, Result};

use super::types::ClientConfig;
use super::PRIVATE_KEY_ENV;

/// Validate invariants across the merged config that serde alone cannot
/// enforce. Every violation is collected before failing. Called by
/// [`super::load_config`].
pub fn validate_config(config: &ClientConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_app_config(config, &mut errors);
    validate_chain_config(config, &mut errors);
    validate_wallet_requirements(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

fn validate_app_config(config: &ClientConfig, errors: &mut Vec<String>) {
    let app = &config.app;

    if app.logging.log_dir.trim().is_empty() {
        errors.push("app.logging: log_dir is empty".into());
    }
    if app.orchestrator.pending_notice_seconds == 0 {
        errors.push("app.orchestrator: pending_notice_seconds must be > 0".into());
    }
    if app.wallet.poll_interval_seconds == 0 {
        errors.push("app.wallet: poll_interval_seconds must be > 0".into());
    }
}

// ---------------------------------------------------------------------------
// chain.json
// ---------------------------------------------------------------------------

fn validate_chain_config(config: &ClientConfig, errors: &mut Vec<String>) {
    let chain = &config.chain;

    if chain.chain_id == 0 {
        errors.push("chain: chain_id must be non-zero".into());
    }

    if let Err(e) = validate_url(&chain.rpc.http_url) {
        errors.push(format!("chain.rpc.http_url: {e}"));
    }
    if chain.uses_wallet_endpoint() {
        if let Err(e) = validate_url(&chain.rpc.wallet_url) {
            errors.push(format!("chain.rpc.wallet_url: {e}"));
        }
    }

    if let Err(e) = validate_address(&chain.contracts.engine) {
        errors.push(format!("chain.contracts.engine: {e}"));
    }
    // stablecoin can be empty (engine fronts the token), but if set must be valid.
    if !chain.contracts.stablecoin.is_empty() {
        if let Err(e) = validate_address(&chain.contracts.stablecoin) {
            errors.push(format!("chain.contracts.stablecoin: {e}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

fn validate_wallet_requirements(config: &ClientConfig, errors: &mut Vec<String>) {
    if config.chain.uses_wallet_endpoint() {
        return;
    }
    if std::env::var(PRIVATE_KEY_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .is_none()
    {
        errors.push(format!(
            "wallet: set chain.rpc.wallet_url or the {PRIVATE_KEY_ENV} env var"
        ));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate an Ethereum-style address string: must be 0x-prefixed and 42
/// chars of hex.
fn validate_address(addr: &str) -> Result<(), String> {
    if addr.is_empty() {
        return Err("address is empty".into());
    }
    if !addr.starts_with("0x") && !addr.starts_with("0X") {
        return Err(format!("address '{addr}' must start with 0x"));
    }
    if addr.len() != 42 {
        return Err(format!(
            "address '{addr}' has length {} (expected 42)",
            addr.len()
        ));
    }
    if !addr[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("address '{addr}' contains non-hex characters"));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("url is empty".into());
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("url '{url}' must be http(s)"));
    }
    Ok(())
}
