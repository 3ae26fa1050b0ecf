use std::sync::Arc;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use anyhow::{Context, Result};
use tracing::{error, info, warn};

use stablefi_client::config::{self, ClientConfig, PRIVATE_KEY_ENV};
use stablefi_client::core::startup_check::StartupCheck;
use stablefi_client::logging;
use stablefi_client::session::{AlloyEngineFactory, LocalKeyWallet, RpcWallet, WalletProvider};
use stablefi_client::types::PositionSnapshot;
use stablefi_client::{AppState, ClientSettings, StableFiClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let config_dir = config::config_dir();
    let config = config::load_config(&config_dir)?;

    // Hold the guard for the process lifetime so buffered logs flush on exit.
    let _log_guard = logging::init_tracing(&config.app.logging)?;

    info!(
        chain = %config.chain.chain_name,
        chain_id = config.chain.chain_id,
        config_dir = %config_dir.display(),
        "StableFi client starting"
    );

    // -----------------------------------------------------------------------
    // Startup diagnostics
    // -----------------------------------------------------------------------

    let engine = config.chain.engine_address()?;
    let stablecoin = config.chain.stablecoin_address()?;

    let rpc_url: Url = config
        .chain
        .rpc
        .http_url
        .parse()
        .context("failed to parse RPC URL")?;
    let reader: DynProvider = ProviderBuilder::new().connect_http(rpc_url).erased();
    let diagnostics = StartupCheck::new(Arc::new(reader), config.chain.chain_id, engine, stablecoin)
        .run()
        .await;
    if !diagnostics.all_critical_passed {
        warn!("continuing with failed startup checks; writes will be unavailable");
    }

    // -----------------------------------------------------------------------
    // Client construction
    // -----------------------------------------------------------------------

    let wallet = init_wallet(&config)?;
    let factory = Arc::new(AlloyEngineFactory::from_config(&config.chain)?);
    let client = Arc::new(StableFiClient::new(
        wallet,
        factory,
        ClientSettings::from_config(&config),
    ));

    let session = client.connect().await.context("wallet connection failed")?;
    info!(address = %session.address, chain_id = session.chain_id, "session open");
    log_state(&client.state().await);

    client.start().await;

    // -----------------------------------------------------------------------
    // Follow session changes until Ctrl+C
    // -----------------------------------------------------------------------

    info!("watching wallet - press Ctrl+C to exit");
    let mut changes = client.sessions().subscribe();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                // The client rebinds on the same notification; make sure it
                // has before reading state.
                client.resync().await;
                log_state(&client.state().await);
            }
        }
    }

    info!("shutdown signal received, stopping gracefully...");
    client.shutdown().await;
    client.disconnect().await;
    info!("shutdown complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Initialization helpers
// ---------------------------------------------------------------------------

/// JSON-RPC wallet when `rpc.wallet_url` is set, otherwise the development
/// key wallet from `STABLEFI_PRIVATE_KEY`.
fn init_wallet(config: &ClientConfig) -> Result<Arc<dyn WalletProvider>> {
    if config.chain.uses_wallet_endpoint() {
        let wallet = RpcWallet::connect(&config.chain.rpc.wallet_url)?;
        return Ok(Arc::new(wallet));
    }

    let key = std::env::var(PRIVATE_KEY_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{PRIVATE_KEY_ENV} is required without a wallet endpoint"))?;
    let wallet = LocalKeyWallet::from_hex_key(&key, &config.chain.rpc.http_url)?;
    Ok(Arc::new(wallet))
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn log_state(state: &AppState) {
    let Some(session) = state.session() else {
        info!("wallet disconnected");
        return;
    };
    if let Some(reason) = state.contract_error() {
        error!(address = %session.address, chain_id = session.chain_id, reason, "contracts unavailable");
        return;
    }
    match state.snapshot() {
        Some(snapshot) => log_snapshot(snapshot, state.stale_reason()),
        None => warn!(address = %session.address, "no snapshot loaded"),
    }
}

fn log_snapshot(snapshot: &PositionSnapshot, stale: Option<&str>) {
    info!(
        account = %snapshot.account,
        stablecoin_balance = %snapshot.stablecoin_balance,
        total_minted = %snapshot.total_minted,
        collateral_value_usd = %snapshot.collateral_value_usd,
        health_factor = %snapshot.health_factor,
        liquidatable = snapshot.is_liquidatable(),
        fetched_at = snapshot.fetched_at,
        "position snapshot"
    );
    for deposit in &snapshot.collateral_deposits {
        info!(
            token = %deposit.token.address,
            decimals = deposit.token.decimals,
            deposited = %deposit.deposited_display(),
            "collateral"
        );
    }
    if let Some(reason) = stale {
        warn!(reason, "snapshot is stale");
    }
}
