use alloy::primitives::Address;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_PENDING_NOTICE_SECONDS, DEFAULT_WALLET_POLL_SECONDS};
use crate::errors::ClientError;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppConfig,
    pub chain: ChainConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds before an awaited inclusion is reported as still pending.
    pub pending_notice_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pending_notice_seconds: DEFAULT_PENDING_NOTICE_SECONDS,
        }
    }
}

impl OrchestratorConfig {
    pub fn pending_notice(&self) -> Duration {
        Duration::from_secs(self.pending_notice_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// How often the wallet is polled for account and chain changes.
    pub poll_interval_seconds: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_WALLET_POLL_SECONDS,
        }
    }
}

impl WalletConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

// ---------------------------------------------------------------------------
// chain.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc: RpcConfig,
    pub contracts: ContractsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Read endpoint, also used by the development key wallet.
    pub http_url: String,
    /// EIP-1193 wallet endpoint. Empty selects the local key wallet.
    #[serde(default)]
    pub wallet_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    pub engine: String,
    /// Empty when the engine fronts its own stablecoin.
    #[serde(default)]
    pub stablecoin: String,
}

impl ChainConfig {
    pub fn engine_address(&self) -> Result<Address, ClientError> {
        Address::from_str(&self.contracts.engine).map_err(|e| {
            ClientError::Config(format!("chain.contracts.engine '{}': {e}", self.contracts.engine))
        })
    }

    pub fn stablecoin_address(&self) -> Result<Address, ClientError> {
        if self.contracts.stablecoin.is_empty() {
            return self.engine_address();
        }
        Address::from_str(&self.contracts.stablecoin).map_err(|e| {
            ClientError::Config(format!(
                "chain.contracts.stablecoin '{}': {e}",
                self.contracts.stablecoin
            ))
        })
    }

    pub fn uses_wallet_endpoint(&self) -> bool {
        !self.rpc.wallet_url.is_empty()
    }
}
