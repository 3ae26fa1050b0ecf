//! Wallet providers: the account-access and signing side of a session.
//!
//! [`RpcWallet`] talks to an EIP-1193 wallet exposed over JSON-RPC (a
//! desktop wallet's local endpoint, or a node with unlocked accounts), which
//! signs `eth_sendTransaction` itself. [`LocalKeyWallet`] signs locally with
//! a development private key and submits to a plain RPC node.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::constants::{UNAUTHORIZED_CODE, USER_REJECTED_CODE};
use crate::errors::ClientError;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short name for logs.
    fn label(&self) -> &'static str;

    /// Ask the wallet for account access. May prompt the user.
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError>;

    /// Accounts currently exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, ClientError>;

    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// Handle that reads from the chain and sends transactions signed by
    /// this wallet.
    fn transaction_provider(&self) -> DynProvider;
}

/// Map a wallet-side transport error onto the session error taxonomy.
pub(crate) fn wallet_error(err: TransportError) -> ClientError {
    if let Some(payload) = err.as_error_resp() {
        match payload.code {
            USER_REJECTED_CODE => {
                return ClientError::UserRejected {
                    reason: payload.message.to_string(),
                }
            }
            UNAUTHORIZED_CODE => return ClientError::NotConnected,
            _ => {}
        }
    }
    if matches!(err, RpcError::Transport(_)) {
        return ClientError::ProviderUnavailable {
            reason: err.to_string(),
        };
    }
    ClientError::Transport(err)
}

fn parse_url(url: &str) -> Result<Url, ClientError> {
    url.parse()
        .map_err(|e| ClientError::Config(format!("invalid wallet url '{url}': {e}")))
}

// ---------------------------------------------------------------------------
// RpcWallet
// ---------------------------------------------------------------------------

/// EIP-1193 wallet reachable over HTTP JSON-RPC.
pub struct RpcWallet {
    provider: DynProvider,
}

impl RpcWallet {
    pub fn connect(wallet_url: &str) -> Result<Self, ClientError> {
        let url = parse_url(wallet_url)?;
        info!(url = %url, "using JSON-RPC wallet endpoint");
        Ok(Self {
            provider: ProviderBuilder::new().connect_http(url).erased(),
        })
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    fn label(&self) -> &'static str {
        "rpc"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        let accounts: Vec<Address> = self
            .provider
            .raw_request("eth_requestAccounts".into(), ())
            .await
            .map_err(wallet_error)?;
        debug!(count = accounts.len(), "eth_requestAccounts answered");
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.provider.get_accounts().await.map_err(wallet_error)
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider.get_chain_id().await.map_err(wallet_error)
    }

    fn transaction_provider(&self) -> DynProvider {
        self.provider.clone()
    }
}

// ---------------------------------------------------------------------------
// LocalKeyWallet
// ---------------------------------------------------------------------------

/// Development wallet backed by a local private key. Account access is
/// never prompted, so `request_accounts` cannot be rejected.
pub struct LocalKeyWallet {
    address: Address,
    provider: DynProvider,
}

impl LocalKeyWallet {
    pub fn new(signer: PrivateKeySigner, rpc_url: &str) -> Result<Self, ClientError> {
        let url = parse_url(rpc_url)?;
        let address = signer.address();
        info!(address = %address, url = %url, "using local key wallet");
        Ok(Self {
            address,
            provider: ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased(),
        })
    }

    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex_key(key: &str, rpc_url: &str) -> Result<Self, ClientError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid private key: {e}")))?;
        Self::new(signer, rpc_url)
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    fn label(&self) -> &'static str {
        "local-key"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        Ok(vec![self.address])
    }

    async fn accounts(&self) -> Result<Vec<Address>, ClientError> {
        Ok(vec![self.address])
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider.get_chain_id().await.map_err(wallet_error)
    }

    fn transaction_provider(&self) -> DynProvider {
        self.provider.clone()
    }
}
