//! Raw protocol interface.
//!
//! `ProtocolEngine` mirrors the engine's ABI one method per entry point,
//! with base-unit `U256` amounts. The alloy-backed implementation lives in
//! `engine_client`; tests drive the same trait through `mock`.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;

use crate::errors::ClientError;
use crate::types::{HealthFactor, Wad};

/// Second-level account data returned by `getAccountInformation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInformation {
    pub total_minted: Wad,
    pub collateral_value_usd: Wad,
}

/// What the client keeps from an inclusion receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// A broadcast transaction awaiting inclusion.
///
/// The hash is known as soon as the wallet accepts the request; inclusion
/// resolves once the receipt is available and fails when it reports a
/// revert.
pub struct PendingTx {
    tx_hash: B256,
    inclusion: BoxFuture<'static, Result<TxReceiptSummary, ClientError>>,
}

impl PendingTx {
    pub fn new<F>(tx_hash: B256, inclusion: F) -> Self
    where
        F: Future<Output = Result<TxReceiptSummary, ClientError>> + Send + 'static,
    {
        Self {
            tx_hash,
            inclusion: inclusion.boxed(),
        }
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    /// Future resolving when the transaction is included.
    pub fn included(self) -> BoxFuture<'static, Result<TxReceiptSummary, ClientError>> {
        self.inclusion
    }
}

impl fmt::Debug for PendingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTx")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    fn engine_address(&self) -> Address;

    fn stablecoin_address(&self) -> Address;

    // -- Reads --------------------------------------------------------------

    async fn balance_of(&self, account: Address) -> Result<U256, ClientError>;

    async fn account_information(&self, account: Address)
        -> Result<AccountInformation, ClientError>;

    /// Fails when the engine reverts, which it may do for accounts without
    /// debt.
    async fn health_factor(&self, account: Address) -> Result<HealthFactor, ClientError>;

    async fn collateral_tokens(&self) -> Result<Vec<Address>, ClientError>;

    async fn collateral_balance(&self, account: Address, token: Address)
        -> Result<U256, ClientError>;

    async fn token_decimals(&self, token: Address) -> Result<u8, ClientError>;

    /// Allowance `owner` has granted the engine on `token`.
    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, ClientError>;

    // -- Writes -------------------------------------------------------------

    /// Approve the engine to pull `amount` of `token`.
    async fn approve(&self, token: Address, amount: U256) -> Result<PendingTx, ClientError>;

    async fn deposit_collateral(&self, token: Address, amount: U256)
        -> Result<PendingTx, ClientError>;

    async fn mint_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError>;

    async fn deposit_collateral_and_mint(
        &self,
        token: Address,
        collateral: U256,
        mint: U256,
    ) -> Result<PendingTx, ClientError>;

    async fn burn_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError>;

    async fn redeem_collateral(&self, token: Address, amount: U256)
        -> Result<PendingTx, ClientError>;

    async fn redeem_collateral_for_burn(
        &self,
        token: Address,
        collateral: U256,
        burn: U256,
    ) -> Result<PendingTx, ClientError>;

    async fn liquidate(
        &self,
        token: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTx, ClientError>;
}
