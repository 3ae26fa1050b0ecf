//! Typed facade over the protocol engine.
//!
//! Owns the per-token decimals cache and the decimal-string → base-unit
//! conversion. Write entry points accept only `TokenAmount`, so an amount
//! cannot reach the engine without having been scaled for its token.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::constants::STABLECOIN_DECIMALS;
use crate::errors::ClientError;
use crate::types::units::{parse_amount_input, to_base_units};
use crate::types::{HealthFactor, TokenAmount, Wad};

use super::engine::{AccountInformation, PendingTx, ProtocolEngine};

pub struct ContractFacade {
    engine: Arc<dyn ProtocolEngine>,
    /// Decimals never change for a token address.
    decimals: Mutex<HashMap<Address, u8>>,
}

impl ContractFacade {
    pub fn new(engine: Arc<dyn ProtocolEngine>) -> Self {
        Self {
            engine,
            decimals: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine_address(&self) -> Address {
        self.engine.engine_address()
    }

    pub fn stablecoin_address(&self) -> Address {
        self.engine.stablecoin_address()
    }

    // -----------------------------------------------------------------------
    // Numeric scale
    // -----------------------------------------------------------------------

    /// Decimal count of `token`; 18 for the stablecoin, queried once and
    /// cached for anything else.
    pub async fn decimals_of(&self, token: Address) -> Result<u8, ClientError> {
        if token == self.stablecoin_address() {
            return Ok(STABLECOIN_DECIMALS);
        }
        if let Some(d) = self.decimals.lock().await.get(&token) {
            return Ok(*d);
        }
        let fetched = self.engine.token_decimals(token).await?;
        debug!(token = %token, decimals = fetched, "token decimals cached");
        self.decimals.lock().await.insert(token, fetched);
        Ok(fetched)
    }

    /// Parse and scale a user-typed amount of `token`.
    pub async fn parse_amount(
        &self,
        field: &'static str,
        token: Address,
        input: &str,
    ) -> Result<TokenAmount, ClientError> {
        let value = parse_amount_input(field, input)?;
        let decimals = self.decimals_of(token).await?;
        let raw = to_base_units(field, &value, decimals)?;
        Ok(TokenAmount::new(raw, decimals))
    }

    /// Parse and scale a user-typed stablecoin amount.
    pub fn parse_stable_amount(
        &self,
        field: &'static str,
        input: &str,
    ) -> Result<TokenAmount, ClientError> {
        let value = parse_amount_input(field, input)?;
        let raw = to_base_units(field, &value, STABLECOIN_DECIMALS)?;
        Ok(TokenAmount::new(raw, STABLECOIN_DECIMALS))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn stablecoin_balance(&self, account: Address) -> Result<Wad, ClientError> {
        self.engine.balance_of(account).await.map(Wad)
    }

    pub async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, ClientError> {
        self.engine.account_information(account).await
    }

    pub async fn health_factor(&self, account: Address) -> Result<HealthFactor, ClientError> {
        self.engine.health_factor(account).await
    }

    pub async fn collateral_tokens(&self) -> Result<Vec<Address>, ClientError> {
        self.engine.collateral_tokens().await
    }

    pub async fn collateral_balance(
        &self,
        account: Address,
        token: Address,
    ) -> Result<U256, ClientError> {
        self.engine.collateral_balance(account, token).await
    }

    pub async fn allowance(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
        self.engine.allowance(token, owner).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn approve(&self, token: Address, amount: TokenAmount) -> Result<PendingTx, ClientError> {
        self.engine.approve(token, amount.raw()).await
    }

    pub async fn deposit_collateral(
        &self,
        token: Address,
        amount: TokenAmount,
    ) -> Result<PendingTx, ClientError> {
        self.engine.deposit_collateral(token, amount.raw()).await
    }

    pub async fn mint_stablecoin(&self, amount: TokenAmount) -> Result<PendingTx, ClientError> {
        self.engine.mint_stablecoin(amount.raw()).await
    }

    pub async fn deposit_collateral_and_mint(
        &self,
        token: Address,
        collateral: TokenAmount,
        mint: TokenAmount,
    ) -> Result<PendingTx, ClientError> {
        self.engine
            .deposit_collateral_and_mint(token, collateral.raw(), mint.raw())
            .await
    }

    pub async fn burn_stablecoin(&self, amount: TokenAmount) -> Result<PendingTx, ClientError> {
        self.engine.burn_stablecoin(amount.raw()).await
    }

    pub async fn redeem_collateral(
        &self,
        token: Address,
        amount: TokenAmount,
    ) -> Result<PendingTx, ClientError> {
        self.engine.redeem_collateral(token, amount.raw()).await
    }

    pub async fn redeem_collateral_for_burn(
        &self,
        token: Address,
        collateral: TokenAmount,
        burn: TokenAmount,
    ) -> Result<PendingTx, ClientError> {
        self.engine
            .redeem_collateral_for_burn(token, collateral.raw(), burn.raw())
            .await
    }

    pub async fn liquidate(
        &self,
        token: Address,
        user: Address,
        debt_to_cover: TokenAmount,
    ) -> Result<PendingTx, ClientError> {
        self.engine.liquidate(token, user, debt_to_cover.raw()).await
    }
}
