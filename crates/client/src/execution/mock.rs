//! In-memory protocol engine for tests.
//!
//! Records every call in order, applies write effects on inclusion, and can
//! hold inclusion behind a `Notify` gate.

use alloy::primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::errors::ClientError;
use crate::types::{HealthFactor, Wad};

use super::engine::{AccountInformation, PendingTx, ProtocolEngine, TxReceiptSummary};

pub const ACCOUNT: Address = address!("00000000000000000000000000000000000000a1");
pub const OTHER_ACCOUNT: Address = address!("00000000000000000000000000000000000000a2");
pub const ENGINE: Address = address!("00000000000000000000000000000000000000e0");
pub const STABLECOIN: Address = address!("00000000000000000000000000000000000000c0");
pub const WETH: Address = address!("00000000000000000000000000000000000000e1");
pub const WBTC: Address = address!("00000000000000000000000000000000000000b1");

/// USD price of every mock collateral token, in whole dollars.
const MOCK_PRICE_USD: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    BalanceOf(Address),
    AccountInformation(Address),
    HealthFactor(Address),
    CollateralTokens,
    CollateralBalance(Address, Address),
    Decimals(Address),
    Allowance(Address, Address),
    Approve { token: Address, amount: U256 },
    DepositCollateral { token: Address, amount: U256 },
    MintStablecoin(U256),
    DepositCollateralAndMint { token: Address, collateral: U256, mint: U256 },
    BurnStablecoin(U256),
    RedeemCollateral { token: Address, amount: U256 },
    RedeemCollateralForBurn { token: Address, collateral: U256, burn: U256 },
    Liquidate { token: Address, user: Address, debt_to_cover: U256 },
    Included(B256),
}

impl ChainCall {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Self::BalanceOf(_)
                | Self::AccountInformation(_)
                | Self::HealthFactor(_)
                | Self::CollateralTokens
                | Self::CollateralBalance(..)
                | Self::Decimals(_)
                | Self::Allowance(..)
                | Self::Included(_)
        )
    }
}

struct MockState {
    stablecoin_balance: U256,
    total_minted: U256,
    collateral_value_usd: U256,
    /// `None` makes `getHealthFactor` revert as it does for a debt-free account.
    health_factor: Option<U256>,
    tokens: Vec<(Address, u8)>,
    deposits: HashMap<Address, U256>,
    allowances: HashMap<Address, U256>,
    fail_balance: bool,
    reject_approval: bool,
    /// Approvals are accepted but revert on inclusion.
    revert_approval: bool,
    revert_writes: Option<String>,
    next_tx: u8,
}

impl MockState {
    fn decimals(&self, token: Address) -> Option<u8> {
        self.tokens.iter().find(|(t, _)| *t == token).map(|(_, d)| *d)
    }

    fn usd_value(&self, token: Address, amount: U256) -> U256 {
        let decimals = self.decimals(token).unwrap_or(18);
        let scale = U256::from(10u8).pow(U256::from(18 - decimals));
        amount * scale * U256::from(MOCK_PRICE_USD)
    }

    fn apply(&mut self, call: &ChainCall) -> Result<(), String> {
        match call {
            ChainCall::Approve { .. } if self.revert_approval => {
                return Err("approve reverted".into());
            }
            ChainCall::Approve { token, amount } => {
                self.allowances.insert(*token, *amount);
            }
            ChainCall::DepositCollateral { token, amount } => self.deposit(*token, *amount)?,
            ChainCall::MintStablecoin(amount) => self.mint(*amount),
            ChainCall::DepositCollateralAndMint {
                token,
                collateral,
                mint,
            } => {
                self.deposit(*token, *collateral)?;
                self.mint(*mint);
            }
            ChainCall::BurnStablecoin(amount) => self.burn(*amount)?,
            ChainCall::RedeemCollateral { token, amount } => self.redeem(*token, *amount)?,
            ChainCall::RedeemCollateralForBurn {
                token,
                collateral,
                burn,
            } => {
                self.burn(*burn)?;
                self.redeem(*token, *collateral)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn deposit(&mut self, token: Address, amount: U256) -> Result<(), String> {
        if self.decimals(token).is_none() {
            return Err(format!("token {token} is not accepted as collateral"));
        }
        let allowance = self.allowances.get(&token).copied().unwrap_or_default();
        if allowance < amount {
            return Err("ERC20: insufficient allowance".into());
        }
        self.allowances.insert(token, allowance - amount);
        *self.deposits.entry(token).or_default() += amount;
        self.collateral_value_usd += self.usd_value(token, amount);
        Ok(())
    }

    fn redeem(&mut self, token: Address, amount: U256) -> Result<(), String> {
        let deposited = self.deposits.get(&token).copied().unwrap_or_default();
        if deposited < amount {
            return Err("Panic: arithmetic overflow/underflow".into());
        }
        self.deposits.insert(token, deposited - amount);
        self.collateral_value_usd = self
            .collateral_value_usd
            .saturating_sub(self.usd_value(token, amount));
        Ok(())
    }

    fn mint(&mut self, amount: U256) {
        self.total_minted += amount;
        self.stablecoin_balance += amount;
    }

    fn burn(&mut self, amount: U256) -> Result<(), String> {
        if self.stablecoin_balance < amount {
            return Err("Panic: arithmetic overflow/underflow".into());
        }
        self.stablecoin_balance -= amount;
        self.total_minted = self.total_minted.saturating_sub(amount);
        Ok(())
    }
}

pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    calls: Arc<Mutex<Vec<ChainCall>>>,
    gate: Option<Arc<Notify>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                stablecoin_balance: U256::ZERO,
                total_minted: U256::ZERO,
                collateral_value_usd: U256::ZERO,
                health_factor: Some(U256::MAX),
                tokens: Vec::new(),
                deposits: HashMap::new(),
                allowances: HashMap::new(),
                fail_balance: false,
                reject_approval: false,
                revert_approval: false,
                revert_writes: None,
                next_tx: 1,
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    fn edit(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_token(self, token: Address, decimals: u8) -> Self {
        self.edit(|s| s.tokens.push((token, decimals)))
    }

    pub fn with_stablecoin_balance(self, amount: U256) -> Self {
        self.edit(|s| {
            s.stablecoin_balance = amount;
            s.total_minted = amount;
        })
    }

    pub fn with_deposit(self, token: Address, amount: U256) -> Self {
        self.edit(|s| {
            let value = s.usd_value(token, amount);
            s.deposits.insert(token, amount);
            s.collateral_value_usd += value;
        })
    }

    pub fn with_allowance(self, token: Address, amount: U256) -> Self {
        self.edit(|s| {
            s.allowances.insert(token, amount);
        })
    }

    pub fn with_health_factor(self, raw: U256) -> Self {
        self.edit(|s| s.health_factor = Some(raw))
    }

    pub fn failing_health_factor(self) -> Self {
        self.edit(|s| s.health_factor = None)
    }

    pub fn failing_balance(self) -> Self {
        self.edit(|s| s.fail_balance = true)
    }

    pub fn rejecting_approval(self) -> Self {
        self.edit(|s| s.reject_approval = true)
    }

    pub fn reverting_approval(self) -> Self {
        self.edit(|s| s.revert_approval = true)
    }

    pub fn reverting_writes(self, reason: &str) -> Self {
        let reason = reason.to_string();
        self.edit(|s| s.revert_writes = Some(reason))
    }

    /// Hold every inclusion until the returned gate is notified once per
    /// transaction.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<ChainCall> {
        self.calls().into_iter().filter(ChainCall::is_write).collect()
    }

    /// Completed snapshot reads; each refresh lists the collateral tokens
    /// exactly once.
    pub fn refresh_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ChainCall::CollateralTokens))
            .count()
    }

    pub fn allowance_of(&self, token: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .allowances
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, call: ChainCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn write(&self, call: ChainCall) -> Result<PendingTx, ClientError> {
        self.record(call.clone());
        let approval = match call {
            ChainCall::Approve { token, .. } => Some(token),
            _ => None,
        };

        let tx_hash = {
            let mut state = self.state.lock().unwrap();
            if let Some(token) = approval.filter(|_| state.reject_approval) {
                return Err(ClientError::UserRejected {
                    reason: format!("User denied approval of {token}"),
                });
            }
            if approval.is_none() {
                if let Some(reason) = state.revert_writes.clone() {
                    return Err(ClientError::TxReverted {
                        tx_hash: None,
                        reason,
                    });
                }
            }
            let hash = B256::with_last_byte(state.next_tx);
            state.next_tx = state.next_tx.wrapping_add(1);
            hash
        };

        let state = self.state.clone();
        let calls = self.calls.clone();
        let gate = self.gate.clone();
        let inclusion = async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let outcome = state.lock().unwrap().apply(&call);
            calls.lock().unwrap().push(ChainCall::Included(tx_hash));
            outcome.map_err(|reason| match approval {
                Some(token) => ClientError::ApprovalFailed { token, reason },
                None => ClientError::TxReverted {
                    tx_hash: Some(tx_hash.to_string()),
                    reason,
                },
            })?;
            Ok(TxReceiptSummary {
                tx_hash,
                block_number: Some(1),
                gas_used: 50_000,
            })
        };
        Ok(PendingTx::new(tx_hash, inclusion))
    }
}

#[async_trait]
impl ProtocolEngine for MockEngine {
    fn engine_address(&self) -> Address {
        ENGINE
    }

    fn stablecoin_address(&self) -> Address {
        STABLECOIN
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
        self.record(ChainCall::BalanceOf(account));
        let state = self.state.lock().unwrap();
        if state.fail_balance {
            return Err(ClientError::SnapshotUnavailable {
                reason: "balanceOf: connection reset".into(),
            });
        }
        Ok(state.stablecoin_balance)
    }

    async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, ClientError> {
        self.record(ChainCall::AccountInformation(account));
        let state = self.state.lock().unwrap();
        Ok(AccountInformation {
            total_minted: Wad(state.total_minted),
            collateral_value_usd: Wad(state.collateral_value_usd),
        })
    }

    async fn health_factor(&self, account: Address) -> Result<HealthFactor, ClientError> {
        self.record(ChainCall::HealthFactor(account));
        match self.state.lock().unwrap().health_factor {
            Some(raw) => Ok(HealthFactor::from_raw(raw)),
            None => Err(ClientError::HealthFactorUndefined),
        }
    }

    async fn collateral_tokens(&self) -> Result<Vec<Address>, ClientError> {
        self.record(ChainCall::CollateralTokens);
        Ok(self
            .state
            .lock()
            .unwrap()
            .tokens
            .iter()
            .map(|(t, _)| *t)
            .collect())
    }

    async fn collateral_balance(
        &self,
        account: Address,
        token: Address,
    ) -> Result<U256, ClientError> {
        self.record(ChainCall::CollateralBalance(account, token));
        Ok(self
            .state
            .lock()
            .unwrap()
            .deposits
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ClientError> {
        self.record(ChainCall::Decimals(token));
        self.state
            .lock()
            .unwrap()
            .decimals(token)
            .ok_or_else(|| ClientError::TxReverted {
                tx_hash: None,
                reason: format!("{token} has no decimals()"),
            })
    }

    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
        self.record(ChainCall::Allowance(token, owner));
        Ok(self.allowance_of(token))
    }

    async fn approve(&self, token: Address, amount: U256) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::Approve { token, amount })
    }

    async fn deposit_collateral(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::DepositCollateral { token, amount })
    }

    async fn mint_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::MintStablecoin(amount))
    }

    async fn deposit_collateral_and_mint(
        &self,
        token: Address,
        collateral: U256,
        mint: U256,
    ) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::DepositCollateralAndMint {
            token,
            collateral,
            mint,
        })
    }

    async fn burn_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::BurnStablecoin(amount))
    }

    async fn redeem_collateral(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::RedeemCollateral { token, amount })
    }

    async fn redeem_collateral_for_burn(
        &self,
        token: Address,
        collateral: U256,
        burn: U256,
    ) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::RedeemCollateralForBurn {
            token,
            collateral,
            burn,
        })
    }

    async fn liquidate(
        &self,
        token: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTx, ClientError> {
        self.write(ChainCall::Liquidate {
            token,
            user,
            debt_to_cover,
        })
    }
}
