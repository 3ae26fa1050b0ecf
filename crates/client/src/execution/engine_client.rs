//! Alloy-backed `ProtocolEngine`.
//!
//! Reads go through the `sol!`-generated instances. Writes are encoded with
//! `SolCall` into a `TransactionRequest` sent `from` the session account;
//! the wallet behind the provider signs. No simulation or nonce handling
//! happens here: the wallet owns both.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::constants::{UNAUTHORIZED_CODE, USER_REJECTED_CODE};
use crate::errors::ClientError;
use crate::types::{HealthFactor, Wad};

use super::contracts::{IStableEngine, IERC20};
use super::engine::{AccountInformation, PendingTx, ProtocolEngine, TxReceiptSummary};
use super::revert::decode_revert_reason;

/// Who answers for a failed write.
#[derive(Debug, Clone, Copy)]
enum WriteTarget {
    Approval(Address),
    Engine,
}

impl WriteTarget {
    fn failure(self, tx_hash: Option<B256>, reason: String) -> ClientError {
        match self {
            Self::Approval(token) => ClientError::ApprovalFailed { token, reason },
            Self::Engine => ClientError::TxReverted {
                tx_hash: tx_hash.map(|h| h.to_string()),
                reason,
            },
        }
    }

    /// Classify an error raised while handing the request to the wallet.
    fn classify(self, err: TransportError) -> ClientError {
        if let Some(payload) = err.as_error_resp() {
            if payload.code == USER_REJECTED_CODE {
                return ClientError::UserRejected {
                    reason: payload.message.to_string(),
                };
            }
            if payload.code == UNAUTHORIZED_CODE {
                return ClientError::NotConnected;
            }
            if let Some(data) = payload.as_revert_data() {
                return self.failure(None, decode_revert_reason(&data));
            }
            return self.failure(None, payload.message.to_string());
        }
        if matches!(err, RpcError::Transport(_)) {
            return ClientError::ProviderUnavailable {
                reason: err.to_string(),
            };
        }
        self.failure(None, err.to_string())
    }
}

fn read_error(err: alloy::contract::Error) -> ClientError {
    match err {
        alloy::contract::Error::TransportError(e) => ClientError::Transport(e),
        other => ClientError::SnapshotUnavailable {
            reason: other.to_string(),
        },
    }
}

/// `getHealthFactor` reverts for an account that has no debt.
fn health_factor_error(err: alloy::contract::Error) -> ClientError {
    let reverted = match &err {
        alloy::contract::Error::TransportError(e) => e.as_error_resp().is_some_and(|payload| {
            payload.as_revert_data().is_some() || payload.message.contains("revert")
        }),
        _ => false,
    };
    if reverted {
        ClientError::HealthFactorUndefined
    } else {
        read_error(err)
    }
}

/// `ProtocolEngine` over an alloy `DynProvider`.
///
/// Built per session: `from` is the connected account and the provider is
/// the wallet's signing handle.
pub struct AlloyEngine {
    provider: DynProvider,
    engine: IStableEngine::IStableEngineInstance<DynProvider>,
    stablecoin: Address,
    from: Address,
}

impl AlloyEngine {
    pub fn new(provider: DynProvider, engine: Address, stablecoin: Address, from: Address) -> Self {
        info!(
            engine = %engine,
            stablecoin = %stablecoin,
            from = %from,
            "protocol engine client initialized"
        );
        Self {
            engine: IStableEngine::new(engine, provider.clone()),
            provider,
            stablecoin,
            from,
        }
    }

    async fn send(
        &self,
        to: Address,
        input: Vec<u8>,
        target: WriteTarget,
        label: &'static str,
    ) -> Result<PendingTx, ClientError> {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(to)
            .with_input(Bytes::from(input));

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| target.classify(e))?;
        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, call = label, "transaction broadcast");

        let inclusion = async move {
            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| target.failure(Some(tx_hash), e.to_string()))?;
            if !receipt.status() {
                warn!(tx_hash = %tx_hash, call = label, "transaction reverted on-chain");
                return Err(target.failure(
                    Some(tx_hash),
                    "transaction reverted on-chain".into(),
                ));
            }
            debug!(
                tx_hash = %tx_hash,
                block = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "transaction included"
            );
            Ok(TxReceiptSummary {
                tx_hash,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used,
            })
        };

        Ok(PendingTx::new(tx_hash, inclusion))
    }

    async fn send_engine<C: SolCall + Send>(
        &self,
        call: C,
        label: &'static str,
    ) -> Result<PendingTx, ClientError> {
        self.send(
            *self.engine.address(),
            call.abi_encode(),
            WriteTarget::Engine,
            label,
        )
        .await
    }
}

#[async_trait]
impl ProtocolEngine for AlloyEngine {
    fn engine_address(&self) -> Address {
        *self.engine.address()
    }

    fn stablecoin_address(&self) -> Address {
        self.stablecoin
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
        self.engine
            .balanceOf(account)
            .call()
            .await
            .map_err(read_error)
    }

    async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, ClientError> {
        let info = self
            .engine
            .getAccountInformation(account)
            .call()
            .await
            .map_err(read_error)?;
        Ok(AccountInformation {
            total_minted: Wad(info.totalMinted),
            collateral_value_usd: Wad(info.collateralValueInUsd),
        })
    }

    async fn health_factor(&self, account: Address) -> Result<HealthFactor, ClientError> {
        self.engine
            .getHealthFactor(account)
            .call()
            .await
            .map(HealthFactor::from_raw)
            .map_err(health_factor_error)
    }

    async fn collateral_tokens(&self) -> Result<Vec<Address>, ClientError> {
        self.engine
            .getCollateralTokens()
            .call()
            .await
            .map_err(read_error)
    }

    async fn collateral_balance(
        &self,
        account: Address,
        token: Address,
    ) -> Result<U256, ClientError> {
        self.engine
            .getCollateralBalanceOfUser(account, token)
            .call()
            .await
            .map_err(read_error)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ClientError> {
        IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(read_error)
    }

    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, *self.engine.address())
            .call()
            .await
            .map_err(read_error)
    }

    async fn approve(&self, token: Address, amount: U256) -> Result<PendingTx, ClientError> {
        let call = IERC20::approveCall {
            spender: *self.engine.address(),
            amount,
        };
        self.send(
            token,
            call.abi_encode(),
            WriteTarget::Approval(token),
            "approve",
        )
        .await
    }

    async fn deposit_collateral(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::depositCollateralCall {
                tokenCollateralAddress: token,
                amountCollateral: amount,
            },
            "depositCollateral",
        )
        .await
    }

    async fn mint_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::mintStablecoinCall {
                amountToMint: amount,
            },
            "mintStablecoin",
        )
        .await
    }

    async fn deposit_collateral_and_mint(
        &self,
        token: Address,
        collateral: U256,
        mint: U256,
    ) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::depositCollateralAndMintCall {
                tokenCollateralAddress: token,
                amountCollateral: collateral,
                amountToMint: mint,
            },
            "depositCollateralAndMint",
        )
        .await
    }

    async fn burn_stablecoin(&self, amount: U256) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::burnStablecoinCall { amount },
            "burnStablecoin",
        )
        .await
    }

    async fn redeem_collateral(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::redeemCollateralCall {
                tokenCollateralAddress: token,
                amountCollateral: amount,
            },
            "redeemCollateral",
        )
        .await
    }

    async fn redeem_collateral_for_burn(
        &self,
        token: Address,
        collateral: U256,
        burn: U256,
    ) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::redeemCollateralForBurnCall {
                tokenCollateralAddress: token,
                amountCollateral: collateral,
                amountToBurn: burn,
            },
            "redeemCollateralForBurn",
        )
        .await
    }

    async fn liquidate(
        &self,
        token: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTx, ClientError> {
        self.send_engine(
            IStableEngine::liquidateCall {
                collateral: token,
                user,
                debtToCover: debt_to_cover,
            },
            "liquidate",
        )
        .await
    }
}
