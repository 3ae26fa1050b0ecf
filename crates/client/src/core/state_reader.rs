//! Account state reader.
//!
//! Pulls a complete `PositionSnapshot` for one account. The four headline
//! reads run concurrently, then per-token decimals and deposits fan out.
//! A failed health-factor read degrades to `Infinite`; any other failure
//! aborts the refresh with `SnapshotUnavailable` and the caller keeps its
//! previous snapshot.

use alloy::primitives::Address;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::execution::facade::ContractFacade;
use crate::types::{CollateralPosition, CollateralToken, HealthFactor, PositionSnapshot};

pub struct AccountStateReader {
    facade: Arc<ContractFacade>,
}

impl AccountStateReader {
    pub fn new(facade: Arc<ContractFacade>) -> Self {
        Self { facade }
    }

    /// Read-only; safe to call at any time, including while a write is in
    /// flight.
    pub async fn refresh(&self, account: Address) -> Result<PositionSnapshot, ClientError> {
        let facade = &self.facade;
        let (balance, info, health_factor, tokens) = tokio::join!(
            facade.stablecoin_balance(account),
            facade.account_information(account),
            facade.health_factor(account),
            facade.collateral_tokens(),
        );

        let health_factor = match health_factor {
            Ok(hf) => hf,
            Err(ClientError::HealthFactorUndefined) => {
                debug!(account = %account, "no debt, health factor is infinite");
                HealthFactor::Infinite
            }
            Err(e) => {
                warn!(
                    account = %account,
                    error = %e,
                    "health factor read failed, treating as infinite"
                );
                HealthFactor::Infinite
            }
        };
        let balance = balance.map_err(ClientError::into_snapshot_unavailable)?;
        let info = info.map_err(ClientError::into_snapshot_unavailable)?;
        let tokens = tokens.map_err(ClientError::into_snapshot_unavailable)?;

        let collateral_deposits = try_join_all(tokens.iter().map(|&token| async move {
            let (decimals, deposited) = tokio::try_join!(
                facade.decimals_of(token),
                facade.collateral_balance(account, token),
            )?;
            Ok::<_, ClientError>(CollateralPosition {
                token: CollateralToken {
                    address: token,
                    decimals,
                },
                deposited,
            })
        }))
        .await
        .map_err(ClientError::into_snapshot_unavailable)?;

        let snapshot = PositionSnapshot {
            account,
            stablecoin_balance: balance,
            total_minted: info.total_minted,
            collateral_value_usd: info.collateral_value_usd,
            health_factor,
            accepted_collaterals: tokens,
            collateral_deposits,
            fetched_at: chrono::Utc::now().timestamp(),
        };

        debug!(
            account = %account,
            balance = %snapshot.stablecoin_balance,
            collateral_usd = %snapshot.collateral_value_usd,
            health_factor = %snapshot.health_factor,
            tokens = snapshot.accepted_collaterals.len(),
            "position snapshot refreshed"
        );

        Ok(snapshot)
    }
}
