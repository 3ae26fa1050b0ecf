use alloy::primitives::Address;
use std::sync::Arc;
use tracing::warn;

use crate::config::ChainConfig;
use crate::errors::ClientError;
use crate::execution::engine::ProtocolEngine;
use crate::execution::engine_client::AlloyEngine;

use super::wallet::WalletProvider;
use super::Session;

/// Binds a connected session to the protocol contracts.
///
/// Failure leaves the session connected but without a facade; the client
/// reports `ContractUnavailable` until the next session change.
pub trait EngineFactory: Send + Sync {
    fn build(
        &self,
        wallet: &dyn WalletProvider,
        session: &Session,
    ) -> Result<Arc<dyn ProtocolEngine>, ClientError>;
}

pub struct AlloyEngineFactory {
    engine: Address,
    stablecoin: Address,
    chain_id: u64,
}

impl AlloyEngineFactory {
    pub fn new(engine: Address, stablecoin: Address, chain_id: u64) -> Self {
        Self {
            engine,
            stablecoin,
            chain_id,
        }
    }

    pub fn from_config(chain: &ChainConfig) -> Result<Self, ClientError> {
        Ok(Self::new(
            chain.engine_address()?,
            chain.stablecoin_address()?,
            chain.chain_id,
        ))
    }

    /// Checks shared by every engine binding.
    fn check(&self, session: &Session) -> Result<(), ClientError> {
        if self.engine.is_zero() {
            return Err(ClientError::ContractUnavailable {
                reason: "engine address is not configured".into(),
            });
        }
        if session.chain_id != self.chain_id {
            warn!(
                wallet_chain = session.chain_id,
                expected_chain = self.chain_id,
                "wallet is on a different chain"
            );
            return Err(ClientError::ContractUnavailable {
                reason: format!(
                    "wallet is on chain {}, contracts are deployed on chain {}",
                    session.chain_id, self.chain_id
                ),
            });
        }
        Ok(())
    }
}

impl EngineFactory for AlloyEngineFactory {
    fn build(
        &self,
        wallet: &dyn WalletProvider,
        session: &Session,
    ) -> Result<Arc<dyn ProtocolEngine>, ClientError> {
        self.check(session)?;
        Ok(Arc::new(AlloyEngine::new(
            wallet.transaction_provider(),
            self.engine,
            self.stablecoin,
            session.address,
        )))
    }
}
