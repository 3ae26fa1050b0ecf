//! Scriptable wallet for session and client tests.

use alloy::primitives::{address, Address};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::errors::ClientError;

use super::wallet::WalletProvider;

pub const ALICE: Address = address!("00000000000000000000000000000000000000a1");
pub const BOB: Address = address!("00000000000000000000000000000000000000b0");

struct WalletState {
    accounts: Vec<Address>,
    chain_id: u64,
    reject: bool,
    unreachable: bool,
}

pub struct MockWallet {
    state: Mutex<WalletState>,
    provider: DynProvider,
    requests: AtomicUsize,
}

impl MockWallet {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        // Never dialled: engines in tests come from the mock chain.
        let url = "http://127.0.0.1:1".parse().unwrap();
        Self {
            state: Mutex::new(WalletState {
                accounts,
                chain_id,
                reject: false,
                unreachable: false,
            }),
            provider: ProviderBuilder::new().connect_http(url).erased(),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(self) -> Self {
        self.state.lock().unwrap().reject = true;
        self
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn reachable(&self) -> Result<std::sync::MutexGuard<'_, WalletState>, ClientError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(ClientError::ProviderUnavailable {
                reason: "no wallet at endpoint".into(),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn label(&self) -> &'static str {
        "mock"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let state = self.reachable()?;
        if state.reject {
            return Err(ClientError::UserRejected {
                reason: "User rejected the request.".into(),
            });
        }
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.reachable()?.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.reachable()?.chain_id)
    }

    fn transaction_provider(&self) -> DynProvider {
        self.provider.clone()
    }
}
