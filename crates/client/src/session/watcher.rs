//! Wallet event polling and the cancellable [`Subscription`] handle.
//!
//! HTTP wallets carry no push notifications, so account and chain changes
//! are detected by polling `eth_accounts` / `eth_chainId` and diffing
//! against the last observation.

use alloy::primitives::Address;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::wallet::WalletProvider;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed account list changed. Empty means the wallet revoked access.
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle to a background listener. Cancelled by [`Subscription::unsubscribe`]
/// or on drop, so a listener never outlives its owner.
pub struct Subscription {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn `task` with a fresh cancellation token it must honour.
    pub(crate) fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(task(cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the listener and wait for it to exit.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "subscription task panicked");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// WalletWatcher
// ---------------------------------------------------------------------------

/// Polls a wallet and fans out [`WalletEvent`]s to every subscriber.
pub struct WalletWatcher {
    wallet: Arc<dyn WalletProvider>,
    interval: Duration,
    events: broadcast::Sender<WalletEvent>,
}

impl WalletWatcher {
    pub fn new(wallet: Arc<dyn WalletProvider>, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            wallet,
            interval,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    /// Start polling. The first observation is the baseline and emits
    /// nothing.
    pub fn start(&self) -> Subscription {
        let wallet = self.wallet.clone();
        let events = self.events.clone();
        let interval = self.interval;

        Subscription::spawn(move |cancel| async move {
            info!(
                wallet = wallet.label(),
                interval_ms = interval.as_millis() as u64,
                "wallet watcher started"
            );
            let mut seen = Observed::default();
            seen.poll(wallet.as_ref()).await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                for event in seen.poll(wallet.as_ref()).await {
                    debug!(?event, "wallet event");
                    // No receivers is fine; nobody is listening yet.
                    let _ = events.send(event);
                }
            }
            info!(wallet = wallet.label(), "wallet watcher stopped");
        })
    }
}

/// Last values seen from the wallet. `None` until first observed.
#[derive(Debug, Default)]
struct Observed {
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
}

impl Observed {
    async fn poll(&mut self, wallet: &dyn WalletProvider) -> Vec<WalletEvent> {
        let mut events = Vec::new();

        match wallet.accounts().await {
            Ok(accounts) => {
                if self.accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                    events.push(WalletEvent::AccountsChanged(accounts.clone()));
                }
                self.accounts = Some(accounts);
            }
            Err(e) => debug!(error = %e, "eth_accounts poll failed"),
        }

        match wallet.chain_id().await {
            Ok(chain_id) => {
                if self.chain_id.is_some_and(|prev| prev != chain_id) {
                    events.push(WalletEvent::ChainChanged(chain_id));
                }
                self.chain_id = Some(chain_id);
            }
            Err(e) => debug!(error = %e, "eth_chainId poll failed"),
        }

        events
    }
}
