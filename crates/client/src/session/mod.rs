//! Wallet session: who is connected, on which chain, and how changes reach
//! the rest of the client.

pub mod factory;
pub mod wallet;
pub mod watcher;

#[cfg(test)]
pub(crate) mod mock;

pub use factory::{AlloyEngineFactory, EngineFactory};
pub use wallet::{LocalKeyWallet, RpcWallet, WalletProvider};
pub use watcher::{Subscription, WalletEvent, WalletWatcher};

use alloy::primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::errors::ClientError;

/// The connected account. Its absence is the disconnected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub address: Address,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Connected,
    Disconnected,
    AccountChanged,
    ChainChanged,
}

/// Published on every session transition. `epoch` increases by one per
/// change so dependants can tell whether their derived state is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub epoch: u64,
    pub session: Option<Session>,
    pub reason: ChangeReason,
}

pub struct SessionManager {
    wallet: Arc<dyn WalletProvider>,
    state: watch::Sender<SessionChange>,
}

impl SessionManager {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        let (state, _) = watch::channel(SessionChange {
            epoch: 0,
            session: None,
            reason: ChangeReason::Disconnected,
        });
        Self { wallet, state }
    }

    pub fn wallet(&self) -> &dyn WalletProvider {
        self.wallet.as_ref()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionChange> {
        self.state.subscribe()
    }

    /// Request account access and open a session on the first account.
    /// On failure the previous session, if any, is left untouched.
    pub async fn connect(&self) -> Result<Session, ClientError> {
        let accounts = self.wallet.request_accounts().await.map_err(|e| {
            warn!(wallet = self.wallet.label(), error = %e, "account request failed");
            e
        })?;
        let Some(&address) = accounts.first() else {
            return Err(ClientError::ProviderUnavailable {
                reason: "wallet exposed no accounts".into(),
            });
        };
        let chain_id = self.wallet.chain_id().await?;

        let session = Session { address, chain_id };
        self.publish(Some(session), ChangeReason::Connected);
        info!(address = %address, chain_id, "wallet connected");
        Ok(session)
    }

    /// Forget the session locally. Nothing is sent to the wallet.
    pub fn disconnect(&self) {
        if self.current().is_some() {
            self.publish(None, ChangeReason::Disconnected);
            info!("wallet disconnected");
        }
    }

    /// Re-derive the session from a wallet event. Events while disconnected
    /// are ignored; connecting is always explicit.
    pub fn handle_event(&self, event: &WalletEvent) {
        let Some(current) = self.current() else {
            debug!(?event, "wallet event ignored while disconnected");
            return;
        };

        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("wallet revoked account access");
                    self.publish(None, ChangeReason::Disconnected);
                }
                Some(&address) if address != current.address => {
                    info!(from = %current.address, to = %address, "wallet account changed");
                    self.publish(
                        Some(Session {
                            address,
                            ..current
                        }),
                        ChangeReason::AccountChanged,
                    );
                }
                Some(_) => {}
            },
            WalletEvent::ChainChanged(chain_id) if *chain_id != current.chain_id => {
                info!(from = current.chain_id, to = chain_id, "wallet chain changed");
                self.publish(
                    Some(Session {
                        chain_id: *chain_id,
                        ..current
                    }),
                    ChangeReason::ChainChanged,
                );
            }
            WalletEvent::ChainChanged(_) => {}
        }
    }

    /// Apply every event from `events` until unsubscribed.
    pub fn listen(self: &Arc<Self>, mut events: broadcast::Receiver<WalletEvent>) -> Subscription {
        let manager = Arc::clone(self);
        Subscription::spawn(move |cancel| async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => manager.handle_event(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "session listener lagged behind wallet events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    fn publish(&self, session: Option<Session>, reason: ChangeReason) {
        self.state.send_modify(|change| {
            change.epoch += 1;
            change.session = session;
            change.reason = reason;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use super::mock::{MockWallet, ALICE, BOB};
    use std::time::Duration;

    fn manager(wallet: MockWallet) -> (Arc<MockWallet>, Arc<SessionManager>) {
        let wallet = Arc::new(wallet);
        let manager = Arc::new(SessionManager::new(wallet.clone()));
        (wallet, manager)
    }

    #[tokio::test]
    async fn connect_opens_session_on_first_account() {
        let (_, sessions) = manager(MockWallet::new(vec![ALICE, BOB], 1));
        let session = sessions.connect().await.unwrap();
        assert_eq!(session, Session { address: ALICE, chain_id: 1 });
        assert_eq!(sessions.current(), Some(session));
        assert_eq!(sessions.epoch(), 1);
        assert_eq!(sessions.subscribe().borrow().reason, ChangeReason::Connected);
    }

    #[tokio::test]
    async fn declined_connect_leaves_no_session() {
        let (_, sessions) = manager(MockWallet::new(vec![ALICE], 1).rejecting());
        let err = sessions.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert_eq!(sessions.current(), None);
        assert_eq!(sessions.epoch(), 0);
    }

    #[tokio::test]
    async fn missing_wallet_is_provider_unavailable() {
        let (wallet, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        wallet.set_unreachable(true);
        let err = sessions.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);

        let (_, sessions) = manager(MockWallet::new(vec![], 1));
        let err = sessions.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn disconnect_is_local_and_idempotent() {
        let (wallet, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        sessions.connect().await.unwrap();
        sessions.disconnect();
        sessions.disconnect();
        assert_eq!(sessions.current(), None);
        assert_eq!(sessions.epoch(), 2);
        assert_eq!(wallet.request_count(), 1);
    }

    #[tokio::test]
    async fn empty_account_list_disconnects() {
        let (_, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        sessions.connect().await.unwrap();
        sessions.handle_event(&WalletEvent::AccountsChanged(vec![]));
        assert_eq!(sessions.current(), None);
        assert_eq!(sessions.subscribe().borrow().reason, ChangeReason::Disconnected);
    }

    #[tokio::test]
    async fn account_and_chain_changes_rederive_session() {
        let (_, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        sessions.connect().await.unwrap();

        sessions.handle_event(&WalletEvent::AccountsChanged(vec![BOB]));
        assert_eq!(sessions.current().unwrap().address, BOB);

        sessions.handle_event(&WalletEvent::ChainChanged(5));
        let change = sessions.subscribe().borrow().clone();
        assert_eq!(change.reason, ChangeReason::ChainChanged);
        assert_eq!(change.session, Some(Session { address: BOB, chain_id: 5 }));
        assert_eq!(change.epoch, 3);

        // Repeats of the current values are not changes.
        sessions.handle_event(&WalletEvent::AccountsChanged(vec![BOB, ALICE]));
        sessions.handle_event(&WalletEvent::ChainChanged(5));
        assert_eq!(sessions.epoch(), 3);
    }

    #[tokio::test]
    async fn events_while_disconnected_do_not_connect() {
        let (_, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        sessions.handle_event(&WalletEvent::AccountsChanged(vec![BOB]));
        assert_eq!(sessions.current(), None);
        assert_eq!(sessions.epoch(), 0);
    }

    #[tokio::test]
    async fn listener_follows_watcher() {
        let (wallet, sessions) = manager(MockWallet::new(vec![ALICE], 1));
        sessions.connect().await.unwrap();

        let watcher = WalletWatcher::new(wallet.clone(), Duration::from_millis(5));
        let listener = sessions.listen(watcher.subscribe());
        let polling = watcher.start();
        let mut changes = sessions.subscribe();

        tokio::time::sleep(Duration::from_millis(20)).await;
        wallet.set_accounts(vec![]);

        tokio::time::timeout(Duration::from_secs(2), changes.wait_for(|c| c.session.is_none()))
            .await
            .expect("disconnect within timeout")
            .unwrap();

        polling.unsubscribe().await;
        listener.unsubscribe().await;
    }
}
