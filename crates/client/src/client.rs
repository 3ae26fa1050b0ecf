//! Client composition: wallet session, contract binding, state reader and
//! orchestrator behind one handle that keeps [`AppState`] consistent.
//!
//! Every session change (connect, disconnect, account or chain switch)
//! rebinds the contracts and reloads the snapshot. Results computed for an
//! older session are discarded instead of applied.

use alloy::primitives::Address;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::config::ClientConfig;
use crate::core::orchestrator::{OperationReport, OperationTracker, TxOrchestrator};
use crate::core::state_reader::AccountStateReader;
use crate::errors::ClientError;
use crate::execution::facade::ContractFacade;
use crate::session::{
    EngineFactory, Session, SessionManager, Subscription, WalletProvider, WalletWatcher,
};
use crate::types::{Field, OperationKind, OperationStatus, PositionSnapshot};

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Delay before an awaited inclusion is flagged as still pending.
    pub pending_notice: Duration,
    /// Wallet polling interval for account and chain changes.
    pub wallet_poll: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            pending_notice: config.app.orchestrator.pending_notice(),
            wallet_poll: config.app.wallet.poll_interval(),
        }
    }
}

/// Components bound to one session.
struct Services {
    account: Address,
    reader: Arc<AccountStateReader>,
    orchestrator: Arc<TxOrchestrator>,
}

/// Which session epoch the current services were built for.
struct Binding {
    epoch: u64,
    services: Option<Arc<Services>>,
}

pub struct StableFiClient {
    sessions: Arc<SessionManager>,
    factory: Arc<dyn EngineFactory>,
    watcher: WalletWatcher,
    settings: ClientSettings,
    binding: RwLock<Binding>,
    /// Outlives every binding: in-flight accounts and status survive a rebind.
    operations: OperationTracker,
    state: RwLock<AppState>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl StableFiClient {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        factory: Arc<dyn EngineFactory>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(wallet.clone())),
            factory,
            watcher: WalletWatcher::new(wallet, settings.wallet_poll),
            settings,
            binding: RwLock::new(Binding {
                epoch: 0,
                services: None,
            }),
            operations: OperationTracker::default(),
            state: RwLock::new(AppState::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Copy of the current application state.
    pub async fn state(&self) -> AppState {
        self.state.read().await.clone()
    }

    // -----------------------------------------------------------------------
    // Background listeners
    // -----------------------------------------------------------------------

    /// Start wallet polling and follow session changes until [`Self::shutdown`].
    pub async fn start(self: &Arc<Self>) {
        let listener = self.sessions.listen(self.watcher.subscribe());
        let polling = self.watcher.start();

        let client: Weak<Self> = Arc::downgrade(self);
        let mut changes = self.sessions.subscribe();
        let resync = Subscription::spawn(move |cancel| async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let Some(client) = client.upgrade() else { break };
                        client.resync().await;
                    }
                }
            }
        });

        self.subscriptions
            .lock()
            .await
            .extend([listener, polling, resync]);
        info!("client listeners started");
    }

    pub async fn shutdown(&self) {
        let subscriptions: Vec<Subscription> = self.subscriptions.lock().await.drain(..).collect();
        for subscription in subscriptions {
            subscription.unsubscribe().await;
        }
        info!("client listeners stopped");
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Connect the wallet, bind the contracts and load the snapshot. A
    /// contract binding failure still returns the session; the state then
    /// carries the reason.
    pub async fn connect(&self) -> Result<Session, ClientError> {
        let session = match self.sessions.connect().await {
            Ok(session) => session,
            Err(e) => {
                self.state.write().await.apply_rejection(&e);
                return Err(e);
            }
        };
        self.resync().await;
        Ok(session)
    }

    pub async fn disconnect(&self) {
        self.sessions.disconnect();
        self.resync().await;
    }

    /// Bring services and state in line with the latest session. A no-op
    /// when already current.
    pub async fn resync(&self) {
        let bound = {
            let mut binding = self.binding.write().await;
            let change = self.sessions.subscribe().borrow().clone();
            if binding.epoch == change.epoch {
                return;
            }
            binding.epoch = change.epoch;
            binding.services = None;

            let mut state = self.state.write().await;
            state.set_session(change.session);

            let Some(session) = change.session else {
                debug!(epoch = change.epoch, "session cleared");
                return;
            };
            match self.bind(&session) {
                Ok(services) => {
                    let services = Arc::new(services);
                    binding.services = Some(services.clone());
                    services
                }
                Err(e) => {
                    warn!(
                        address = %session.address,
                        chain_id = session.chain_id,
                        error = %e,
                        "contracts unavailable for session"
                    );
                    state.set_contract_unavailable(&e);
                    return;
                }
            }
        };

        if let Err(e) = self.refresh_with(&bound).await {
            debug!(error = %e, "initial snapshot load failed");
        }
    }

    fn bind(&self, session: &Session) -> Result<Services, ClientError> {
        let engine = self.factory.build(self.sessions.wallet(), session)?;
        let facade = Arc::new(ContractFacade::new(engine));
        let reader = Arc::new(AccountStateReader::new(facade.clone()));
        let orchestrator = Arc::new(TxOrchestrator::with_tracker(
            facade,
            reader.clone(),
            self.settings.pending_notice,
            self.operations.clone(),
        ));
        info!(address = %session.address, chain_id = session.chain_id, "contracts bound");
        Ok(Services {
            account: session.address,
            reader,
            orchestrator,
        })
    }

    /// Services for the current session, or why there are none.
    async fn bound(&self) -> Result<Arc<Services>, ClientError> {
        if let Some(services) = &self.binding.read().await.services {
            return Ok(services.clone());
        }
        let state = self.state.read().await;
        match state.contract_error() {
            Some(reason) if state.is_connected() => Err(ClientError::ContractUnavailable {
                reason: reason.to_string(),
            }),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Whether `services` still belongs to the live session.
    async fn is_current(&self, services: &Arc<Services>) -> bool {
        self.binding
            .read()
            .await
            .services
            .as_ref()
            .is_some_and(|live| Arc::ptr_eq(live, services))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn refresh(&self) -> Result<PositionSnapshot, ClientError> {
        let services = self.bound().await?;
        self.refresh_with(&services).await
    }

    async fn refresh_with(&self, services: &Arc<Services>) -> Result<PositionSnapshot, ClientError> {
        let result = services.reader.refresh(services.account).await;
        if self.is_current(services).await {
            self.state.write().await.apply_refresh(&result);
        } else {
            debug!(account = %services.account, "discarding snapshot for a previous session");
        }
        result
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn set_field(
        &self,
        kind: OperationKind,
        field: Field,
        value: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.state.write().await.set_field(kind, field, value)
    }

    /// Whether the submit control for `kind` is enabled right now.
    pub async fn can_submit(&self, kind: OperationKind) -> bool {
        let state = self.state.read().await;
        let busy = state
            .session()
            .is_some_and(|session| self.operations.is_busy(session.address));
        state.can_submit(kind, busy)
    }

    pub async fn operation_status(&self) -> OperationStatus {
        self.operations.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<OperationStatus> {
        self.operations.subscribe()
    }

    /// Submit the current draft of `kind`. `Err` means it never left
    /// `Draft`; the report covers everything after validation.
    pub async fn submit(&self, kind: OperationKind) -> Result<OperationReport, ClientError> {
        let services = match self.bound().await {
            Ok(services) => services,
            Err(e) => {
                self.state.write().await.apply_rejection(&e);
                return Err(e);
            }
        };
        let (op, snapshot) = {
            let state = self.state.read().await;
            (state.draft(kind).clone(), state.snapshot().cloned())
        };

        let result = services
            .orchestrator
            .run(services.account, &op, snapshot.as_ref())
            .await;

        if self.is_current(&services).await {
            let mut state = self.state.write().await;
            match &result {
                Ok(report) => state.apply_report(report),
                Err(e) => state.apply_rejection(e),
            }
        } else {
            warn!(kind = kind.as_str(), "session changed while the operation ran");
        }
        result
    }
}
