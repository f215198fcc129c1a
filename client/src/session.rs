//! Wallet session: the observable session store and the controller that
//! connects, disconnects and follows wallet events.
//!
//! All session mutations go through [`SessionStore`]. Wallet events are
//! consumed by a single background task, in arrival order, under the same
//! sequencer lock the voting actions take, so an account switch can never
//! interleave with an in-flight submission.

use crate::config::ChainDescriptor;
use crate::contract::ContractReader;
use crate::error::{ClientError, Result};
use crate::role::resolve_role;
use crate::types::{Role, Session};
use crate::wallet::{WalletEvent, WalletProvider};
use async_trait::async_trait;
use chrono::Utc;
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Observable holder of the current [`Session`]
#[derive(Clone)]
pub struct SessionStore {
    sender: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Session::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.sender.borrow().clone()
    }

    /// Watch session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    /// Establish a session
    pub fn connect(&self, account: Address, chain_id: u64, role: Role) {
        self.sender.send_replace(Session {
            account: Some(account),
            chain_id: Some(chain_id),
            role,
            connected_at: Some(Utc::now()),
        });
    }

    /// Clear the session
    pub fn disconnect(&self) {
        self.sender.send_replace(Session::default());
    }

    /// Switch the active account; its role is unknown until resolved again
    pub fn set_account(&self, account: Address) {
        self.sender.send_modify(|session| {
            session.account = Some(account);
            session.role = Role::None;
            session.connected_at.get_or_insert_with(Utc::now);
        });
    }

    /// Record the resolved role
    pub fn set_role(&self, role: Role) {
        self.sender.send_modify(|session| session.role = role);
    }

    /// Record the wallet's chain
    pub fn set_chain(&self, chain_id: u64) {
        self.sender
            .send_modify(|session| session.chain_id = Some(chain_id));
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Notified when a wallet event changes the active account.
///
/// Runs on the event task, under the sequencer lock, after the new role has
/// been recorded. `None` means the wallet reported no accounts.
#[async_trait]
pub trait AccountObserver: Send + Sync {
    /// The active account is now `account`
    async fn account_changed(&self, account: Option<Address>);
}

/// Shared state the event task works on
#[derive(Clone)]
struct SessionCore {
    wallet: Option<Arc<dyn WalletProvider>>,
    reader: Arc<dyn ContractReader>,
    store: SessionStore,
    chain: ChainDescriptor,
    sequencer: Arc<Mutex<()>>,
    observer: Option<Arc<dyn AccountObserver>>,
}

/// Aborts the event task once the last manager handle is dropped
#[derive(Default)]
struct ListenerSlot {
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ListenerSlot {
    fn stop(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ListenerSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connects and disconnects the wallet and keeps the session in sync with it
#[derive(Clone)]
pub struct SessionManager {
    core: SessionCore,
    listener: Arc<ListenerSlot>,
}

impl SessionManager {
    /// Create a manager; `wallet` is `None` when no provider is injected
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        reader: Arc<dyn ContractReader>,
        store: SessionStore,
        chain: ChainDescriptor,
    ) -> Self {
        Self {
            core: SessionCore {
                wallet,
                reader,
                store,
                chain,
                sequencer: Arc::new(Mutex::new(())),
                observer: None,
            },
            listener: Arc::new(ListenerSlot::default()),
        }
    }

    /// Notify `observer` of account switches reported by the wallet
    pub fn with_account_observer(mut self, observer: Arc<dyn AccountObserver>) -> Self {
        self.core.observer = Some(observer);
        self
    }

    /// The session store
    pub fn store(&self) -> &SessionStore {
        &self.core.store
    }

    /// Copy of the current session
    pub fn session(&self) -> Session {
        self.core.store.snapshot()
    }

    /// The wallet provider, or `WalletUnavailable`
    pub fn wallet(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.core.wallet()
    }

    /// Chain the wallet must be on
    pub fn chain(&self) -> &ChainDescriptor {
        &self.core.chain
    }

    /// Serialize with wallet event handling; held for the whole of an action
    pub async fn sequence(&self) -> MutexGuard<'_, ()> {
        self.core.sequencer.lock().await
    }

    /// Make sure the wallet is on the required chain, adding it when unknown.
    ///
    /// Callers are expected to hold [`SessionManager::sequence`].
    pub async fn ensure_chain(&self) -> Result<()> {
        self.core.ensure_chain().await
    }

    /// Connect the wallet and return the active account.
    ///
    /// The session is only committed once the chain is asserted, the account
    /// granted and its role resolved; a failure leaves the previous session as
    /// it was.
    pub async fn connect(&self) -> Result<Address> {
        let wallet = self.core.wallet()?.clone();

        let account = {
            let _sequence = self.sequence().await;

            self.core.ensure_chain().await?;

            let accounts = wallet.request_accounts().await.map_err(|e| {
                error!("Wallet connection error: {}", e);
                e
            })?;
            let account = *accounts.first().ok_or(ClientError::NoAccounts)?;

            let reading = self.core.reader.read_role(account).await?;
            let role = resolve_role(account, &reading);

            self.core
                .store
                .connect(account, self.core.chain.chain_id, role);
            info!("Connected {:?} as {}", account, role);
            account
        };

        self.start_listener(wallet);
        Ok(account)
    }

    /// Clear the local session, then ask the wallet to revoke its permission.
    ///
    /// The local session is cleared even when revocation fails or no wallet
    /// is present.
    pub async fn disconnect(&self) {
        let _sequence = self.sequence().await;

        self.listener.stop();
        self.core.store.disconnect();
        info!("Disconnected locally");

        if let Ok(wallet) = self.core.wallet() {
            if let Err(e) = wallet.revoke_permissions().await {
                info!(
                    "Wallet revoke permissions not supported, disconnected locally: {}",
                    e
                );
            }
        }
    }

    /// Apply a wallet event to the session
    pub async fn handle_event(&self, event: WalletEvent) {
        self.core.handle_event(event).await
    }

    /// Whether the event task is running
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn start_listener(&self, wallet: Arc<dyn WalletProvider>) {
        let mut slot = self.listener.lock();
        if slot.as_ref().map_or(false, |handle| !handle.is_finished()) {
            debug!("Wallet event listener already running");
            return;
        }

        let mut events = wallet.subscribe();
        let core = self.core.clone();
        *slot = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => core.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Wallet event listener skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Wallet event listener stopped");
        }));
    }
}

impl SessionCore {
    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.wallet.as_ref().ok_or(ClientError::WalletUnavailable)
    }

    async fn ensure_chain(&self) -> Result<()> {
        let wallet = self.wallet()?;
        let chain_id = self.chain.chain_id;

        let current = wallet.chain_id().await.map_err(chain_error)?;
        if current == chain_id {
            debug!("Wallet already on chain {}", chain_id);
            return Ok(());
        }

        match wallet.switch_chain(chain_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                info!("Chain {} unknown to wallet, adding it", self.chain.chain_name);
                let added = match wallet.add_chain(&self.chain).await {
                    Ok(()) => wallet.switch_chain(chain_id).await,
                    Err(e) => Err(e),
                };
                added.map_err(|e| {
                    error!("Failed to add {} network: {}", self.chain.chain_name, e);
                    chain_error(e)
                })
            }
            Err(e) => {
                error!("Failed to switch network: {}", e);
                Err(chain_error(e))
            }
        }
    }

    async fn handle_event(&self, event: WalletEvent) {
        let _sequence = self.sequencer.lock().await;

        match event {
            WalletEvent::AccountsChanged(accounts) => {
                let account = accounts.first().copied();
                match account {
                    None => {
                        info!("Wallet reported no accounts, clearing session");
                        self.store.disconnect();
                    }
                    Some(account) => {
                        info!("Active account changed to {:?}", account);
                        self.store.set_account(account);
                        match self.reader.read_role(account).await {
                            Ok(reading) => self.store.set_role(resolve_role(account, &reading)),
                            Err(e) => error!("Error processing account change: {}", e),
                        }
                    }
                }
                if let Some(observer) = &self.observer {
                    observer.account_changed(account).await;
                }
            }
            WalletEvent::ChainChanged(chain_id) => {
                self.store.set_chain(chain_id);
                if chain_id != self.chain.chain_id {
                    warn!(
                        "Wallet moved to chain {}, switching back to {}",
                        chain_id, self.chain.chain_id
                    );
                    match self.ensure_chain().await {
                        Ok(()) => self.store.set_chain(self.chain.chain_id),
                        Err(e) => error!("Could not re-assert chain: {}", e),
                    }
                }
            }
        }
    }
}

/// Errors from the chain switch step surface as `ChainSwitchFailed`, except
/// when the user declined or no wallet is present.
fn chain_error(error: ClientError) -> ClientError {
    match error {
        ClientError::UserRejected | ClientError::WalletUnavailable => error,
        ClientError::ChainSwitchFailed(_) => error,
        other => ClientError::ChainSwitchFailed(other.to_string()),
    }
}
