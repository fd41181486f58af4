//! Session management
//!
//! [`SessionManager`] is the single owner of the process-wide [`SessionState`]. It
//! follows the identity store's events in arrival order, resolves tenant records for
//! each new identity, and publishes snapshots through a `watch` channel.
//!
//! All state transitions happen on a background worker task. The manager's operations
//! talk to the identity store or the tenant repository directly and then hand the
//! session-visible part of their effect to the worker, so a resolution that completes
//! after a newer identity change (or a sign-out) is discarded instead of committed.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use marquee::{SessionManager, SessionConfig, identity::InMemoryIdentityStore, tenant::InMemoryTenantRepository};
//! # async fn example() -> marquee::Result<()> {
//! let identities = Arc::new(InMemoryIdentityStore::new());
//! let tenants = Arc::new(InMemoryTenantRepository::new());
//! let session = SessionManager::start(identities, tenants, SessionConfig::default());
//!
//! session.sign_up("ana@example.com", "hunter22", "Acme Signage").await?;
//! session.wait_for_tenant_setup().await;
//! session.sign_in("ana@example.com", "hunter22").await?;
//!
//! let state = session.settled().await?;
//! assert!(state.capabilities().can_manage_users());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use handle_trait::Handle;
use tokio::{
    sync::{Mutex, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    Clock, Result, SessionConfig, SystemClock,
    capability::CapabilitySet,
    identity::IdentityStore,
    resolver::TenantResolver,
    tenant::{
        Profile, ProfileUpdate, RepositoryTenantSetup, TenantRepository, TenantSetup,
        TenantSetupRequest,
    },
};

pub mod errors;
pub mod state;
mod worker;

pub use errors::SessionError;
pub use state::{SessionPhase, SessionState};
use worker::{SessionCommand, SessionWorker};

struct SessionInner {
    identity_store: Arc<dyn IdentityStore>,
    repository: Arc<dyn TenantRepository>,
    tenant_setup: Arc<dyn TenantSetup>,
    config: SessionConfig,
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    /// Tenant setups dispatched by `sign_up` that were still running when last checked
    setup_tasks: Mutex<Vec<JoinHandle<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the process-wide session.
///
/// Cheap to clone; all clones share one worker and one state.
#[derive(Clone, Handle)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

/// Builder for a [`SessionManager`] with non-default collaborators.
pub struct SessionManagerBuilder {
    identity_store: Arc<dyn IdentityStore>,
    repository: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
    tenant_setup: Option<Arc<dyn TenantSetup>>,
    config: SessionConfig,
}

impl SessionManagerBuilder {
    /// Time source for slugs and record timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mechanism used for best-effort tenant setup after sign-up.
    ///
    /// Defaults to a [`RepositoryTenantSetup`] over the session's repository.
    pub fn tenant_setup(mut self, tenant_setup: Arc<dyn TenantSetup>) -> Self {
        self.tenant_setup = Some(tenant_setup);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the session worker and return its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SessionManager {
        let tenant_setup = self.tenant_setup.unwrap_or_else(|| {
            Arc::new(RepositoryTenantSetup::new(
                self.repository.clone(),
                self.clock.clone(),
            ))
        });
        let resolver = TenantResolver::new(self.repository.clone(), self.clock, &self.config);

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(SessionState::initializing());
        let worker = SessionWorker::start(
            self.identity_store.clone(),
            resolver,
            command_rx,
            state_tx,
        );

        SessionManager {
            inner: Arc::new(SessionInner {
                identity_store: self.identity_store,
                repository: self.repository,
                tenant_setup,
                config: self.config,
                commands: command_tx,
                state: state_rx,
                setup_tasks: Mutex::new(Vec::new()),
                worker: Mutex::new(Some(worker)),
            }),
        }
    }
}

impl SessionManager {
    pub fn builder(
        identity_store: Arc<dyn IdentityStore>,
        repository: Arc<dyn TenantRepository>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            identity_store,
            repository,
            clock: Arc::new(SystemClock),
            tenant_setup: None,
            config: SessionConfig::default(),
        }
    }

    /// Start a session manager with the system clock and repository-backed tenant setup.
    pub fn start(
        identity_store: Arc<dyn IdentityStore>,
        repository: Arc<dyn TenantRepository>,
        config: SessionConfig,
    ) -> Self {
        Self::builder(identity_store, repository)
            .config(config)
            .start()
    }

    /// Sign in with email and password.
    ///
    /// Session state is not touched here; the identity store's sign-in event drives
    /// resolution. Identity errors are returned unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let identity = self.inner.identity_store.sign_in(email, password).await?;
        debug!(identity_id = %identity.id, "Signed in");
        Ok(())
    }

    /// Register a new account and dispatch tenant setup for it.
    ///
    /// Setup runs in the background and its failure is only logged: an identity
    /// without a profile is repaired on its first sign-in. Only identity store errors
    /// fail this call.
    pub async fn sign_up(&self, email: &str, password: &str, company_name: &str) -> Result<()> {
        let identity = self.inner.identity_store.sign_up(email, password).await?;
        info!(identity_id = %identity.id, "Account created");

        if !self.inner.config.setup_on_sign_up {
            return Ok(());
        }

        let tenant_setup = self.inner.tenant_setup.clone();
        let request = TenantSetupRequest {
            identity,
            company_name: company_name.to_string(),
        };
        let setup = tokio::spawn(async move {
            let identity_id = request.identity.id.clone();
            match tenant_setup.setup_tenant(request).await {
                Ok((company, profile)) => info!(
                    %identity_id,
                    company_id = %company.id,
                    role = %profile.role,
                    "Tenant setup complete"
                ),
                Err(e) => warn!(
                    %identity_id,
                    error = %e,
                    "Tenant setup failed; profile will be repaired on first sign-in"
                ),
            }
        });
        let mut setups = self.inner.setup_tasks.lock().await;
        setups.retain(|setup| !setup.is_finished());
        setups.push(setup);
        Ok(())
    }

    /// Sign out of the identity store and drop tenant data from the session.
    ///
    /// Any resolution still in flight is discarded when it completes.
    pub async fn sign_out(&self) -> Result<()> {
        self.inner.identity_store.sign_out().await?;
        let (response, done) = oneshot::channel();
        self.send(SessionCommand::ClearTenant { response }).await?;
        done.await.map_err(|_| SessionError::WorkerStopped)?;
        Ok(())
    }

    /// Apply a partial update to the signed-in account's profile.
    ///
    /// On success the change is merged into the session without re-fetching.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        let identity = self
            .inner
            .state
            .borrow()
            .identity
            .clone()
            .ok_or(SessionError::NoActiveIdentity)?;

        let profile = self
            .inner
            .repository
            .update_profile(&identity.id, update.clone())
            .await?;

        let (response, merged) = oneshot::channel();
        self.send(SessionCommand::MergeProfile {
            identity_id: identity.id,
            update,
            response,
        })
        .await?;
        // Not merged means the session moved to another identity meanwhile.
        let _ = merged.await;
        Ok(profile)
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every session state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.clone()
    }

    /// Capabilities of the current profile, derived from its role.
    pub fn capabilities(&self) -> CapabilitySet {
        self.snapshot().capabilities()
    }

    /// Wait until queued identity events are applied and no resolution is in flight.
    pub async fn settled(&self) -> Result<SessionState> {
        let (response, state) = oneshot::channel();
        self.send(SessionCommand::Settle { response }).await?;
        Ok(state.await.map_err(|_| SessionError::WorkerStopped)?)
    }

    /// Wait for every tenant setup dispatched by [`sign_up`](Self::sign_up) so far.
    pub async fn wait_for_tenant_setup(&self) {
        let setups = std::mem::take(&mut *self.inner.setup_tasks.lock().await);
        for setup in setups {
            if let Err(e) = setup.await {
                warn!("Tenant setup task ended abnormally: {e}");
            }
        }
    }

    /// Number of dispatched tenant setups that are still running.
    pub async fn pending_tenant_setups(&self) -> usize {
        let mut setups = self.inner.setup_tasks.lock().await;
        setups.retain(|setup| !setup.is_finished());
        setups.len()
    }

    /// Stop the session worker and unsubscribe from the identity store.
    ///
    /// Later calls that need the worker fail with [`SessionError::WorkerStopped`].
    pub async fn shutdown(&self) -> Result<()> {
        let Some(worker) = self.inner.worker.lock().await.take() else {
            return Ok(());
        };
        // A worker that already stopped has dropped its receiver.
        let _ = self.inner.commands.send(SessionCommand::Shutdown).await;
        if let Err(e) = worker.await {
            warn!("Session worker ended abnormally: {e}");
        }
        Ok(())
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .await
            .map_err(|_| SessionError::WorkerStopped.into())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.inner.state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
