//! Background session worker.
//!
//! The worker is the only writer of [`SessionState`]. It owns the identity
//! subscription, runs resolutions as tasks, and commits their results only if no newer
//! identity change has arrived in the meantime. Every state change is a single
//! `watch` publish, so observers never see two resolutions interleaved.

use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{self, JoinError, JoinSet},
};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{SessionPhase, SessionState};
use crate::{
    Identity, IdentityEvent, IdentityStore, Result,
    identity::IdentitySubscription,
    resolver::{Resolution, TenantResolver},
    tenant::ProfileUpdate,
};

/// Commands the [`SessionManager`](super::SessionManager) sends to its worker.
pub(crate) enum SessionCommand {
    /// Drop tenant data and invalidate any in-flight resolution (sign-out)
    ClearTenant { response: oneshot::Sender<()> },
    /// Merge a successful profile update into the session
    MergeProfile {
        identity_id: String,
        update: ProfileUpdate,
        response: oneshot::Sender<bool>,
    },
    /// Respond once queued identity events are applied and nothing is resolving
    Settle {
        response: oneshot::Sender<SessionState>,
    },
    /// Stop the worker
    Shutdown,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearTenant { .. } => write!(f, "ClearTenant"),
            Self::MergeProfile { identity_id, .. } => f
                .debug_struct("MergeProfile")
                .field("identity_id", identity_id)
                .finish(),
            Self::Settle { .. } => write!(f, "Settle"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Result of a task the worker spawned.
enum Outcome {
    CurrentSession {
        result: Result<Option<Identity>>,
    },
    Resolved {
        identity: Identity,
        result: Result<Resolution>,
    },
}

pub(crate) struct SessionWorker {
    identity_store: Arc<dyn IdentityStore>,
    resolver: TenantResolver,
    subscription: IdentitySubscription,
    commands: mpsc::Receiver<SessionCommand>,
    state: watch::Sender<SessionState>,

    /// Bumped on every identity change; outcomes from older generations are discarded
    generation: u64,
    /// Whether the current generation still has a task outstanding
    pending: bool,
    tasks: JoinSet<Outcome>,
    /// Generation each outstanding task was spawned for
    task_generations: HashMap<task::Id, u64>,
    settle_waiters: Vec<oneshot::Sender<SessionState>>,
}

impl SessionWorker {
    /// Spawn the worker on the current tokio runtime.
    pub(crate) fn start(
        identity_store: Arc<dyn IdentityStore>,
        resolver: TenantResolver,
        commands: mpsc::Receiver<SessionCommand>,
        state: watch::Sender<SessionState>,
    ) -> tokio::task::JoinHandle<()> {
        // Subscribe before asking for the current session so no change is missed.
        let subscription = identity_store.subscribe();
        let worker = Self {
            identity_store,
            resolver,
            subscription,
            commands,
            state,
            generation: 0,
            pending: false,
            tasks: JoinSet::new(),
            task_generations: HashMap::new(),
            settle_waiters: Vec::new(),
        };
        tokio::spawn(worker.run())
    }

    async fn run(mut self) {
        async move {
            info!("Starting session worker");
            self.request_current_session();

            loop {
                tokio::select! {
                    biased;

                    command = self.commands.recv() => match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    },

                    Some(event) = self.subscription.recv() => {
                        self.handle_identity_event(event);
                    }

                    Some(joined) = self.tasks.join_next_with_id() => {
                        self.handle_outcome(joined);
                    }
                }
            }

            info!("Session worker shutting down");
        }
        .instrument(info_span!("session_worker"))
        .await
    }

    fn request_current_session(&mut self) {
        let generation = self.begin_generation();
        let store = self.identity_store.clone();
        self.spawn_task(generation, async move {
            Outcome::CurrentSession {
                result: store.current_session().await,
            }
        });
    }

    fn spawn_task(
        &mut self,
        generation: u64,
        task: impl Future<Output = Outcome> + Send + 'static,
    ) {
        let handle = self.tasks.spawn(task);
        self.task_generations.insert(handle.id(), generation);
    }

    fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    /// Invalidate whatever is in flight without starting anything new.
    fn supersede(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::ClearTenant { response } => {
                // The store queues its sign-out event before returning; apply it first.
                self.drain_identity_events();
                self.supersede();
                let identity = self.state.borrow().identity.clone();
                let next = match identity {
                    Some(identity) => SessionState::authenticated(identity, None, None),
                    None => SessionState::anonymous(),
                };
                self.state.send_replace(next);
                debug!("Tenant data cleared");
                self.notify_settled();
                let _ = response.send(());
            }

            SessionCommand::MergeProfile {
                identity_id,
                update,
                response,
            } => {
                let merged = self.state.send_if_modified(|state| {
                    let same_identity = state
                        .identity
                        .as_ref()
                        .is_some_and(|identity| identity.id == identity_id);
                    match state.profile.as_mut() {
                        Some(profile) if same_identity => {
                            update.apply_to(profile);
                            true
                        }
                        _ => false,
                    }
                });
                if !merged {
                    debug!(%identity_id, "Profile update not merged, session moved on");
                }
                let _ = response.send(merged);
            }

            SessionCommand::Settle { response } => {
                self.drain_identity_events();
                if self.pending {
                    self.settle_waiters.push(response);
                } else {
                    let _ = response.send(self.state.borrow().clone());
                }
            }

            SessionCommand::Shutdown => {}
        }
    }

    fn drain_identity_events(&mut self) {
        while let Some(event) = self.subscription.try_recv() {
            self.handle_identity_event(event);
        }
    }

    fn handle_identity_event(&mut self, event: IdentityEvent) {
        debug!(kind = ?event.kind, "Identity change received");
        let Some(identity) = event.identity else {
            self.supersede();
            self.state.send_replace(SessionState::anonymous());
            self.notify_settled();
            return;
        };

        if self.is_current_identity(&identity) {
            // Same account (token refresh, profile edit upstream): keep resolved data.
            self.state.send_if_modified(|state| {
                if state.identity.as_ref() == Some(&identity) {
                    false
                } else {
                    state.identity = Some(identity);
                    true
                }
            });
            return;
        }

        self.begin_resolution(identity);
    }

    /// True if `identity` is being resolved, or was resolved without degradation.
    fn is_current_identity(&self, identity: &Identity) -> bool {
        let state = self.state.borrow();
        let same = state
            .identity
            .as_ref()
            .is_some_and(|current| current.id == identity.id);
        let settled = state.phase == SessionPhase::Authenticated && !state.is_degraded();
        same && (self.pending || settled)
    }

    fn begin_resolution(&mut self, identity: Identity) {
        let generation = self.begin_generation();
        info!(identity_id = %identity.id, generation, "Resolving tenant");
        self.state
            .send_replace(SessionState::resolving(identity.clone()));

        let resolver = self.resolver.clone();
        self.spawn_task(generation, async move {
            let result = resolver.resolve(&identity).await;
            Outcome::Resolved { identity, result }
        });
    }

    fn handle_outcome(&mut self, joined: std::result::Result<(task::Id, Outcome), JoinError>) {
        let (generation, outcome) = match joined {
            Ok((id, outcome)) => (self.task_generations.remove(&id), outcome),
            Err(e) => {
                let generation = self.task_generations.remove(&e.id());
                error!(generation, "Session task failed: {e}");
                if self.pending && generation == Some(self.generation) {
                    self.pending = false;
                    self.state.send_modify(|state| {
                        state.loading = false;
                        state.phase = if state.identity.is_some() {
                            SessionPhase::Authenticated
                        } else {
                            SessionPhase::Anonymous
                        };
                    });
                    self.notify_settled();
                }
                return;
            }
        };
        let Some(generation) = generation else {
            return;
        };

        match outcome {
            Outcome::CurrentSession { result } => {
                if generation != self.generation {
                    debug!(generation, "Discarding superseded session lookup");
                    return;
                }
                self.pending = false;
                match result {
                    Ok(Some(identity)) => self.begin_resolution(identity),
                    Ok(None) => {
                        self.state.send_replace(SessionState::anonymous());
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read current session");
                        self.state.send_replace(SessionState::anonymous());
                    }
                }
            }

            Outcome::Resolved { identity, result } => {
                if generation != self.generation {
                    debug!(
                        identity_id = %identity.id,
                        generation,
                        "Discarding superseded resolution"
                    );
                    return;
                }
                self.pending = false;
                let next = match result {
                    Ok(resolution) => {
                        if resolution.is_degraded() {
                            warn!(identity_id = %identity.id, "Session ready without company");
                        } else {
                            info!(
                                identity_id = %identity.id,
                                role = %resolution.profile.role,
                                repaired = resolution.repaired,
                                "Session ready"
                            );
                        }
                        SessionState::authenticated(
                            identity,
                            Some(resolution.profile),
                            resolution.company,
                        )
                    }
                    Err(e) => {
                        error!(
                            identity_id = %identity.id,
                            error = %e,
                            "Tenant resolution failed, session ready without tenant data"
                        );
                        SessionState::authenticated(identity, None, None)
                    }
                };
                self.state.send_replace(next);
            }
        }

        self.notify_settled();
    }

    fn notify_settled(&mut self) {
        if self.pending {
            return;
        }
        let snapshot = self.state.borrow().clone();
        for waiter in self.settle_waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }
}
