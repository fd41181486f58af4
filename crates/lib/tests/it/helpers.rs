use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use marquee::{
    Company, FixedClock, Identity, Profile, Result, Role, SessionConfig, SessionManager,
    SessionState, TenantError, TenantRepository,
    identity::{IdentityStore, InMemoryIdentityStore},
    tenant::{
        InMemoryTenantRepository, NewCompany, NewProfile, ProfileUpdate, TenantSetup,
        TenantSetupRequest,
    },
};
use tokio::sync::watch;

/// 2024-01-01T00:00:00Z
pub const START_MILLIS: u64 = 1_704_067_200_000;

pub const PASSWORD: &str = "correct-horse";

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

// ==========================
// FACTORIES
// ==========================

pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::ticking(START_MILLIS))
}

pub fn identity_store() -> Arc<InMemoryIdentityStore> {
    Arc::new(InMemoryIdentityStore::with_clock(test_clock()))
}

pub fn tenant_repository() -> Arc<InMemoryTenantRepository> {
    Arc::new(InMemoryTenantRepository::with_clock(test_clock()))
}

/// Starts a session over the given collaborators with a ticking test clock.
pub fn start_session(
    identities: Arc<InMemoryIdentityStore>,
    repository: Arc<dyn TenantRepository>,
) -> SessionManager {
    SessionManager::builder(identities, repository)
        .clock(test_clock())
        .config(SessionConfig::default())
        .start()
}

/// Registers an account directly with the store, leaving it without tenant records.
pub async fn register(store: &InMemoryIdentityStore, email: &str) -> Identity {
    store
        .sign_up(email, PASSWORD)
        .await
        .expect("Failed to register account")
}

/// Creates a company and a profile with `role` for `identity`.
pub async fn seed_tenant(
    repository: &dyn TenantRepository,
    identity: &Identity,
    company_name: &str,
    slug: &str,
    role: Role,
) -> (Company, Profile) {
    let company = repository
        .insert_company(NewCompany::trial(company_name, slug))
        .await
        .expect("Failed to insert company");
    let mut fields = NewProfile::admin(&identity.id, &identity.email, &company.id);
    fields.role = role;
    let profile = repository
        .insert_profile(fields)
        .await
        .expect("Failed to insert profile");
    (company, profile)
}

/// Waits for the session to settle, failing the test if it takes longer than [`WAIT`].
pub async fn settle(session: &SessionManager) -> SessionState {
    tokio::time::timeout(WAIT, session.settled())
        .await
        .expect("Session did not settle in time")
        .expect("Session worker stopped")
}

/// Polls `condition` until it holds, failing the test after [`WAIT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}

// ==========================
// FAULT-INJECTING DOUBLES
// ==========================

fn unavailable(reason: &str) -> marquee::Error {
    TenantError::Unavailable {
        reason: reason.to_string(),
    }
    .into()
}

/// Tenant repository that counts calls and can fail or block on demand.
///
/// Delegates to an [`InMemoryTenantRepository`].
pub struct ScriptedRepository {
    pub inner: Arc<InMemoryTenantRepository>,
    profile_lookups: AtomicUsize,
    company_lookups: AtomicUsize,
    company_inserts: AtomicUsize,
    profile_inserts: AtomicUsize,
    profile_updates: AtomicUsize,
    fail_profile_lookup: AtomicBool,
    fail_company_lookup: AtomicBool,
    fail_company_insert: AtomicBool,
    /// Profile lookups for this id panic, ahead of the gate
    panicking_profile: Mutex<Option<String>>,
    /// Profile lookups wait while this is `false`
    lookup_gate: watch::Sender<bool>,
}

impl ScriptedRepository {
    pub fn new() -> Arc<Self> {
        Self::wrapping(tenant_repository())
    }

    pub fn wrapping(inner: Arc<InMemoryTenantRepository>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            profile_lookups: AtomicUsize::new(0),
            company_lookups: AtomicUsize::new(0),
            company_inserts: AtomicUsize::new(0),
            profile_inserts: AtomicUsize::new(0),
            profile_updates: AtomicUsize::new(0),
            fail_profile_lookup: AtomicBool::new(false),
            fail_company_lookup: AtomicBool::new(false),
            fail_company_insert: AtomicBool::new(false),
            panicking_profile: Mutex::new(None),
            lookup_gate: watch::channel(true).0,
        })
    }

    pub fn profile_lookups(&self) -> usize {
        self.profile_lookups.load(Ordering::SeqCst)
    }

    pub fn company_lookups(&self) -> usize {
        self.company_lookups.load(Ordering::SeqCst)
    }

    pub fn company_inserts(&self) -> usize {
        self.company_inserts.load(Ordering::SeqCst)
    }

    pub fn profile_inserts(&self) -> usize {
        self.profile_inserts.load(Ordering::SeqCst)
    }

    pub fn profile_updates(&self) -> usize {
        self.profile_updates.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn calls(&self) -> usize {
        self.profile_lookups()
            + self.company_lookups()
            + self.company_inserts()
            + self.profile_inserts()
            + self.profile_updates()
    }

    pub fn fail_profile_lookup(&self, fail: bool) {
        self.fail_profile_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_company_lookup(&self, fail: bool) {
        self.fail_company_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_company_insert(&self, fail: bool) {
        self.fail_company_insert.store(fail, Ordering::SeqCst);
    }

    /// Make profile lookups for `id` panic, as a buggy backend would.
    pub fn panic_on_profile_lookup(&self, id: &str) {
        *self.panicking_profile.lock().unwrap() = Some(id.to_string());
    }

    /// Block profile lookups until [`Self::open_gate`].
    pub fn close_gate(&self) {
        self.lookup_gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.lookup_gate.send_replace(true);
    }
}

#[async_trait]
impl TenantRepository for ScriptedRepository {
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>> {
        self.profile_lookups.fetch_add(1, Ordering::SeqCst);
        if self.panicking_profile.lock().unwrap().as_deref() == Some(id) {
            panic!("repository bug while loading profile {id}");
        }
        let mut gate = self.lookup_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        if self.fail_profile_lookup.load(Ordering::SeqCst) {
            return Err(unavailable("profile lookup failed"));
        }
        self.inner.get_profile_by_id(id).await
    }

    async fn get_company_by_id(&self, id: &str) -> Result<Option<Company>> {
        self.company_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_company_lookup.load(Ordering::SeqCst) {
            return Err(unavailable("company lookup failed"));
        }
        self.inner.get_company_by_id(id).await
    }

    async fn insert_company(&self, fields: NewCompany) -> Result<Company> {
        self.company_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_company_insert.load(Ordering::SeqCst) {
            return Err(unavailable("company insert failed"));
        }
        self.inner.insert_company(fields).await
    }

    async fn insert_profile(&self, fields: NewProfile) -> Result<Profile> {
        self.profile_inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_profile(fields).await
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile> {
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_profile(id, update).await
    }
}

/// Tenant setup whose backing service can never be reached.
#[derive(Default)]
pub struct UnreachableSetup {
    calls: AtomicUsize,
}

impl UnreachableSetup {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantSetup for UnreachableSetup {
    async fn setup_tenant(&self, _request: TenantSetupRequest) -> Result<(Company, Profile)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable("tenant setup service unreachable"))
    }
}

/// Tenant setup that holds every request until [`Self::open`], then delegates.
pub struct GatedSetup {
    inner: Arc<dyn TenantSetup>,
    gate: watch::Sender<bool>,
    completed: AtomicUsize,
}

impl GatedSetup {
    pub fn new(inner: Arc<dyn TenantSetup>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: watch::channel(false).0,
            completed: AtomicUsize::new(0),
        })
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// Setups that have returned, successfully or not.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantSetup for GatedSetup {
    async fn setup_tenant(&self, request: TenantSetupRequest) -> Result<(Company, Profile)> {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        let result = self.inner.setup_tenant(request).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
