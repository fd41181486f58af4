//! In-memory identity store
//!
//! A self-contained [`IdentityStore`] used by the CLI and the test suite. Accounts are
//! keyed by normalized email and can be persisted to a JSON file; the signed-in session
//! lives only in memory.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    Identity, IdentityError, IdentityEvent, IdentityEventKind, IdentityStore,
    IdentitySubscription, crypto,
};
use crate::{Clock, Result, SystemClock, constants::MIN_PASSWORD_LEN};

/// The current persistence file format version.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// A registered account.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Account {
    identity: Identity,
    /// Argon2id hash in PHC format
    password_hash: String,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct SerializableStore {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    accounts: HashMap<String, Account>,
}

/// Signed-in session plus the live subscribers.
///
/// Kept under one lock so that changing the session and notifying subscribers is a
/// single step and every subscriber sees changes in the same order.
#[derive(Default)]
struct SessionSlot {
    current: Option<Identity>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<IdentityEvent>>,
    next_subscriber: u64,
}

impl SessionSlot {
    fn publish(&mut self, event: IdentityEvent) {
        // Subscribers whose receiver is gone are pruned here.
        self.subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}

/// Identity store that keeps accounts in memory.
///
/// ```
/// # use marquee::identity::{IdentityStore, InMemoryIdentityStore};
/// # #[tokio::main]
/// # async fn main() -> marquee::Result<()> {
/// let store = InMemoryIdentityStore::new();
/// let identity = store.sign_up("jane@acme.io", "s3cret!").await?;
/// store.sign_in("jane@acme.io", "s3cret!").await?;
/// assert_eq!(store.current_session().await?, Some(identity));
/// # Ok(())
/// # }
/// ```
pub struct InMemoryIdentityStore {
    clock: Arc<dyn Clock>,
    accounts: RwLock<HashMap<String, Account>>,
    session: Arc<Mutex<SessionSlot>>,
    require_confirmation: bool,
    unavailable: AtomicBool,
}

impl InMemoryIdentityStore {
    /// Creates an empty store that does not require email confirmation.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store using the given clock for account timestamps.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accounts: RwLock::new(HashMap::new()),
            session: Arc::new(Mutex::new(SessionSlot::default())),
            require_confirmation: false,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Require accounts to be confirmed with [`Self::confirm_email`] before sign-in.
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Simulate the identity service being unreachable.
    ///
    /// While set, every operation fails with [`IdentityError::Transport`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Mark an account's email as confirmed.
    pub async fn confirm_email(&self, email: &str) -> Result<()> {
        let key = normalize_email(email);
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&key)
            .ok_or_else(|| IdentityError::AccountNotFound { email: key.clone() })?;
        if account.confirmed_at.is_none() {
            account.confirmed_at = Some(self.clock.now_datetime());
            info!(email = %key, "Email confirmed");
        }
        Ok(())
    }

    /// Notify subscribers that the signed-in identity's credentials were refreshed.
    ///
    /// Does nothing when no one is signed in.
    pub fn refresh_session(&self) {
        let mut slot = self.session.lock().unwrap();
        if let Some(identity) = slot.current.clone() {
            slot.publish(IdentityEvent::token_refreshed(identity));
        }
    }

    /// Number of registered accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Look up a registered identity by email.
    pub async fn find_identity(&self, email: &str) -> Option<Identity> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&normalize_email(email))
            .map(|account| account.identity.clone())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.session.lock().unwrap().subscribers.len()
    }

    /// Saves all accounts to a JSON file. The signed-in session is not saved.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let accounts = self.accounts.read().await.clone();
        let serializable = SerializableStore {
            version: PERSISTENCE_VERSION,
            accounts,
        };
        let json = serde_json::to_string_pretty(&serializable)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Loads accounts from a JSON file.
    ///
    /// If the file does not exist, an empty store is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Self::with_clock(clock);
        match tokio::fs::read_to_string(path).await {
            Ok(json) => {
                let serializable: SerializableStore = serde_json::from_str(&json)?;
                *store.accounts.write().await = serializable.accounts;
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(store),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport {
                reason: "identity service unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIdentityStore")
            .field("clock", &self.clock)
            .field("require_confirmation", &self.require_confirmation)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn current_session(&self) -> Result<Option<Identity>> {
        self.ensure_available()?;
        Ok(self.session.lock().unwrap().current.clone())
    }

    fn subscribe(&self) -> IdentitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = self.session.lock().unwrap();
        let id = slot.next_subscriber;
        slot.next_subscriber += 1;
        slot.subscribers.insert(id, tx);
        debug!(subscriber = id, "Identity subscriber attached");

        let session = Arc::downgrade(&self.session);
        IdentitySubscription::new(rx, move || {
            if let Some(session) = session.upgrade() {
                session.lock().unwrap().subscribers.remove(&id);
                debug!(subscriber = id, "Identity subscriber detached");
            }
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.ensure_available()?;
        let key = normalize_email(email);
        let account = {
            let accounts = self.accounts.read().await;
            accounts
                .get(&key)
                .cloned()
                .ok_or(IdentityError::InvalidCredentials)?
        };

        crypto::verify_password(password, &account.password_hash)?;

        if self.require_confirmation && account.confirmed_at.is_none() {
            return Err(IdentityError::EmailNotConfirmed { email: key }.into());
        }

        let identity = account.identity;
        let mut slot = self.session.lock().unwrap();
        slot.current = Some(identity.clone());
        slot.publish(IdentityEvent {
            kind: IdentityEventKind::SignedIn,
            identity: Some(identity.clone()),
        });
        info!(identity_id = %identity.id, "Signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        self.ensure_available()?;
        let key = normalize_email(email);
        validate_email(&key)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                min_len: MIN_PASSWORD_LEN,
            }
            .into());
        }

        let password_hash = crypto::hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered { email: key }.into());
        }

        let identity = Identity::new(Uuid::new_v4().to_string(), key.clone());
        let now = self.clock.now_datetime();
        accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password_hash,
                confirmed_at: (!self.require_confirmation).then_some(now),
                created_at: now,
            },
        );
        info!(identity_id = %identity.id, "Account registered");
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.ensure_available()?;
        let mut slot = self.session.lock().unwrap();
        if slot.current.take().is_some() {
            slot.publish(IdentityEvent::signed_out());
            info!("Signed out");
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidEmail {
            email: email.to_string(),
        }
        .into())
    }
}
