//! Identity store contract
//!
//! The identity store is the external authority for accounts: it signs accounts in and
//! out, reports the current session, and notifies subscribers whenever the
//! authenticated identity changes. The session manager consumes it only through the
//! [`IdentityStore`] trait; [`InMemoryIdentityStore`] is the reference implementation.

use async_trait::async_trait;

use crate::Result;

pub mod crypto;
pub mod errors;
pub mod in_memory;
pub mod subscription;
pub mod types;

pub use errors::IdentityError;
pub use in_memory::InMemoryIdentityStore;
pub use subscription::IdentitySubscription;
pub use types::*;

/// Authentication provider consumed by the session manager.
///
/// Implementations must deliver [`IdentityEvent`]s to each subscription in the order the
/// underlying changes happened. Errors from `sign_in`, `sign_up` and `sign_out` are
/// surfaced to the end user verbatim, so their `Display` output should be
/// user-presentable.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// One-shot lookup of the identity currently signed in, if any.
    async fn current_session(&self) -> Result<Option<Identity>>;

    /// Subscribe to identity changes.
    ///
    /// Dropping the returned subscription (or calling
    /// [`IdentitySubscription::unsubscribe`]) stops delivery.
    fn subscribe(&self) -> IdentitySubscription;

    /// Authenticate with email and password.
    ///
    /// On success the store emits a [`IdentityEventKind::SignedIn`] event.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    /// Register a new account.
    ///
    /// Registration does not establish a session; callers sign in afterwards.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;

    /// End the current session.
    ///
    /// On success the store emits a [`IdentityEventKind::SignedOut`] event.
    async fn sign_out(&self) -> Result<()>;
}
