//! Core data types for identities and identity-change events

use serde::{Deserialize, Serialize};

/// An authenticated account as reported by the identity store.
///
/// Opaque to the rest of the core: only the store creates identities.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account id; profiles use the same value as their primary key
    pub id: String,

    /// Login email
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// The part of the email before `@`, or the whole email if it has none.
    pub fn email_local_part(&self) -> &str {
        self.email
            .split_once('@')
            .map(|(local, _)| local)
            .unwrap_or(&self.email)
    }
}

/// What caused an identity-change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityEventKind {
    /// A session restored by the store at startup, for stores that report it as an event
    InitialSession,
    SignedIn,
    SignedOut,
    /// Credentials were refreshed; the identity may or may not have changed
    TokenRefreshed,
    /// Account details (e.g. email) changed
    UserUpdated,
}

/// Identity-change notification delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub kind: IdentityEventKind,

    /// The identity now signed in, or `None` once signed out
    pub identity: Option<Identity>,
}

impl IdentityEvent {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::SignedIn,
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: IdentityEventKind::SignedOut,
            identity: None,
        }
    }

    pub fn token_refreshed(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::TokenRefreshed,
            identity: Some(identity),
        }
    }
}
