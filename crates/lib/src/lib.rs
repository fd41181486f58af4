//!
//! Marquee: session and tenant bootstrap for a multi-tenant digital-signage admin.
//!
//! Every record the admin manages (screens, content, playlists, schedules) belongs to a
//! company. This library owns the part of the application that decides *which* company
//! and *which* role an authenticated account acts as.
//!
//! ## Core Concepts
//!
//! * **Identity (`identity::Identity`)**: An opaque authenticated account (id, email), owned by an
//!   [`identity::IdentityStore`]. The store emits [`identity::IdentityEvent`]s on sign-in, sign-out
//!   and token refresh.
//! * **Tenant records (`tenant::Profile`, `tenant::Company`)**: The profile links an identity to
//!   exactly one company and one role. Both live in a [`tenant::TenantRepository`].
//! * **Resolution (`resolver::TenantResolver`)**: Loads the profile and company for an identity,
//!   materializing a fresh admin profile and trial company when the profile is missing
//!   (self-repair of an orphaned identity).
//! * **Session (`session::SessionManager`)**: The single owner of the process-wide
//!   [`session::SessionState`]. It consumes identity events in order, runs resolution, and
//!   publishes snapshots to observers.
//! * **Capabilities (`capability::CapabilitySet`)**: Permitted actions derived from the role on
//!   demand; never cached.

pub mod capability;
pub mod clock;
pub mod config;
pub mod constants;
pub mod identity;
pub mod resolver;
pub mod session;
pub mod tenant;

pub use capability::{Capability, CapabilitySet, capabilities_for};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SessionConfig;
pub use identity::{Identity, IdentityError, IdentityEvent, IdentityStore};
pub use resolver::{Resolution, ResolveError, TenantResolver};
pub use session::{
    SessionError, SessionManager, SessionManagerBuilder, SessionPhase, SessionState,
};
pub use tenant::{Company, Profile, Role, SubscriptionStatus, TenantError, TenantRepository};

/// Result type used throughout the Marquee library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Marquee library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Structured errors from the identity store
    #[error(transparent)]
    Identity(identity::IdentityError),

    /// Structured errors from the tenant repository
    #[error(transparent)]
    Tenant(tenant::TenantError),

    /// Structured errors from tenant resolution
    #[error(transparent)]
    Resolve(resolver::ResolveError),

    /// Structured errors from the session manager
    #[error(transparent)]
    Session(session::SessionError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Identity(_) => "identity",
            Error::Tenant(_) => "tenant",
            Error::Resolve(_) => "resolver",
            Error::Session(_) => "session",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::InvalidConfig { .. } => "config",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Tenant(tenant_err) => tenant_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Identity(identity_err) => identity_err.is_conflict(),
            Error::Tenant(tenant_err) => tenant_err.is_conflict(),
            _ => false,
        }
    }

    /// Check if the identity store rejected the credentials or account.
    ///
    /// These errors are meant to be shown to the user verbatim.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            Error::Identity(identity_err) => identity_err.is_auth_rejected(),
            _ => false,
        }
    }

    /// Check if a remote collaborator was unreachable.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Identity(identity_err) => identity_err.is_transport_error(),
            Error::Tenant(tenant_err) => tenant_err.is_unavailable(),
            Error::Resolve(resolve_err) => resolve_err.is_unavailable(),
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Check if this error is a terminal tenant resolution failure.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Error::Resolve(_))
    }

    /// Check if this error was raised because no identity is signed in.
    pub fn is_no_active_identity(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_no_active_identity(),
            _ => false,
        }
    }
}
