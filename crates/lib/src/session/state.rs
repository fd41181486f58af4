//! Session state published by the session manager

use serde::Serialize;

use crate::{
    Identity,
    capability::{CapabilitySet, capabilities_for},
    tenant::{Company, Profile, Role},
};

/// Where the session state machine currently is.
///
/// `Authenticated` and `Anonymous` are the two ready states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the identity store to report the current session
    Initializing,
    /// Resolving tenant records for a new identity
    Resolving,
    Authenticated,
    Anonymous,
}

impl SessionPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionPhase::Authenticated | SessionPhase::Anonymous)
    }
}

/// Snapshot of the process-wide session.
///
/// Only the session worker produces new states; everyone else reads snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub company: Option<Company>,
    pub loading: bool,
    pub phase: SessionPhase,
}

impl SessionState {
    /// State at process start, before the identity store has answered.
    pub fn initializing() -> Self {
        Self {
            identity: None,
            profile: None,
            company: None,
            loading: true,
            phase: SessionPhase::Initializing,
        }
    }

    /// Nobody is signed in.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            profile: None,
            company: None,
            loading: false,
            phase: SessionPhase::Anonymous,
        }
    }

    /// Tenant records are being resolved for `identity`.
    pub fn resolving(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            profile: None,
            company: None,
            loading: true,
            phase: SessionPhase::Resolving,
        }
    }

    /// Resolution finished for `identity`; either tenant record may be missing.
    pub fn authenticated(
        identity: Identity,
        profile: Option<Profile>,
        company: Option<Company>,
    ) -> Self {
        Self {
            identity: Some(identity),
            profile,
            company,
            loading: false,
            phase: SessionPhase::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Signed in and resolved, but the profile or its company is unavailable.
    pub fn is_degraded(&self) -> bool {
        self.phase == SessionPhase::Authenticated
            && (self.profile.is_none() || self.company.is_none())
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|profile| profile.role)
    }

    /// Capabilities of the current profile's role; empty without a profile.
    pub fn capabilities(&self) -> CapabilitySet {
        self.role().map(capabilities_for).unwrap_or_default()
    }

    /// The profile is an admin.
    pub fn is_admin(&self) -> bool {
        self.has_tier(Role::Admin)
    }

    /// The profile has at least editor privileges.
    pub fn is_editor(&self) -> bool {
        self.has_tier(Role::Editor)
    }

    /// The profile has at least viewer privileges, which any profile does.
    pub fn is_viewer(&self) -> bool {
        self.has_tier(Role::Viewer)
    }

    fn has_tier(&self, tier: Role) -> bool {
        self.role().is_some_and(|role| role.includes(tier))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initializing()
    }
}
