//! Error types for tenant resolution

use thiserror::Error;

/// Step of the self-repair protocol that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairStep {
    CreateCompany,
    CreateProfile,
}

impl std::fmt::Display for RepairStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RepairStep::CreateCompany => "create company",
            RepairStep::CreateProfile => "create profile",
        })
    }
}

/// Terminal failures of a single resolution attempt.
///
/// A missing company is not an error here: it yields a degraded
/// [`Resolution`](super::Resolution) instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The profile lookup itself failed (as opposed to finding no profile).
    #[error("Profile lookup failed for identity {identity_id}: {source}")]
    ProfileLookupFailed {
        identity_id: String,
        #[source]
        source: Box<crate::Error>,
    },

    /// Self-repair could not materialize the company/profile pair.
    #[error("Tenant setup failed for identity {identity_id} at step '{step}': {source}")]
    SetupFailed {
        identity_id: String,
        step: RepairStep,
        #[source]
        source: Box<crate::Error>,
    },

    /// Self-repair reported success but the profile is still not visible.
    #[error("Repaired profile for identity {identity_id} is not visible")]
    RepairNotVisible { identity_id: String },
}

impl ResolveError {
    /// Identity whose resolution failed.
    pub fn identity_id(&self) -> &str {
        match self {
            ResolveError::ProfileLookupFailed { identity_id, .. }
            | ResolveError::SetupFailed { identity_id, .. }
            | ResolveError::RepairNotVisible { identity_id } => identity_id,
        }
    }

    /// Check if self-repair failed.
    pub fn is_setup_failed(&self) -> bool {
        matches!(
            self,
            ResolveError::SetupFailed { .. } | ResolveError::RepairNotVisible { .. }
        )
    }

    /// Check if the underlying cause was an unreachable service.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ResolveError::ProfileLookupFailed { source, .. }
            | ResolveError::SetupFailed { source, .. } => source.is_unavailable(),
            ResolveError::RepairNotVisible { .. } => false,
        }
    }
}

impl From<ResolveError> for crate::Error {
    fn from(err: ResolveError) -> Self {
        crate::Error::Resolve(err)
    }
}
