//! Error types for the identity store
use thiserror::Error;

/// Errors reported by an [`IdentityStore`](super::IdentityStore).
///
/// Messages are user-presentable; the session manager passes them through unchanged.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed: {email}")]
    EmailNotConfirmed { email: String },

    #[error("User already registered: {email}")]
    AlreadyRegistered { email: String },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Password should be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("Account not found: {email}")]
    AccountNotFound { email: String },

    #[error("Identity service unreachable: {reason}")]
    Transport { reason: String },

    #[error("Password hashing failed: {reason}")]
    HashingFailed { reason: String },
}

impl IdentityError {
    /// Check if the store rejected the credentials or the account state.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidCredentials | IdentityError::EmailNotConfirmed { .. }
        )
    }

    /// Check if the sign-up input was refused.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidEmail { .. } | IdentityError::WeakPassword { .. }
        )
    }

    /// Check if this error indicates the account already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, IdentityError::AlreadyRegistered { .. })
    }

    /// Check if the identity service could not be reached.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, IdentityError::Transport { .. })
    }
}

impl From<IdentityError> for crate::Error {
    fn from(err: IdentityError) -> Self {
        crate::Error::Identity(err)
    }
}
