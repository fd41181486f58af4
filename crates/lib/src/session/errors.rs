//! Error types for the session manager

use thiserror::Error;

/// Errors raised by [`SessionManager`](super::SessionManager) operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a signed-in identity and there is none.
    #[error("No active identity")]
    NoActiveIdentity,

    /// The background session worker is no longer running.
    #[error("Session worker stopped")]
    WorkerStopped,
}

impl SessionError {
    pub fn is_no_active_identity(&self) -> bool {
        matches!(self, SessionError::NoActiveIdentity)
    }

    pub fn is_worker_stopped(&self) -> bool {
        matches!(self, SessionError::WorkerStopped)
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
