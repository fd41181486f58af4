//! Error types for the tenant repository

use thiserror::Error;

/// Errors that can occur while reading or writing tenant records.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TenantError {
    /// No profile exists for the identity.
    #[error("Profile not found: {profile_id}")]
    ProfileNotFound {
        /// Identity id used as profile key
        profile_id: String,
    },

    /// A profile references a company that does not exist.
    #[error("Company not found: {company_id}")]
    CompanyNotFound {
        /// The referenced company id
        company_id: String,
    },

    /// A profile already exists for the identity.
    #[error("Profile already exists: {profile_id}")]
    ProfileAlreadyExists {
        /// Identity id used as profile key
        profile_id: String,
    },

    /// Another company already uses the slug.
    #[error("Company slug already taken: {slug}")]
    SlugTaken {
        /// The conflicting slug
        slug: String,
    },

    /// Slug is empty or not URL-safe.
    #[error("Invalid company slug: '{slug}'")]
    InvalidSlug {
        /// The rejected slug
        slug: String,
    },

    /// A required field is missing or malformed.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The tenant data service could not be reached.
    #[error("Tenant service unavailable: {reason}")]
    Unavailable {
        /// Description of the failure
        reason: String,
    },
}

impl TenantError {
    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TenantError::ProfileNotFound { .. } | TenantError::CompanyNotFound { .. }
        )
    }

    /// Check if this error indicates a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TenantError::ProfileAlreadyExists { .. } | TenantError::SlugTaken { .. }
        )
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            TenantError::InvalidSlug { .. } | TenantError::InvalidField { .. }
        )
    }

    /// Check if the service was unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TenantError::Unavailable { .. })
    }
}

impl From<TenantError> for crate::Error {
    fn from(err: TenantError) -> Self {
        crate::Error::Tenant(err)
    }
}
