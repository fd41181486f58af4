//! Tenant repository contract
//!
//! Companies and profiles live in a remote data service. The core reaches them only
//! through exact-match lookups and inserts on [`TenantRepository`]; every call is a
//! potential suspension point and may fail with [`TenantError::Unavailable`].

use async_trait::async_trait;

use crate::Result;

pub mod errors;
pub mod in_memory;
pub mod setup;
pub mod slug;
pub mod types;

pub use errors::TenantError;
pub use in_memory::InMemoryTenantRepository;
pub use setup::{RepositoryTenantSetup, TenantSetup, TenantSetupRequest};
pub use types::*;

/// Keyed store for [`Profile`] and [`Company`] records.
///
/// Implementations are expected to enforce two uniqueness constraints and report
/// them as conflicts: one profile per identity id
/// ([`TenantError::ProfileAlreadyExists`]) and one company per slug
/// ([`TenantError::SlugTaken`]).
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Exact-match lookup of a profile by identity id.
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>>;

    /// Exact-match lookup of a company by id.
    async fn get_company_by_id(&self, id: &str) -> Result<Option<Company>>;

    /// Insert a company, returning the stored record with its assigned id.
    async fn insert_company(&self, fields: NewCompany) -> Result<Company>;

    /// Insert a profile, returning the stored record.
    async fn insert_profile(&self, fields: NewProfile) -> Result<Profile>;

    /// Apply a partial update to an existing profile.
    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile>;
}
