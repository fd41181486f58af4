//! Tenant setup at sign-up
//!
//! After an account registers, the session manager asks a [`TenantSetup`] to create the
//! company the user named and an admin profile linking them. The call is best-effort:
//! the session manager never waits on it for the sign-up result, and an identity left
//! without a profile is repaired on its first resolution.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    Company, NewCompany, NewProfile, Profile, TenantError, TenantRepository,
    slug::{disambiguate, slugify},
};
use crate::{Clock, Error, Identity, Result};

/// Input for creating a tenant for a freshly registered identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantSetupRequest {
    pub identity: Identity,
    pub company_name: String,
}

/// Mechanism that creates the company and admin profile for a new account.
///
/// Typically a remote service; [`RepositoryTenantSetup`] performs the same steps
/// directly against a [`TenantRepository`].
#[async_trait]
pub trait TenantSetup: Send + Sync {
    async fn setup_tenant(&self, request: TenantSetupRequest) -> Result<(Company, Profile)>;
}

/// Tenant setup performed against a repository.
///
/// The slug is derived from the company name; if another company already holds it, a
/// timestamp suffix is appended and the insert retried once.
#[derive(Clone)]
pub struct RepositoryTenantSetup {
    repository: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
}

impl RepositoryTenantSetup {
    pub fn new(repository: Arc<dyn TenantRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    async fn insert_company(&self, name: &str) -> Result<Company> {
        let slug = slugify(name);
        match self
            .repository
            .insert_company(NewCompany::trial(name, slug.clone()))
            .await
        {
            Err(Error::Tenant(TenantError::SlugTaken { .. })) => {
                let slug = disambiguate(&slug, self.clock.now_millis());
                debug!(%slug, "Company slug taken, retrying with timestamp suffix");
                self.repository
                    .insert_company(NewCompany::trial(name, slug))
                    .await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for RepositoryTenantSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryTenantSetup")
            .field("repository", &"<TenantRepository>")
            .field("clock", &self.clock)
            .finish()
    }
}

#[async_trait]
impl TenantSetup for RepositoryTenantSetup {
    async fn setup_tenant(&self, request: TenantSetupRequest) -> Result<(Company, Profile)> {
        let name = request.company_name.trim();
        if name.is_empty() {
            return Err(TenantError::InvalidField {
                field: "company_name",
                reason: "company name must not be empty".to_string(),
            }
            .into());
        }

        let company = self.insert_company(name).await?;
        let profile = self
            .repository
            .insert_profile(NewProfile::admin(
                &request.identity.id,
                &request.identity.email,
                &company.id,
            ))
            .await?;

        info!(
            identity_id = %request.identity.id,
            company_id = %company.id,
            slug = %company.slug,
            "Tenant set up"
        );
        Ok((company, profile))
    }
}
