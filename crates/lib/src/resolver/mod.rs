//! Tenant resolution and self-repair
//!
//! Resolution maps an authenticated [`Identity`] to its [`Profile`] and [`Company`]:
//!
//! 1. Look up the profile by identity id.
//! 2. If found, look up its company. A missing or unreadable company degrades the
//!    result (`company = None`) instead of failing it; there is no retry.
//! 3. If no profile exists the identity is orphaned (sign-up succeeded but tenant setup
//!    never completed) and self-repair runs:
//!    a. name the company after the email's local part and build a slug from the
//!    identity id prefix plus the current millisecond timestamp,
//!    b. insert the company on the trial plan,
//!    c. insert an admin profile linked to it,
//!    d. reload profile and company through steps 1–2.
//!
//!    A failed company insert aborts before any profile is written.
//!
//! Self-repair is not guarded by a lock. Two repairs racing for the *same* identity
//! are settled by the repository's unique profile id: the loser sees
//! `ProfileAlreadyExists`, reloads the winner's records, and leaves its own company
//! unreferenced. Repairs are only triggered by the identity's own session start, so
//! such races are rare.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    Clock, Error, Identity, Result, SessionConfig,
    tenant::{
        Company, NewCompany, NewProfile, Profile, TenantError, TenantRepository, slug::repair_slug,
    },
};

pub mod errors;

pub use errors::{RepairStep, ResolveError};

/// Outcome of a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub profile: Profile,

    /// `None` when the profile references a company that could not be loaded
    pub company: Option<Company>,

    /// Whether self-repair created the profile during this resolution
    pub repaired: bool,
}

impl Resolution {
    /// True when the profile exists but its company does not.
    pub fn is_degraded(&self) -> bool {
        self.company.is_none()
    }
}

enum RepairOutcome {
    Created,
    AlreadyRepaired,
}

/// Resolves identities to their tenant records.
///
/// Cheap to clone; clones share the repository and clock.
#[derive(Clone)]
pub struct TenantResolver {
    repository: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
    company_prefix: String,
    slug_prefix: String,
    slug_id_prefix_len: usize,
}

impl TenantResolver {
    pub fn new(
        repository: Arc<dyn TenantRepository>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            company_prefix: config.default_company_prefix.clone(),
            slug_prefix: config.repair_slug_prefix.clone(),
            slug_id_prefix_len: config.slug_id_prefix_len,
        }
    }

    /// Resolve `identity` to its profile and company, repairing an orphaned identity.
    pub async fn resolve(&self, identity: &Identity) -> Result<Resolution> {
        if let Some(profile) = self.lookup_profile(identity).await? {
            let company = self.load_company(&profile).await;
            return Ok(Resolution {
                profile,
                company,
                repaired: false,
            });
        }

        info!(identity_id = %identity.id, "No profile for identity, running self-repair");
        let outcome = self.self_repair(identity).await?;

        let profile = self
            .lookup_profile(identity)
            .await?
            .ok_or_else(|| ResolveError::RepairNotVisible {
                identity_id: identity.id.clone(),
            })?;
        let company = self.load_company(&profile).await;

        Ok(Resolution {
            profile,
            company,
            repaired: matches!(outcome, RepairOutcome::Created),
        })
    }

    /// Name given to the company created for an orphaned identity.
    pub fn default_company_name(&self, identity: &Identity) -> String {
        let local = identity.email_local_part().trim();
        let owner = if local.is_empty() {
            identity.id.as_str()
        } else {
            local
        };
        format!("{} {owner}", self.company_prefix)
    }

    async fn lookup_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
        self.repository
            .get_profile_by_id(&identity.id)
            .await
            .map_err(|e| {
                ResolveError::ProfileLookupFailed {
                    identity_id: identity.id.clone(),
                    source: Box::new(e),
                }
                .into()
            })
    }

    async fn load_company(&self, profile: &Profile) -> Option<Company> {
        match self.repository.get_company_by_id(&profile.company_id).await {
            Ok(Some(company)) => Some(company),
            Ok(None) => {
                let err = TenantError::CompanyNotFound {
                    company_id: profile.company_id.clone(),
                };
                warn!(
                    identity_id = %profile.id,
                    company_id = %profile.company_id,
                    error = %err,
                    "Profile references a missing company, session degraded"
                );
                None
            }
            Err(e) => {
                warn!(
                    identity_id = %profile.id,
                    company_id = %profile.company_id,
                    error = %e,
                    "Company lookup failed, session degraded"
                );
                None
            }
        }
    }

    async fn self_repair(&self, identity: &Identity) -> Result<RepairOutcome> {
        let name = self.default_company_name(identity);
        let slug = repair_slug(
            &self.slug_prefix,
            &identity.id,
            self.slug_id_prefix_len,
            self.clock.now_millis(),
        );

        let company = match self
            .repository
            .insert_company(NewCompany::trial(name, slug))
            .await
        {
            Ok(company) => company,
            Err(e) => {
                // A slug clash can only come from a concurrent repair of this identity.
                if matches!(e, Error::Tenant(TenantError::SlugTaken { .. }))
                    && self.profile_exists(identity).await
                {
                    debug!(identity_id = %identity.id, "Identity repaired concurrently");
                    return Ok(RepairOutcome::AlreadyRepaired);
                }
                error!(identity_id = %identity.id, error = %e, "Self-repair failed creating company");
                return Err(ResolveError::SetupFailed {
                    identity_id: identity.id.clone(),
                    step: RepairStep::CreateCompany,
                    source: Box::new(e),
                }
                .into());
            }
        };

        match self
            .repository
            .insert_profile(NewProfile::admin(&identity.id, &identity.email, &company.id))
            .await
        {
            Ok(profile) => {
                info!(
                    identity_id = %identity.id,
                    company_id = %company.id,
                    slug = %company.slug,
                    role = %profile.role,
                    "Self-repair created tenant"
                );
                Ok(RepairOutcome::Created)
            }
            Err(Error::Tenant(TenantError::ProfileAlreadyExists { .. })) => {
                warn!(
                    identity_id = %identity.id,
                    orphan_company_id = %company.id,
                    "Identity repaired concurrently, keeping existing profile"
                );
                Ok(RepairOutcome::AlreadyRepaired)
            }
            Err(e) => {
                error!(
                    identity_id = %identity.id,
                    company_id = %company.id,
                    error = %e,
                    "Self-repair failed creating profile"
                );
                Err(ResolveError::SetupFailed {
                    identity_id: identity.id.clone(),
                    step: RepairStep::CreateProfile,
                    source: Box::new(e),
                }
                .into())
            }
        }
    }

    async fn profile_exists(&self, identity: &Identity) -> bool {
        matches!(
            self.repository.get_profile_by_id(&identity.id).await,
            Ok(Some(_))
        )
    }
}

impl std::fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolver")
            .field("repository", &"<TenantRepository>")
            .field("clock", &self.clock)
            .field("company_prefix", &self.company_prefix)
            .finish()
    }
}
