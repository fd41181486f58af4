//! In-memory tenant repository
//!
//! Stores companies and profiles in hash maps behind async locks, enforcing the same
//! constraints a relational store would: unique profile ids, unique company slugs and
//! profiles that reference an existing company.

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    Company, NewCompany, NewProfile, Profile, ProfileUpdate, Role, TenantError,
    TenantRepository, slug::is_valid_slug,
};
use crate::{Clock, Result, SystemClock};

/// The current persistence file format version.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct SerializableRepository {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    companies: HashMap<String, Company>,
    profiles: HashMap<String, Profile>,
}

#[derive(Default)]
struct Tables {
    companies: HashMap<String, Company>,
    profiles: HashMap<String, Profile>,
}

impl Tables {
    fn slug_in_use(&self, slug: &str) -> bool {
        self.companies.values().any(|company| company.slug == slug)
    }
}

/// A tenant repository held entirely in memory.
///
/// Suitable for tests, the CLI, and single-process deployments. State can be saved to
/// and loaded from a JSON file.
pub struct InMemoryTenantRepository {
    clock: Arc<dyn Clock>,
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryTenantRepository {
    /// Creates an empty repository timestamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty repository using the given clock for record timestamps.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tables: RwLock::new(Tables::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate the data service being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a company exactly as given, keeping its id and timestamps.
    ///
    /// Used for fixtures and imports. The slug must still be valid and unused.
    pub async fn import_company(&self, company: Company) -> Result<()> {
        if !is_valid_slug(&company.slug) {
            return Err(TenantError::InvalidSlug { slug: company.slug }.into());
        }
        let mut tables = self.tables.write().await;
        if tables.slug_in_use(&company.slug) {
            return Err(TenantError::SlugTaken { slug: company.slug }.into());
        }
        tables.companies.insert(company.id.clone(), company);
        Ok(())
    }

    /// Store a profile exactly as given.
    ///
    /// Unlike [`TenantRepository::insert_profile`], the referenced company is not
    /// required to exist, which lets fixtures reproduce inconsistent data.
    pub async fn import_profile(&self, profile: Profile) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.id) {
            return Err(TenantError::ProfileAlreadyExists {
                profile_id: profile.id,
            }
            .into());
        }
        tables.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Change a profile's role.
    ///
    /// Roles are assigned by administrators, never through [`ProfileUpdate`].
    pub async fn set_role(&self, profile_id: &str, role: Role) -> Result<Profile> {
        self.ensure_available()?;
        let now = self.clock.now_datetime();
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| TenantError::ProfileNotFound {
                profile_id: profile_id.to_string(),
            })?;
        profile.role = role;
        profile.updated_at = now;
        debug!(%profile_id, %role, "Profile role changed");
        Ok(profile.clone())
    }

    /// Remove a company, leaving any profiles that reference it dangling.
    ///
    /// Simulates an out-of-band deletion; the session core never deletes companies.
    pub async fn delete_company(&self, id: &str) -> Option<Company> {
        self.tables.write().await.companies.remove(id)
    }

    /// All companies, ordered by creation time.
    pub async fn companies(&self) -> Vec<Company> {
        let tables = self.tables.read().await;
        let mut companies: Vec<Company> = tables.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        companies
    }

    /// All profiles, ordered by creation time.
    pub async fn profiles(&self) -> Vec<Profile> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<Profile> = tables.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        profiles
    }

    /// Saves all companies and profiles to a JSON file.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serializable = {
            let tables = self.tables.read().await;
            SerializableRepository {
                version: PERSISTENCE_VERSION,
                companies: tables.companies.clone(),
                profiles: tables.profiles.clone(),
            }
        };
        let json = serde_json::to_string_pretty(&serializable)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Loads companies and profiles from a JSON file.
    ///
    /// If the file does not exist, an empty repository is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let repository = Self::with_clock(clock);
        match tokio::fs::read_to_string(path).await {
            Ok(json) => {
                let serializable: SerializableRepository = serde_json::from_str(&json)?;
                let mut tables = repository.tables.write().await;
                tables.companies = serializable.companies;
                tables.profiles = serializable.profiles;
                drop(tables);
                Ok(repository)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(repository),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TenantError::Unavailable {
                reason: "tenant service unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for InMemoryTenantRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryTenantRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTenantRepository")
            .field("clock", &self.clock)
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.profiles.get(id).cloned())
    }

    async fn get_company_by_id(&self, id: &str) -> Result<Option<Company>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.companies.get(id).cloned())
    }

    async fn insert_company(&self, fields: NewCompany) -> Result<Company> {
        self.ensure_available()?;
        if fields.name.trim().is_empty() {
            return Err(TenantError::InvalidField {
                field: "name",
                reason: "company name must not be empty".to_string(),
            }
            .into());
        }
        if !is_valid_slug(&fields.slug) {
            return Err(TenantError::InvalidSlug { slug: fields.slug }.into());
        }

        let mut tables = self.tables.write().await;
        if tables.slug_in_use(&fields.slug) {
            return Err(TenantError::SlugTaken { slug: fields.slug }.into());
        }

        let now = self.clock.now_datetime();
        let company = Company {
            id: Uuid::new_v4().to_string(),
            name: fields.name,
            slug: fields.slug,
            subscription_status: fields.subscription_status,
            created_at: now,
            updated_at: now,
        };
        tables.companies.insert(company.id.clone(), company.clone());
        debug!(company_id = %company.id, slug = %company.slug, "Company inserted");
        Ok(company)
    }

    async fn insert_profile(&self, fields: NewProfile) -> Result<Profile> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&fields.id) {
            return Err(TenantError::ProfileAlreadyExists {
                profile_id: fields.id,
            }
            .into());
        }
        if !tables.companies.contains_key(&fields.company_id) {
            return Err(TenantError::CompanyNotFound {
                company_id: fields.company_id,
            }
            .into());
        }

        let now = self.clock.now_datetime();
        let profile = Profile {
            id: fields.id,
            email: fields.email,
            company_id: fields.company_id,
            role: fields.role,
            first_name: fields.first_name,
            last_name: fields.last_name,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(profile.id.clone(), profile.clone());
        debug!(profile_id = %profile.id, company_id = %profile.company_id, "Profile inserted");
        Ok(profile)
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile> {
        self.ensure_available()?;
        let now = self.clock.now_datetime();
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(id)
            .ok_or_else(|| TenantError::ProfileNotFound {
                profile_id: id.to_string(),
            })?;
        update.apply_to(profile);
        profile.updated_at = now;
        Ok(profile.clone())
    }
}
