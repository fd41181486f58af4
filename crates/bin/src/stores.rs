//! Store loading and saving for the CLI.
//!
//! Each command opens the JSON-persisted stores under the data directory, starts a
//! session over them, and saves whatever changed before exiting.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use marquee::{
    SessionConfig, SessionManager, SystemClock, identity::InMemoryIdentityStore,
    tenant::InMemoryTenantRepository,
};

use crate::cli::StoreArgs;

const IDENTITIES_FILE: &str = "identities.json";
const TENANTS_FILE: &str = "tenants.json";

pub struct Stores {
    pub identities: Arc<InMemoryIdentityStore>,
    pub tenants: Arc<InMemoryTenantRepository>,
    pub config: SessionConfig,
    data_dir: PathBuf,
}

impl Stores {
    /// Load both stores, creating the data directory if needed.
    pub async fn open(args: &StoreArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = match &args.config {
            Some(path) => {
                tracing::info!("Loading session config from {}", path.display());
                SessionConfig::load_from_file(path).await?
            }
            None => SessionConfig::default(),
        };

        let clock = Arc::new(SystemClock);
        let mut identities =
            InMemoryIdentityStore::load_from_file(data_dir.join(IDENTITIES_FILE), clock.clone())
                .await?;
        if args.require_confirmation {
            identities = identities.requiring_confirmation();
        }
        let tenants =
            InMemoryTenantRepository::load_from_file(data_dir.join(TENANTS_FILE), clock).await?;
        tracing::debug!("Opened stores in {}", data_dir.display());

        Ok(Self {
            identities: Arc::new(identities),
            tenants: Arc::new(tenants),
            config,
            data_dir,
        })
    }

    /// Start a session manager over the loaded stores.
    pub fn session(&self) -> SessionManager {
        SessionManager::start(
            self.identities.clone(),
            self.tenants.clone(),
            self.config.clone(),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write both stores back to the data directory.
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.identities
            .save_to_file(self.data_dir.join(IDENTITIES_FILE))
            .await?;
        self.tenants
            .save_to_file(self.data_dir.join(TENANTS_FILE))
            .await?;
        tracing::debug!("Saved stores to {}", self.data_dir.display());
        Ok(())
    }
}
