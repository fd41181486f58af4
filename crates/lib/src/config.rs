//! Session configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    constants::{
        DEFAULT_COMPANY_PREFIX, REPAIR_SLUG_PREFIX, SESSION_COMMAND_BUFFER, SLUG_ID_PREFIX_LEN,
    },
};

/// Tunables for the session manager and tenant resolver.
///
/// Every field has a default, so a config file only needs the keys it overrides:
///
/// ```
/// let config: marquee::SessionConfig =
///     serde_json::from_str(r#"{ "default_company_prefix": "Company of" }"#).unwrap();
/// assert_eq!(config.default_company_prefix, "Company of");
/// assert_eq!(config.slug_id_prefix_len, 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix of the company name created by self-repair.
    pub default_company_prefix: String,

    /// Leading segment of self-repair slugs.
    pub repair_slug_prefix: String,

    /// Identity-id characters embedded in a self-repair slug.
    pub slug_id_prefix_len: usize,

    /// Capacity of the session command channel.
    pub command_buffer: usize,

    /// Dispatch tenant setup after a successful sign-up.
    pub setup_on_sign_up: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_company_prefix: DEFAULT_COMPANY_PREFIX.to_string(),
            repair_slug_prefix: REPAIR_SLUG_PREFIX.to_string(),
            slug_id_prefix_len: SLUG_ID_PREFIX_LEN,
            command_buffer: SESSION_COMMAND_BUFFER,
            setup_on_sign_up: true,
        }
    }
}

impl SessionConfig {
    /// Load a config from a JSON file.
    ///
    /// A missing file yields the default config.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = match tokio::fs::read_to_string(path).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the resolver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.slug_id_prefix_len == 0 {
            return Err(Error::InvalidConfig {
                reason: "slug_id_prefix_len must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
