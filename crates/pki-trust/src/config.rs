//! Working-directory configuration.
//!
//! Handles reading and writing the `pki.io.conf` TOML file that names the
//! organization and the admins acting for it:
//!
//! ```toml
//! [org]
//! name = "acme"
//! id = "0190c6a8-..."
//!
//! [[admins]]
//! name = "alice"
//! id = "0190c6a8-..."
//! ```

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{PkiError, Result};

/// File name of the configuration inside a working directory.
pub const CONFIG_FILE: &str = "pki.io.conf";

/// Contents of `pki.io.conf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub org: OrgConfig,
    #[serde(default)]
    pub admins: Vec<AdminConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgConfig {
    pub name: String,
    pub id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub name: String,
    pub id: EntityId,
}

impl Config {
    /// Configuration for an organization with a single admin.
    pub fn new(org: OrgConfig, admin: AdminConfig) -> Self {
        Self {
            org,
            admins: vec![admin],
        }
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if the TOML is malformed
    /// or names no admin.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| PkiError::Config(format!("{}: {e}", path.display())))?;
        config.primary_admin()?;
        Ok(config)
    }

    /// Write configuration to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("saving config to {}", path.display());
        let contents =
            toml::to_string_pretty(self).map_err(|e| PkiError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The admin this working directory acts as: the first one listed.
    pub fn primary_admin(&self) -> Result<&AdminConfig> {
        self.admins
            .first()
            .ok_or_else(|| PkiError::Config("no admins configured".into()))
    }
}
