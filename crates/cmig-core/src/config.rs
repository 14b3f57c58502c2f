//! Engine configuration
//!
//! Loaded from a TOML file; every field is optional.
//!
//! ```toml
//! default_action = "NewOrUpdate"
//! include_owned_roles_for_all = true
//! passphrase_env = "CMIG_PASSPHRASE"
//! audit_enabled = true
//! activate_by_default = true
//! ```

use crate::error::{MigrationError, MigrationResult};
use cmig_graph::ExportOptions;
use cmig_model::MappingAction;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the passphrase environment variable
pub const DEFAULT_PASSPHRASE_ENV: &str = "CMIG_PASSPHRASE";

/// Migration engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Action placed on exported directives unless the caller picks one
    pub default_action: MappingAction,
    /// Emit generated roles on whole-store exports
    pub include_owned_roles_for_all: bool,
    /// Environment variable holding the secret passphrase
    pub passphrase_env: String,
    /// Record committed imports in the audit trail
    pub audit_enabled: bool,
    /// Activate imported revisions unless the caller says otherwise
    pub activate_by_default: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_action: MappingAction::NewOrExisting,
            include_owned_roles_for_all: true,
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
            audit_enabled: true,
            activate_by_default: true,
        }
    }
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default export action
    #[inline]
    #[must_use]
    pub fn with_default_action(mut self, action: MappingAction) -> Self {
        self.default_action = action;
        self
    }

    /// With audit on or off
    #[inline]
    #[must_use]
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// With passphrase variable name
    #[inline]
    #[must_use]
    pub fn with_passphrase_env(mut self, name: impl Into<String>) -> Self {
        self.passphrase_env = name.into();
        self
    }

    /// With owned roles on whole-store exports
    #[inline]
    #[must_use]
    pub fn with_owned_roles_for_all(mut self, include: bool) -> Self {
        self.include_owned_roles_for_all = include;
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// Malformed TOML or unknown action names.
    pub fn from_toml_str(text: &str) -> MigrationResult<Self> {
        toml::from_str(text).map_err(|e| MigrationError::Config(e.to_string()))
    }

    /// Load a TOML file
    ///
    /// # Errors
    ///
    /// Unreadable file or malformed TOML.
    pub fn load(path: impl AsRef<Path>) -> MigrationResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MigrationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Passphrase from the configured environment variable
    #[must_use]
    pub fn passphrase(&self) -> Option<String> {
        std::env::var(&self.passphrase_env)
            .ok()
            .filter(|p| !p.is_empty())
    }

    /// Export options seeded from this configuration
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        let options = ExportOptions::new().with_default_action(self.default_action);
        if self.include_owned_roles_for_all {
            options
        } else {
            options.with_owned_roles(false)
        }
    }
}
