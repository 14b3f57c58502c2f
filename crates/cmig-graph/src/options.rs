//! Export root selection and options

use crate::error::{GraphError, GraphResult};
use cmig_model::{EntityKey, EntityType, MappingAction};
use std::fmt;
use std::str::FromStr;

/// What to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelector {
    /// One entity and everything it depends on; a folder also brings its subtree
    Entity(EntityKey),
    /// The whole store
    All,
}

impl RootSelector {
    /// Policy root
    #[must_use]
    pub fn policy(id: &str) -> Self {
        Self::Entity(EntityKey::new(EntityType::Policy, id))
    }

    /// Folder root
    #[must_use]
    pub fn folder(id: &str) -> Self {
        Self::Entity(EntityKey::new(EntityType::Folder, id))
    }
}

impl fmt::Display for RootSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(key) => write!(f, "{key}"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for RootSelector {
    type Err = GraphError;

    /// `all`, `policy/{id}`, `folder/{id}` or `{type}/{id}`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_matches('/');
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let (kind, id) = s
            .split_once('/')
            .ok_or_else(|| GraphError::InvalidOption(format!("root selector '{s}'")))?;
        if id.is_empty() {
            return Err(GraphError::InvalidOption(format!("root selector '{s}' has no id")));
        }
        let entity_type = kind.parse::<EntityType>().map_err(GraphError::InvalidOption)?;
        Ok(Self::Entity(EntityKey::new(entity_type, id)))
    }
}

/// Export flags
#[derive(Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Export the whole store regardless of root
    pub all: bool,
    /// For folder roots, include the folder itself and not only its contents
    pub include_request_folder: bool,
    /// Action placed on every emitted directive
    pub default_action: MappingAction,
    /// Seal secrets rather than redact them
    pub encrypt_secrets: bool,
    /// Emit generated roles after their owner; defaults to on for whole-store exports
    pub include_owned_roles: Option<bool>,
    /// Passphrase for sealing secrets
    pub passphrase: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            all: false,
            include_request_folder: false,
            default_action: MappingAction::NewOrExisting,
            encrypt_secrets: false,
            include_owned_roles: None,
            passphrase: None,
        }
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("all", &self.all)
            .field("include_request_folder", &self.include_request_folder)
            .field("default_action", &self.default_action)
            .field("encrypt_secrets", &self.encrypt_secrets)
            .field("include_owned_roles", &self.include_owned_roles)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ExportOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With whole-store export
    #[inline]
    #[must_use]
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// With request folder inclusion
    #[inline]
    #[must_use]
    pub fn with_request_folder(mut self, include: bool) -> Self {
        self.include_request_folder = include;
        self
    }

    /// With default action
    #[inline]
    #[must_use]
    pub fn with_default_action(mut self, action: MappingAction) -> Self {
        self.default_action = action;
        self
    }

    /// With owned role inclusion
    #[inline]
    #[must_use]
    pub fn with_owned_roles(mut self, include: bool) -> Self {
        self.include_owned_roles = Some(include);
        self
    }

    /// Seal secrets with `passphrase`
    #[inline]
    #[must_use]
    pub fn with_encryption(mut self, passphrase: impl Into<String>) -> Self {
        self.encrypt_secrets = true;
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Whether generated roles are emitted for `root`
    #[must_use]
    pub fn owned_roles_included(&self, root: &RootSelector) -> bool {
        self.include_owned_roles
            .unwrap_or(self.all || *root == RootSelector::All)
    }

    /// Parse `all=true&defaultAction=NewOrUpdate&includeRequestFolder=true&encryptSecrets=false`
    ///
    /// # Errors
    ///
    /// Unknown flags and malformed values.
    pub fn from_query(query: &str) -> GraphResult<Self> {
        let mut options = Self::default();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, "true"));
            match key {
                "all" => options.all = parse_flag(key, value)?,
                "includeRequestFolder" => options.include_request_folder = parse_flag(key, value)?,
                "encryptSecrets" => options.encrypt_secrets = parse_flag(key, value)?,
                "includeOwnedRoles" => options.include_owned_roles = Some(parse_flag(key, value)?),
                "defaultAction" => {
                    options.default_action = value.parse().map_err(GraphError::InvalidOption)?;
                }
                other => return Err(GraphError::InvalidOption(format!("unknown flag '{other}'"))),
            }
        }
        Ok(options)
    }
}

fn parse_flag(key: &str, value: &str) -> GraphResult<bool> {
    value
        .parse()
        .map_err(|_| GraphError::InvalidOption(format!("{key}={value} is not a boolean")))
}
