//! The unit of transfer for one migration
//!
//! A [`Bundle`] holds entity payloads and mapping directives. Directive order is
//! significant: a dependency's directive always precedes its dependents'.
//! Fixed entities may have a directive without a reference.

use crate::entity::{EntityKey, EntityRef};
use crate::error::{BundleError, BundleResult};
use crate::mapping::MappingDirective;
use crate::secret::{Salt, SealingKey, SecretError, SecretResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Exported references and mapping directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Entity payloads
    #[serde(default)]
    pub references: Vec<EntityRef>,
    /// Directives, dependencies first
    #[serde(default)]
    pub mappings: Vec<MappingDirective>,
    /// Base64 salt for sealed secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_salt: Option<String>,
}

impl Bundle {
    /// Empty bundle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> BundleResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty JSON
    pub fn to_json_pretty(&self) -> BundleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reference for `key`, if carried
    #[must_use]
    pub fn reference(&self, key: &EntityKey) -> Option<&EntityRef> {
        self.references
            .iter()
            .find(|r| r.entity_type == key.entity_type && r.id == key.id)
    }

    /// References indexed by key
    #[must_use]
    pub fn reference_index(&self) -> HashMap<EntityKey, &EntityRef> {
        self.references.iter().map(|r| (r.key(), r)).collect()
    }

    /// Keys of every directive, in order
    #[must_use]
    pub fn directive_keys(&self) -> Vec<EntityKey> {
        self.mappings.iter().map(MappingDirective::key).collect()
    }

    /// Structural checks
    ///
    /// # Errors
    ///
    /// Blank ids, duplicate directives or references, and references without
    /// a directive.
    pub fn validate(&self) -> BundleResult<()> {
        let mut directives = HashSet::with_capacity(self.mappings.len());
        for (index, mapping) in self.mappings.iter().enumerate() {
            if mapping.src_id.is_empty() {
                return Err(BundleError::EmptyIdentifier {
                    what: "mapping",
                    index,
                });
            }
            if !directives.insert(mapping.key()) {
                return Err(BundleError::DuplicateDirective(mapping.key()));
            }
        }

        let mut references = HashSet::with_capacity(self.references.len());
        for (index, reference) in self.references.iter().enumerate() {
            if reference.id.is_empty() {
                return Err(BundleError::EmptyIdentifier {
                    what: "reference",
                    index,
                });
            }
            let key = reference.key();
            if !references.insert(key.clone()) {
                return Err(BundleError::DuplicateReference(key));
            }
            if !directives.contains(&key) {
                return Err(BundleError::ReferenceWithoutDirective(key));
            }
        }
        Ok(())
    }

    /// Whether any reference carries a sealed secret
    #[must_use]
    pub fn has_encrypted_secrets(&self) -> bool {
        self.references
            .iter()
            .any(|r| r.payload.secret.as_ref().is_some_and(|s| s.is_encrypted()))
    }

    /// Seal every clear secret with a key derived from `passphrase`
    pub fn seal_secrets(&mut self, passphrase: &str) -> SecretResult<()> {
        let salt = Salt::random();
        let key = SealingKey::derive(passphrase, &salt)?;
        for reference in &mut self.references {
            if let Some(secret) = &reference.payload.secret {
                reference.payload.secret = Some(key.seal(secret)?);
            }
        }
        self.secret_salt = Some(salt.to_base64());
        Ok(())
    }

    /// Open every sealed secret in place
    ///
    /// A bundle without sealed secrets is left untouched and needs no passphrase.
    pub fn open_secrets(&mut self, passphrase: Option<&str>) -> SecretResult<()> {
        if !self.has_encrypted_secrets() {
            return Ok(());
        }
        let passphrase = passphrase.ok_or(SecretError::MissingPassphrase)?;
        let salt = self.secret_salt.as_deref().ok_or(SecretError::MissingSalt)?;
        let key = SealingKey::derive(passphrase, &Salt::from_base64(salt)?)?;
        for reference in &mut self.references {
            if let Some(secret) = &reference.payload.secret {
                reference.payload.secret = Some(key.open(secret)?);
            }
        }
        Ok(())
    }
}
