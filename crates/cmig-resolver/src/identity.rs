//! Identity Table
//!
//! Maps `(type, source id)` to the target id an import resolved it to. Each
//! entry is written at most once per import. GUID rewrites are tracked next to
//! ids so GUID-selected body references can follow a renamed GUID.

use crate::error::{ResolveError, ResolveResult};
use cmig_model::{EntityId, EntityKey, EntityType};
use indexmap::IndexMap;

/// Source-to-target identity map for one import
#[derive(Debug, Default, Clone)]
pub struct IdentityTable {
    ids: IndexMap<EntityKey, EntityId>,
    guids: IndexMap<(EntityType, String), String>,
}

impl IdentityTable {
    /// Create new empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` resolved to `target`
    ///
    /// Re-recording the same target is a no-op.
    ///
    /// # Errors
    ///
    /// [`ResolveError::IdentityConflict`] when `key` already resolved elsewhere.
    pub fn record(&mut self, key: EntityKey, target: EntityId) -> ResolveResult<()> {
        match self.ids.get(&key) {
            Some(existing) if *existing == target => Ok(()),
            Some(existing) => Err(ResolveError::IdentityConflict {
                existing: existing.clone(),
                key,
                attempted: target,
            }),
            None => {
                self.ids.insert(key, target);
                Ok(())
            }
        }
    }

    /// Target id for `key`
    #[inline]
    #[must_use]
    pub fn resolve(&self, key: &EntityKey) -> Option<&EntityId> {
        self.ids.get(key)
    }

    /// Whether `key` has been resolved
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.ids.contains_key(key)
    }

    /// Record that source GUID `source` became `target`
    pub fn record_guid(&mut self, entity_type: EntityType, source: &str, target: &str) {
        self.guids
            .entry((entity_type, source.to_string()))
            .or_insert_with(|| target.to_string());
    }

    /// Target GUID for a source GUID
    #[must_use]
    pub fn resolve_guid(&self, entity_type: EntityType, source: &str) -> Option<&str> {
        self.guids
            .get(&(entity_type, source.to_string()))
            .map(String::as_str)
    }

    /// Number of resolved identities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing has been resolved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolved identities in resolution order
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &EntityId)> {
        self.ids.iter()
    }
}
