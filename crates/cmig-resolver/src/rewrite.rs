//! Reference rewriting through the Identity Table
//!
//! Before an entity is written to the target, every reference it holds
//! (parent folder, security zone, links, body references by id or GUID) is
//! translated from source to target identity. References to bundle entities
//! that have not been resolved yet are left as they are and reported as
//! pending, so the resolver can fix them up once the pass is complete.

use crate::identity::IdentityTable;
use cmig_model::references::{self, Selector};
use cmig_model::{Bundle, EntityId, EntityKey, EntityRef, EntityType};
use std::collections::{HashMap, HashSet};

/// Bundle identities used to tell forward references from foreign ones
#[derive(Debug, Default)]
pub struct BundleIndex {
    keys: HashSet<EntityKey>,
    guids: HashMap<(EntityType, String), EntityKey>,
}

impl BundleIndex {
    /// Index the directives and reference GUIDs of `bundle`
    #[must_use]
    pub fn new(bundle: &Bundle) -> Self {
        let keys = bundle.directive_keys().into_iter().collect();
        let guids = bundle
            .references
            .iter()
            .filter_map(|r| {
                r.payload
                    .guid
                    .as_ref()
                    .map(|g| ((r.entity_type, g.clone()), r.key()))
            })
            .collect();
        Self { keys, guids }
    }

    /// Whether `key` has a directive in the bundle
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.keys.contains(key)
    }

    /// Bundle entity carrying `guid`
    #[must_use]
    pub fn by_guid(&self, entity_type: EntityType, guid: &str) -> Option<&EntityKey> {
        self.guids.get(&(entity_type, guid.to_string()))
    }
}

/// An entity with its references translated
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// The translated entity; its own id is unchanged
    pub entity: EntityRef,
    /// Bundle entities referenced but not yet resolved
    pub pending: Vec<EntityKey>,
}

impl Rewritten {
    /// Whether every bundle reference was resolved
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Translate the references held by `source`
#[must_use]
pub fn rewrite(source: &EntityRef, identities: &IdentityTable, index: &BundleIndex) -> Rewritten {
    let mut entity = source.clone();
    let mut pending = Vec::new();

    {
        let mut map_id = |key: EntityKey| -> Option<EntityId> {
            match identities.resolve(&key) {
                Some(target) => Some(target.clone()),
                None => {
                    if index.contains(&key) && !pending.contains(&key) {
                        pending.push(key);
                    }
                    None
                }
            }
        };

        if let Some(folder) = &source.payload.folder_id {
            if let Some(target) = map_id(EntityKey::new(EntityType::Folder, folder.clone())) {
                entity.payload.folder_id = Some(target);
            }
        }
        if let Some(zone) = &source.payload.security_zone_id {
            if let Some(target) = map_id(EntityKey::new(EntityType::SecurityZone, zone.clone())) {
                entity.payload.security_zone_id = Some(target);
            }
        }
        for link in &mut entity.payload.links {
            if let Some(target) = map_id(link.target.clone()) {
                link.target.id = target;
            }
        }
        if let Some(body) = &source.payload.body {
            let rewritten = references::rewrite(body, |reference| match reference.selector {
                Selector::Id => map_id(EntityKey::new(reference.entity_type, reference.value.as_str()))
                    .map(|id| id.as_str().to_string()),
                Selector::Guid => match identities.resolve_guid(reference.entity_type, &reference.value) {
                    Some(target) => Some(target.to_string()),
                    None => {
                        if let Some(key) = index.by_guid(reference.entity_type, &reference.value) {
                            map_id(key.clone());
                        }
                        None
                    }
                },
                Selector::Name => None,
            });
            entity.payload.body = Some(rewritten);
        }
    }

    Rewritten { entity, pending }
}
