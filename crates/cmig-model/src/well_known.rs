//! Entities that exist on every system under the same id
//!
//! Fixed entities may appear in a bundle with a directive but no payload and
//! always resolve to themselves. They are never modified by an import.

use crate::entity::{EntityKey, EntityRef, EntityType};

/// Root of the folder tree
pub const ROOT_FOLDER_ID: &str = "0000000000000000ffffffffffffec76";

/// Built-in internal identity provider
pub const INTERNAL_PROVIDER_ID: &str = "0000000000000000fffffffffffffffe";

/// Key of the root folder
#[must_use]
pub fn root_folder() -> EntityKey {
    EntityKey::new(EntityType::Folder, ROOT_FOLDER_ID)
}

/// Key of the internal identity provider
#[must_use]
pub fn internal_provider() -> EntityKey {
    EntityKey::new(EntityType::IdentityProvider, INTERNAL_PROVIDER_ID)
}

/// Whether `key` names a fixed entity
#[must_use]
pub fn is_fixed(key: &EntityKey) -> bool {
    matches!(
        (key.entity_type, key.id.as_str()),
        (EntityType::Folder, ROOT_FOLDER_ID) | (EntityType::IdentityProvider, INTERNAL_PROVIDER_ID)
    )
}

/// Entities every store is seeded with
#[must_use]
pub fn fixed_entities() -> Vec<EntityRef> {
    vec![
        EntityRef::new(EntityType::Folder, ROOT_FOLDER_ID, "Root Node"),
        EntityRef::new(
            EntityType::IdentityProvider,
            INTERNAL_PROVIDER_ID,
            "Internal Identity Provider",
        ),
    ]
}
