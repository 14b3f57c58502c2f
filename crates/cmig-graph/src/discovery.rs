//! Direct dependencies of one entity
//!
//! Discovery order is security zone, then links in declaration order, then
//! body references in document order, then parent folder. References the
//! source store cannot resolve are skipped.

use cmig_model::references::{self, Selector};
use cmig_model::{EntityKey, EntityRef, EntityType, NaturalKey};
use cmig_store::{EntityReader, StoreResult};
use std::collections::HashSet;
use tracing::{trace, warn};

/// Where a dependency was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Embedded in the payload body
    Body,
    /// Structural link with this role
    Link(String),
    /// Security zone
    SecurityZone,
    /// Parent folder
    Folder,
}

/// A direct dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The entity depended upon
    pub key: EntityKey,
    /// Where it was found
    pub kind: DependencyKind,
}

/// Direct dependencies of `entity`, deduplicated, in discovery order
pub fn dependencies(store: &dyn EntityReader, entity: &EntityRef) -> StoreResult<Vec<Dependency>> {
    let own_key = entity.key();
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut push = |key: EntityKey, kind: DependencyKind| {
        if key != own_key && seen.insert(key.clone()) {
            trace!(from = %own_key, to = %key, ?kind, "dependency");
            found.push(Dependency { key, kind });
        }
    };

    if let Some(zone) = &entity.payload.security_zone_id {
        let key = EntityKey::new(EntityType::SecurityZone, zone.clone());
        if store.find(&key)?.is_some() {
            push(key, DependencyKind::SecurityZone);
        } else {
            warn!(entity = %own_key, zone = %zone, "security zone not found in source; skipped");
        }
    }

    for link in &entity.payload.links {
        if store.find(&link.target)?.is_some() {
            push(link.target.clone(), DependencyKind::Link(link.role.clone()));
        } else {
            warn!(entity = %own_key, target = %link.target, role = %link.role, "linked entity not found in source; skipped");
        }
    }

    if let Some(body) = &entity.payload.body {
        for reference in references::scan(body) {
            match resolve_body_reference(store, reference.entity_type, reference.selector, &reference.value)? {
                Some(key) => push(key, DependencyKind::Body),
                None => warn!(
                    entity = %own_key,
                    target = %reference.entity_type,
                    value = %reference.value,
                    "body reference not found in source; skipped"
                ),
            }
        }
    }

    if let Some(folder) = &entity.payload.folder_id {
        let key = EntityKey::new(EntityType::Folder, folder.clone());
        if store.find(&key)?.is_some() {
            push(key, DependencyKind::Folder);
        } else {
            warn!(entity = %own_key, folder = %folder, "parent folder not found in source; skipped");
        }
    }

    Ok(found)
}

fn resolve_body_reference(
    store: &dyn EntityReader,
    entity_type: EntityType,
    selector: Selector,
    value: &str,
) -> StoreResult<Option<EntityKey>> {
    let natural = match selector {
        Selector::Id => {
            let key = EntityKey::new(entity_type, value);
            return Ok(store.find(&key)?.map(|_| key));
        }
        Selector::Guid => NaturalKey::guid(entity_type, value),
        Selector::Name => NaturalKey::name(entity_type, None, value),
    };
    Ok(store
        .find_by_natural_key(&natural)?
        .into_iter()
        .next()
        .map(|e| e.key()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmig_model::well_known::ROOT_FOLDER_ID;
    use cmig_store::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_discovery_order() {
        let store = MemoryStore::new();
        store
            .insert(EntityRef::new(EntityType::SecurityZone, "z1", "DMZ"))
            .unwrap();
        store
            .insert(EntityRef::new(EntityType::ResourceDocument, "d1", "http://x/s.xsd"))
            .unwrap();
        store
            .insert(EntityRef::new(EntityType::SecurePassword, "pw1", "db"))
            .unwrap();

        let policy = EntityRef::new(EntityType::Policy, "p1", "Auth")
            .in_zone("z1")
            .in_folder(ROOT_FOLDER_ID)
            .with_link("password", EntityKey::new(EntityType::SecurePassword, "pw1"))
            .with_body(
                r#"<L7p:ResourceInfo><L7p:Id stringValue="http://x/s.xsd"/></L7p:ResourceInfo>
                   <L7p:GenericEntityId goidValue="missing"/>"#,
            );

        let deps = dependencies(&store, &policy).unwrap();
        let kinds: Vec<_> = deps.iter().map(|d| (d.key.entity_type, d.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (EntityType::SecurityZone, DependencyKind::SecurityZone),
                (EntityType::SecurePassword, DependencyKind::Link("password".into())),
                (EntityType::ResourceDocument, DependencyKind::Body),
                (EntityType::Folder, DependencyKind::Folder),
            ]
        );
    }

    #[test]
    fn test_self_reference_is_not_a_dependency() {
        let store = MemoryStore::new();
        let policy = EntityRef::new(EntityType::Policy, "p1", "Recursive")
            .with_guid("g1")
            .with_body(r#"<L7p:PolicyGuid stringValue="g1"/>"#);
        store.insert(policy.clone()).unwrap();
        assert!(dependencies(&store, &policy).unwrap().is_empty());
    }
}
