//! Target candidate lookup
//!
//! Candidate priority for one directive:
//! 1. explicit `targetId` (for name and GUID lookups it is the lookup value
//!    when `MapTo` is absent)
//! 2. `MapBy` name, GUID or owning entity
//! 3. a fixed entity, or a target entity with the source id
//! 4. no candidate

use crate::error::ResolveResult;
use crate::identity::IdentityTable;
use cmig_model::{roles, EntityKey, EntityRef, MapBy, MappingDirective, NaturalKey};
use cmig_store::EntityReader;
use tracing::trace;

/// Outcome of a candidate lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// The target entity to reconcile against
    Found(EntityRef),
    /// No target entity
    Absent,
    /// Lookup cannot pick one target
    Invalid(String),
}

impl Located {
    fn from_matches(mut matches: Vec<EntityRef>, lookup: &NaturalKey) -> Self {
        match matches.len() {
            0 => Self::Absent,
            1 => Self::Found(matches.remove(0)),
            n => Self::Invalid(format!("{lookup} matches {n} target entities")),
        }
    }
}

/// Find the target candidate for `directive`
///
/// `source` is the directive's bundle reference, if carried.
///
/// # Errors
///
/// Store failures.
pub fn locate<R: EntityReader + ?Sized>(
    store: &R,
    identities: &IdentityTable,
    directive: &MappingDirective,
    source: Option<&EntityRef>,
) -> ResolveResult<Located> {
    let entity_type = directive.entity_type;
    let properties = &directive.properties;
    let explicit = directive.target_id.as_ref().map(|id| id.as_str().to_string());
    let lookup_value = properties.map_to.clone().or(explicit);

    let located = match properties.map_by() {
        MapBy::Id => by_id(store, directive)?,
        MapBy::Name => {
            let Some(value) = lookup_value.or_else(|| source.map(|s| s.name.clone())) else {
                return Ok(Located::Invalid("MapBy name has no value to look up".into()));
            };
            let lookup = NaturalKey::name(entity_type, mapped_scope(identities, source), value);
            Located::from_matches(store.find_by_natural_key(&lookup)?, &lookup)
        }
        MapBy::Guid => {
            let Some(value) = lookup_value.or_else(|| source.and_then(|s| s.payload.guid.clone()))
            else {
                return Ok(Located::Invalid("MapBy guid has no value to look up".into()));
            };
            let lookup = NaturalKey::guid(entity_type, value);
            Located::from_matches(store.find_by_natural_key(&lookup)?, &lookup)
        }
        MapBy::RoleEntity => by_owner(store, identities, source)?,
    };
    trace!(directive = %directive.key(), ?located, "candidate lookup");
    Ok(located)
}

fn by_id<R: EntityReader + ?Sized>(store: &R, directive: &MappingDirective) -> ResolveResult<Located> {
    let key = match &directive.target_id {
        Some(target) => EntityKey::new(directive.entity_type, target.clone()),
        None => directive.key(),
    };
    Ok(store.find(&key)?.map_or(Located::Absent, Located::Found))
}

fn by_owner<R: EntityReader + ?Sized>(
    store: &R,
    identities: &IdentityTable,
    source: Option<&EntityRef>,
) -> ResolveResult<Located> {
    let Some(role) = source else {
        return Ok(Located::Invalid("MapBy roleEntity needs the role in the bundle".into()));
    };
    let (Some(owner), Some(prefix)) = (roles::owner_of(role), roles::prefix_of(role)) else {
        return Ok(Located::Invalid(format!("role {} has no owner", role.id)));
    };
    let target_owner = identities
        .resolve(owner)
        .map_or_else(|| owner.clone(), |id| EntityKey::new(owner.entity_type, id.clone()));

    let found = store
        .owned_roles(&target_owner)?
        .into_iter()
        .find(|candidate| roles::prefix_of(candidate) == Some(prefix));
    Ok(found.map_or(Located::Absent, Located::Found))
}

/// Scope of the source entity's name key, in target terms
fn mapped_scope(identities: &IdentityTable, source: Option<&EntityRef>) -> Option<String> {
    let source = source?;
    let scope = source.scope()?;
    let scope_key = match source.entity_type.scope_type() {
        Some(scope_type) => EntityKey::new(scope_type, scope),
        None => return Some(scope.to_string()),
    };
    Some(
        identities
            .resolve(&scope_key)
            .map_or_else(|| scope.to_string(), |id| id.as_str().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmig_model::well_known::{INTERNAL_PROVIDER_ID, ROOT_FOLDER_ID};
    use cmig_model::{EntityType, MappingAction, PROVIDER_LINK};
    use cmig_store::MemoryStore;

    fn directive(entity_type: EntityType, id: &str) -> MappingDirective {
        MappingDirective::new(entity_type, id, MappingAction::NewOrExisting)
    }

    #[test]
    fn test_fixed_entity_resolves_to_itself() {
        let store = MemoryStore::new();
        let located = locate(
            &store,
            &IdentityTable::new(),
            &directive(EntityType::Folder, ROOT_FOLDER_ID),
            None,
        )
        .unwrap();
        assert!(matches!(located, Located::Found(e) if e.id.as_str() == ROOT_FOLDER_ID));
    }

    #[test]
    fn test_explicit_target_wins_over_source_id() {
        let store = MemoryStore::new();
        store.insert(EntityRef::new(EntityType::Policy, "src", "A")).unwrap();
        let d = directive(EntityType::Policy, "src").with_target("elsewhere");
        let located = locate(&store, &IdentityTable::new(), &d, None).unwrap();
        assert_eq!(located, Located::Absent);
    }

    #[test]
    fn test_name_lookup_uses_target_id_as_value() {
        let store = MemoryStore::new();
        store.insert(EntityRef::new(EntityType::SecurityZone, "t1", "DMZ")).unwrap();
        let d = directive(EntityType::SecurityZone, "s1")
            .map_by(MapBy::Name)
            .with_target("DMZ");
        let located = locate(&store, &IdentityTable::new(), &d, None).unwrap();
        assert!(matches!(located, Located::Found(e) if e.id.as_str() == "t1"));
    }

    #[test]
    fn test_name_lookup_scope_is_mapped() {
        let store = MemoryStore::new();
        store
            .insert(EntityRef::new(EntityType::IdentityProvider, "ldap-t", "LDAP"))
            .unwrap();
        let user = |id: &str, provider: &str| {
            EntityRef::new(EntityType::User, id, "alice")
                .with_link(PROVIDER_LINK, EntityKey::new(EntityType::IdentityProvider, provider))
        };
        store.insert(user("u-internal", INTERNAL_PROVIDER_ID)).unwrap();
        store.insert(user("u-ldap", "ldap-t")).unwrap();

        let mut identities = IdentityTable::new();
        identities
            .record(EntityKey::new(EntityType::IdentityProvider, "ldap-s"), "ldap-t".into())
            .unwrap();
        let source = user("u-src", "ldap-s");
        let d = directive(EntityType::User, "u-src").map_by(MapBy::Name);
        let located = locate(&store, &identities, &d, Some(&source)).unwrap();
        assert!(matches!(located, Located::Found(e) if e.id.as_str() == "u-ldap"));
    }

    #[test]
    fn test_ambiguous_name_is_invalid() {
        let store = MemoryStore::new();
        store.insert(EntityRef::new(EntityType::Service, "s1", "Echo")).unwrap();
        store.insert(EntityRef::new(EntityType::Service, "s2", "Echo")).unwrap();
        let d = directive(EntityType::Service, "src").map_by(MapBy::Name).map_to("Echo");
        let located = locate(&store, &IdentityTable::new(), &d, None).unwrap();
        assert!(matches!(located, Located::Invalid(_)));
    }

    #[test]
    fn test_role_found_through_mapped_owner() {
        let store = MemoryStore::new();
        store.insert(EntityRef::new(EntityType::Policy, "p-target", "Auth")).unwrap();
        let source_owner = EntityRef::new(EntityType::Policy, "p-src", "Auth");
        let source_role = roles::generate(&source_owner).remove(1);

        let mut identities = IdentityTable::new();
        identities.record(source_owner.key(), "p-target".into()).unwrap();
        let d = directive(EntityType::Role, source_role.id.as_str()).map_by(MapBy::RoleEntity);
        let located = locate(&store, &identities, &d, Some(&source_role)).unwrap();
        match located {
            Located::Found(role) => {
                assert_eq!(roles::prefix_of(&role), roles::prefix_of(&source_role));
                assert_eq!(roles::owner_of(&role).unwrap().id.as_str(), "p-target");
            }
            other => panic!("expected a role, got {other:?}"),
        }
    }
}
