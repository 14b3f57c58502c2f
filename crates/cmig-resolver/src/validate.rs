//! Per-directive checks run before resolution
//!
//! Structural problems reject the whole bundle (see [`Bundle::validate`]).
//! The checks here only disqualify single directives, which are then reported
//! as `InvalidResource` and never resolved. `Ignore` directives are never
//! resolved either and are skipped.

use cmig_model::{
    roles, Bundle, EntityId, EntityRef, EntityType, MapBy, MappingAction, MappingDirective,
};
use std::collections::HashMap;

/// Why `directive` cannot be resolved as given, if it cannot
#[must_use]
pub fn check(directive: &MappingDirective, source: Option<&EntityRef>) -> Option<String> {
    let properties = &directive.properties;
    let explicit_value = properties.map_to.is_some() || directive.target_id.is_some();
    match properties.map_by() {
        MapBy::Id => None,
        MapBy::Name if !explicit_value && source.is_none() => Some(format!(
            "MapBy name on {} has neither MapTo, targetId nor a reference to take the name from",
            directive.key()
        )),
        MapBy::Name => None,
        MapBy::Guid if !directive.entity_type.has_guid() => Some(format!(
            "MapBy guid is not supported for {}",
            directive.entity_type
        )),
        MapBy::Guid
            if !explicit_value && source.and_then(|s| s.payload.guid.as_ref()).is_none() =>
        {
            Some(format!("MapBy guid on {} has no GUID to look up", directive.key()))
        }
        MapBy::Guid => None,
        MapBy::RoleEntity if directive.entity_type != EntityType::Role => Some(format!(
            "MapBy roleEntity is only valid for ROLE, not {}",
            directive.entity_type
        )),
        MapBy::RoleEntity if source.and_then(roles::owner_of).is_none() => Some(format!(
            "MapBy roleEntity on {} needs a role reference with an owner",
            directive.key()
        )),
        MapBy::RoleEntity => None,
    }
}

/// Messages for every directive in `bundle` that cannot be resolved, by index
#[must_use]
pub fn flag_directives(bundle: &Bundle) -> HashMap<usize, String> {
    let references = bundle.reference_index();
    let mut flagged = HashMap::new();

    let resolvable = || {
        bundle
            .mappings
            .iter()
            .enumerate()
            .filter(|(_, d)| d.action != MappingAction::Ignore)
    };

    for (index, directive) in resolvable() {
        if let Some(message) = check(directive, references.get(&directive.key()).copied()) {
            flagged.insert(index, message);
        }
    }

    let mut claimed: HashMap<(EntityType, &EntityId), Vec<usize>> = HashMap::new();
    for (index, directive) in resolvable() {
        if directive.properties.map_by() != MapBy::Id {
            continue;
        }
        if let Some(target) = &directive.target_id {
            claimed
                .entry((directive.entity_type, target))
                .or_default()
                .push(index);
        }
    }
    for ((entity_type, target), indices) in claimed {
        if indices.len() < 2 {
            continue;
        }
        for index in indices {
            flagged.entry(index).or_insert_with(|| {
                format!("targetId {target} is claimed by more than one {entity_type} directive")
            });
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(entity_type: EntityType, id: &str) -> MappingDirective {
        MappingDirective::new(entity_type, id, MappingAction::NewOrExisting)
    }

    #[test]
    fn test_map_by_name_needs_a_value() {
        let d = directive(EntityType::Policy, "p").map_by(MapBy::Name);
        assert!(check(&d, None).is_some());
        assert!(check(&d.clone().map_to("Auth"), None).is_none());
        assert!(check(&d, Some(&EntityRef::new(EntityType::Policy, "p", "Auth"))).is_none());
    }

    #[test]
    fn test_map_by_guid_needs_guid_type() {
        let d = directive(EntityType::SecurityZone, "z").map_by(MapBy::Guid).map_to("g");
        assert!(check(&d, None).unwrap().contains("not supported"));
        let d = directive(EntityType::Policy, "p").map_by(MapBy::Guid);
        let source = EntityRef::new(EntityType::Policy, "p", "Auth").with_guid("g");
        assert!(check(&d, Some(&source)).is_none());
        assert!(check(&d, Some(&EntityRef::new(EntityType::Policy, "p", "Auth"))).is_some());
    }

    #[test]
    fn test_role_entity_needs_owned_role() {
        let d = directive(EntityType::Policy, "p").map_by(MapBy::RoleEntity);
        assert!(check(&d, None).is_some());
        let d = directive(EntityType::Role, "r").map_by(MapBy::RoleEntity);
        assert!(check(&d, Some(&EntityRef::new(EntityType::Role, "r", "Custom"))).is_some());
        let owner = EntityRef::new(EntityType::Policy, "p", "Auth");
        let role = roles::generate(&owner).remove(0);
        let d = directive(EntityType::Role, role.id.as_str()).map_by(MapBy::RoleEntity);
        assert!(check(&d, Some(&role)).is_none());
    }

    #[test]
    fn test_duplicate_target_ids_are_flagged() {
        let mut bundle = Bundle::new();
        bundle.mappings.push(directive(EntityType::Policy, "a").with_target("t"));
        bundle.mappings.push(directive(EntityType::Policy, "b").with_target("t"));
        bundle.mappings.push(directive(EntityType::Folder, "c").with_target("t"));
        let flagged = flag_directives(&bundle);
        assert_eq!(flagged.len(), 2);
        assert!(flagged.contains_key(&0) && flagged.contains_key(&1));
    }

    #[test]
    fn test_ignored_directives_are_not_flagged() {
        let mut bundle = Bundle::new();
        bundle.mappings.push(directive(EntityType::Policy, "a").with_target("t"));
        bundle.mappings.push(
            MappingDirective::new(EntityType::Policy, "b", MappingAction::Ignore).with_target("t"),
        );
        bundle.mappings.push(
            MappingDirective::new(EntityType::SecurityZone, "z", MappingAction::Ignore)
                .map_by(MapBy::Name),
        );
        assert!(flag_directives(&bundle).is_empty());
    }
}
