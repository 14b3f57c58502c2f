//! Auto-generated RBAC roles
//!
//! Creating a policy, folder, security zone, service or identity provider
//! generates a `Manage` and a `View` role owned by it. The roles link back to
//! their owner with [`OWNER_LINK`] and record their prefix as a property.

use crate::entity::{EntityId, EntityKey, EntityRef, EntityType};
use std::fmt;

/// Link role from a generated role to its owner
pub const OWNER_LINK: &str = "owner";

/// Property holding the role prefix
pub const PREFIX_PROPERTY: &str = "rolePrefix";

/// Generated role flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RolePrefix {
    /// Full control of the owner
    Manage,
    /// Read access to the owner
    View,
}

impl RolePrefix {
    /// Both prefixes, in generation order
    pub const ALL: [RolePrefix; 2] = [Self::Manage, Self::View];

    /// Property value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manage => "Manage",
            Self::View => "View",
        }
    }
}

impl fmt::Display for RolePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles generated for a newly created `owner`
///
/// Empty for types that do not own roles.
#[must_use]
pub fn generate(owner: &EntityRef) -> Vec<EntityRef> {
    if !owner.entity_type.owns_roles() {
        return Vec::new();
    }
    RolePrefix::ALL
        .iter()
        .map(|prefix| {
            let name = format!(
                "{prefix} {} {} (#{})",
                owner.name,
                owner.entity_type.label(),
                owner.id
            );
            EntityRef::new(EntityType::Role, EntityId::generate(), name)
                .with_link(OWNER_LINK, owner.key())
                .with_property(PREFIX_PROPERTY, prefix.as_str())
        })
        .collect()
}

/// Owner of a generated role
#[must_use]
pub fn owner_of(role: &EntityRef) -> Option<&EntityKey> {
    if role.entity_type != EntityType::Role {
        return None;
    }
    role.payload.link(OWNER_LINK)
}

/// Prefix of a generated role
#[must_use]
pub fn prefix_of(role: &EntityRef) -> Option<RolePrefix> {
    match role.payload.properties.get(PREFIX_PROPERTY).map(String::as_str) {
        Some("Manage") => Some(RolePrefix::Manage),
        Some("View") => Some(RolePrefix::View),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_generates_manage_and_view() {
        let policy = EntityRef::new(EntityType::Policy, "p1", "Auth");
        let roles = generate(&policy);
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "Manage Auth Policy (#p1)");
        assert_eq!(prefix_of(&roles[0]), Some(RolePrefix::Manage));
        assert_eq!(prefix_of(&roles[1]), Some(RolePrefix::View));
        assert_eq!(owner_of(&roles[1]), Some(&policy.key()));
    }

    #[test]
    fn test_documents_do_not_own_roles() {
        let doc = EntityRef::new(EntityType::ResourceDocument, "d1", "schema.xsd");
        assert!(generate(&doc).is_empty());
    }
}
