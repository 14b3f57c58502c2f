//! Mapping directives and their resolved outcomes
//!
//! A [`MappingDirective`] is the caller's instruction for one entity; a
//! [`ResolvedMapping`] is the same directive annotated with what the import
//! actually did ([`ActionTaken`]) or why it could not ([`ErrorType`]).

use crate::entity::{EntityId, EntityKey, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested reconciliation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingAction {
    /// Reuse a matching target entity, else create
    NewOrExisting,
    /// Overwrite a matching target entity, else create
    NewOrUpdate,
    /// Always create
    AlwaysCreateNew,
    /// Remove the matching target entity
    Delete,
    /// Do nothing
    Ignore,
}

impl MappingAction {
    /// Every action
    pub const ALL: [MappingAction; 5] = [
        Self::NewOrExisting,
        Self::NewOrUpdate,
        Self::AlwaysCreateNew,
        Self::Delete,
        Self::Ignore,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewOrExisting => "NewOrExisting",
            Self::NewOrUpdate => "NewOrUpdate",
            Self::AlwaysCreateNew => "AlwaysCreateNew",
            Self::Delete => "Delete",
            Self::Ignore => "Ignore",
        }
    }
}

impl Default for MappingAction {
    fn default() -> Self {
        Self::NewOrExisting
    }
}

impl fmt::Display for MappingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown mapping action: {s}"))
    }
}

/// How the target candidate is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapBy {
    /// By id (default)
    Id,
    /// By name
    Name,
    /// By GUID
    Guid,
    /// Auto-generated role, through its mapped owner
    RoleEntity,
}

/// Recognised directive properties
///
/// Unknown keys are rejected when a directive is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingProperties {
    /// Fail when no target candidate exists
    #[serde(rename = "FailOnNew", default, skip_serializing_if = "is_false")]
    pub fail_on_new: bool,
    /// Fail when a target candidate exists
    #[serde(rename = "FailOnExisting", default, skip_serializing_if = "is_false")]
    pub fail_on_existing: bool,
    /// Lookup strategy
    #[serde(rename = "MapBy", default, skip_serializing_if = "Option::is_none")]
    pub map_by: Option<MapBy>,
    /// Lookup value for name and GUID lookups
    #[serde(rename = "MapTo", default, skip_serializing_if = "Option::is_none")]
    pub map_to: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl MappingProperties {
    /// Whether no property is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Effective lookup strategy
    #[inline]
    #[must_use]
    pub fn map_by(&self) -> MapBy {
        self.map_by.unwrap_or(MapBy::Id)
    }
}

/// Per-entity reconciliation instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDirective {
    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Source id
    pub src_id: EntityId,
    /// Requested action
    pub action: MappingAction,
    /// Explicit target id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EntityId>,
    /// Directive properties
    #[serde(default, skip_serializing_if = "MappingProperties::is_empty")]
    pub properties: MappingProperties,
}

impl MappingDirective {
    /// Create a directive without target or properties
    #[must_use]
    pub fn new(entity_type: EntityType, src_id: impl Into<EntityId>, action: MappingAction) -> Self {
        Self {
            entity_type,
            src_id: src_id.into(),
            action,
            target_id: None,
            properties: MappingProperties::default(),
        }
    }

    /// With explicit target id
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<EntityId>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// With `FailOnNew`
    #[inline]
    #[must_use]
    pub fn fail_on_new(mut self) -> Self {
        self.properties.fail_on_new = true;
        self
    }

    /// With `FailOnExisting`
    #[inline]
    #[must_use]
    pub fn fail_on_existing(mut self) -> Self {
        self.properties.fail_on_existing = true;
        self
    }

    /// With `MapBy`
    #[inline]
    #[must_use]
    pub fn map_by(mut self, map_by: MapBy) -> Self {
        self.properties.map_by = Some(map_by);
        self
    }

    /// With `MapTo`
    #[inline]
    #[must_use]
    pub fn map_to(mut self, value: impl Into<String>) -> Self {
        self.properties.map_to = Some(value.into());
        self
    }

    /// `(type, srcId)` of the directive
    #[inline]
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.src_id.clone())
    }
}

/// Outcome actually applied to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTaken {
    /// A new target entity was created
    CreatedNew,
    /// An existing target entity was reused
    UsedExisting,
    /// An existing target entity was overwritten
    UpdatedExisting,
    /// The target entity was removed
    Deleted,
    /// Nothing was done
    Ignored,
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreatedNew => "CreatedNew",
            Self::UsedExisting => "UsedExisting",
            Self::UpdatedExisting => "UpdatedExisting",
            Self::Deleted => "Deleted",
            Self::Ignored => "Ignored",
        };
        f.write_str(s)
    }
}

/// Reconciliation conflict classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// No target candidate and `FailOnNew`, or nothing to create from
    TargetNotFound,
    /// Target candidate exists and `FailOnExisting`
    TargetExists,
    /// Create or update collides with a name key
    UniqueKeyConflict,
    /// Directive or lookup is not satisfiable as given
    InvalidResource,
    /// Target entity may not be modified
    TargetReadOnly,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TargetNotFound => "TargetNotFound",
            Self::TargetExists => "TargetExists",
            Self::UniqueKeyConflict => "UniqueKeyConflict",
            Self::InvalidResource => "InvalidResource",
            Self::TargetReadOnly => "TargetReadOnly",
        };
        f.write_str(s)
    }
}

/// A directive annotated with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMapping {
    /// The input directive; `target_id` holds the resolved target when known
    #[serde(flatten)]
    pub directive: MappingDirective,
    /// What was done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<ActionTaken>,
    /// Why nothing could be done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    /// Diagnostic for `error_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResolvedMapping {
    /// Successful outcome
    #[must_use]
    pub fn taken(
        mut directive: MappingDirective,
        action_taken: ActionTaken,
        target_id: Option<EntityId>,
    ) -> Self {
        if target_id.is_some() {
            directive.target_id = target_id;
        }
        Self {
            directive,
            action_taken: Some(action_taken),
            error_type: None,
            error_message: None,
        }
    }

    /// Failed outcome
    #[must_use]
    pub fn failed(directive: MappingDirective, error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            directive,
            action_taken: None,
            error_type: Some(error_type),
            error_message: Some(message.into()),
        }
    }

    /// Whether this mapping carries an error
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }

    /// Resolved target id
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> Option<&EntityId> {
        self.directive.target_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_directive_wire_format() {
        let directive = MappingDirective::new(EntityType::Policy, "abc", MappingAction::NewOrExisting)
            .fail_on_new()
            .map_by(MapBy::Name)
            .map_to("Auth");
        let json = serde_json::to_value(&directive).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "POLICY",
                "srcId": "abc",
                "action": "NewOrExisting",
                "properties": { "FailOnNew": true, "MapBy": "name", "MapTo": "Auth" }
            })
        );
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let json = r#"{"type":"POLICY","srcId":"a","action":"Ignore","properties":{"FailOnWhatever":true}}"#;
        assert!(serde_json::from_str::<MappingDirective>(json).is_err());
    }

    #[test]
    fn test_role_entity_map_by_name() {
        let json = r#"{"type":"ROLE","srcId":"r","action":"NewOrExisting","properties":{"MapBy":"roleEntity"}}"#;
        let directive: MappingDirective = serde_json::from_str(json).unwrap();
        assert_eq!(directive.properties.map_by(), MapBy::RoleEntity);
    }

    #[test]
    fn test_resolved_mapping_flattens_directive() {
        let directive = MappingDirective::new(EntityType::Folder, "f", MappingAction::NewOrExisting);
        let resolved = ResolvedMapping::taken(directive, ActionTaken::UsedExisting, Some("f".into()));
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["srcId"], "f");
        assert_eq!(json["targetId"], "f");
        assert_eq!(json["actionTaken"], "UsedExisting");
        assert!(json.get("errorType").is_none());

        let back: ResolvedMapping = serde_json::from_value(json).unwrap();
        assert_eq!(back, resolved);
    }

    #[test]
    fn test_action_parsing_is_case_insensitive() {
        assert_eq!("alwayscreatenew".parse::<MappingAction>(), Ok(MappingAction::AlwaysCreateNew));
        assert!("Merge".parse::<MappingAction>().is_err());
    }
}
