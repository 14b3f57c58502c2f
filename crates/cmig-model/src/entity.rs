//! Entity identity and payload types
//!
//! # Core Concepts
//!
//! - [`EntityType`]: the closed enumeration of migratable configuration types
//! - [`EntityKey`]: `(type, id)`, the identity of one entity within one system
//! - [`EntityRef`]: an entity as carried in a bundle, with its opaque [`Payload`]
//! - [`NaturalKey`]: a uniqueness constraint other than the id (name or GUID)

use crate::secret::Secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Migratable entity types
///
/// Declaration order is the walk order of a whole-store export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Folder in the policy/service tree
    Folder,
    /// Security zone
    SecurityZone,
    /// Identity provider
    IdentityProvider,
    /// User within an identity provider
    User,
    /// Group within an identity provider
    Group,
    /// RBAC role
    Role,
    /// Interface tag
    InterfaceTag,
    /// Cluster-wide property
    ClusterProperty,
    /// Stored password
    SecurePassword,
    /// Private key (alias within a keystore)
    PrivateKey,
    /// Trusted certificate
    TrustedCertificate,
    /// Revocation checking policy
    RevocationCheckPolicy,
    /// Resource document (schema, DTD, ...)
    ResourceDocument,
    /// JDBC connection
    JdbcConnection,
    /// JMS destination
    JmsDestination,
    /// Listen port
    ListenPort,
    /// Generic entity
    GenericEntity,
    /// Policy (fragment, global or include)
    Policy,
    /// Encapsulated assertion backed by a policy
    EncapsulatedAssertion,
    /// Published service
    Service,
    /// Alias of a policy in another folder
    PolicyAlias,
    /// Alias of a service in another folder
    ServiceAlias,
}

impl EntityType {
    /// Every type, in declaration order
    pub const ALL: [EntityType; 22] = [
        Self::Folder,
        Self::SecurityZone,
        Self::IdentityProvider,
        Self::User,
        Self::Group,
        Self::Role,
        Self::InterfaceTag,
        Self::ClusterProperty,
        Self::SecurePassword,
        Self::PrivateKey,
        Self::TrustedCertificate,
        Self::RevocationCheckPolicy,
        Self::ResourceDocument,
        Self::JdbcConnection,
        Self::JmsDestination,
        Self::ListenPort,
        Self::GenericEntity,
        Self::Policy,
        Self::EncapsulatedAssertion,
        Self::Service,
        Self::PolicyAlias,
        Self::ServiceAlias,
    ];

    /// Wire name (`POLICY`, `SECURITY_ZONE`, ...)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::SecurityZone => "SECURITY_ZONE",
            Self::IdentityProvider => "IDENTITY_PROVIDER",
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::Role => "ROLE",
            Self::InterfaceTag => "INTERFACE_TAG",
            Self::ClusterProperty => "CLUSTER_PROPERTY",
            Self::SecurePassword => "SECURE_PASSWORD",
            Self::PrivateKey => "PRIVATE_KEY",
            Self::TrustedCertificate => "TRUSTED_CERTIFICATE",
            Self::RevocationCheckPolicy => "REVOCATION_CHECK_POLICY",
            Self::ResourceDocument => "RESOURCE_DOCUMENT",
            Self::JdbcConnection => "JDBC_CONNECTION",
            Self::JmsDestination => "JMS_DESTINATION",
            Self::ListenPort => "LISTEN_PORT",
            Self::GenericEntity => "GENERIC_ENTITY",
            Self::Policy => "POLICY",
            Self::EncapsulatedAssertion => "ENCAPSULATED_ASSERTION",
            Self::Service => "SERVICE",
            Self::PolicyAlias => "POLICY_ALIAS",
            Self::ServiceAlias => "SERVICE_ALIAS",
        }
    }

    /// Human label used in generated role names
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Folder => "Folder",
            Self::SecurityZone => "Security Zone",
            Self::IdentityProvider => "Identity Provider",
            Self::Policy => "Policy",
            Self::Service => "Service",
            _ => self.as_str(),
        }
    }

    /// Whether entities of this type carry a GUID natural key
    #[inline]
    #[must_use]
    pub fn has_guid(self) -> bool {
        matches!(self, Self::Policy | Self::EncapsulatedAssertion)
    }

    /// Whether entity names must be unique (within [`EntityType::scope_type`] if scoped)
    #[inline]
    #[must_use]
    pub fn has_unique_name(self) -> bool {
        !matches!(self, Self::Service | Self::PolicyAlias | Self::ServiceAlias)
    }

    /// Whether entities of this type live in a folder
    #[inline]
    #[must_use]
    pub fn is_folderable(self) -> bool {
        matches!(
            self,
            Self::Folder | Self::Policy | Self::Service | Self::PolicyAlias | Self::ServiceAlias
        )
    }

    /// Whether creating an entity of this type generates `Manage`/`View` roles
    #[inline]
    #[must_use]
    pub fn owns_roles(self) -> bool {
        matches!(
            self,
            Self::Policy | Self::Folder | Self::SecurityZone | Self::Service | Self::IdentityProvider
        )
    }

    /// Whether this type carries activation state and revisions
    #[inline]
    #[must_use]
    pub fn is_versioned(self) -> bool {
        matches!(self, Self::Policy | Self::Service)
    }

    /// The entity type whose id scopes this type's name key, if any
    ///
    /// Folder names are unique per parent folder, user and group names per
    /// identity provider. Private key aliases are scoped by keystore, which
    /// is not a migratable entity and so is not returned here.
    #[must_use]
    pub fn scope_type(self) -> Option<EntityType> {
        match self {
            Self::Folder => Some(Self::Folder),
            Self::User | Self::Group => Some(Self::IdentityProvider),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("unknown entity type: {s}"))
    }
}

/// Opaque entity identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh 32-hex-digit identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// `(type, id)` identity of an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Entity id
    pub id: EntityId,
}

impl EntityKey {
    /// Create a key
    #[inline]
    #[must_use]
    pub fn new(entity_type: EntityType, id: impl Into<EntityId>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Typed structural reference from one entity to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// What the link means to its holder (`policy`, `provider`, `owner`, ...)
    pub role: String,
    /// The referenced entity
    pub target: EntityKey,
}

/// Link role naming a user's or group's identity provider
pub const PROVIDER_LINK: &str = "provider";

/// Property naming a private key's keystore
pub const KEYSTORE_PROPERTY: &str = "keystoreId";

/// Type-specific entity content
///
/// Opaque to reconciliation apart from the fields that carry references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// GUID natural key (policies, encapsulated assertions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// Parent folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<EntityId>,
    /// Security zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_zone_id: Option<EntityId>,
    /// Structural references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Free-form attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Opaque text such as policy XML
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Secret-bearing material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Secret>,
}

impl Payload {
    /// First link with the given role
    #[must_use]
    pub fn link(&self, role: &str) -> Option<&EntityKey> {
        self.links.iter().find(|l| l.role == role).map(|l| &l.target)
    }
}

/// An entity as exported into a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Source id
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Content
    #[serde(default)]
    pub payload: Payload,
}

impl EntityRef {
    /// Create an entity with an empty payload
    #[must_use]
    pub fn new(entity_type: EntityType, id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
            name: name.into(),
            payload: Payload::default(),
        }
    }

    /// With GUID
    #[inline]
    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.payload.guid = Some(guid.into());
        self
    }

    /// In folder
    #[inline]
    #[must_use]
    pub fn in_folder(mut self, folder_id: impl Into<EntityId>) -> Self {
        self.payload.folder_id = Some(folder_id.into());
        self
    }

    /// In security zone
    #[inline]
    #[must_use]
    pub fn in_zone(mut self, zone_id: impl Into<EntityId>) -> Self {
        self.payload.security_zone_id = Some(zone_id.into());
        self
    }

    /// With a structural link
    #[inline]
    #[must_use]
    pub fn with_link(mut self, role: impl Into<String>, target: EntityKey) -> Self {
        self.payload.links.push(Link {
            role: role.into(),
            target,
        });
        self
    }

    /// With a property
    #[inline]
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.properties.insert(key.into(), value.into());
        self
    }

    /// With body text
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.payload.body = Some(body.into());
        self
    }

    /// With secret material
    #[inline]
    #[must_use]
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.payload.secret = Some(secret);
        self
    }

    /// `(type, id)` of this entity
    #[inline]
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.id.clone())
    }

    /// Raw value of the scope that qualifies this entity's name key
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self.entity_type {
            EntityType::Folder => self.payload.folder_id.as_ref().map(EntityId::as_str),
            EntityType::User | EntityType::Group => {
                self.payload.link(PROVIDER_LINK).map(|k| k.id.as_str())
            }
            EntityType::PrivateKey => self.payload.properties.get(KEYSTORE_PROPERTY).map(String::as_str),
            _ => None,
        }
    }

    /// Unique natural keys this entity occupies
    #[must_use]
    pub fn natural_keys(&self) -> Vec<NaturalKey> {
        let mut keys = Vec::with_capacity(2);
        if self.entity_type.has_unique_name() {
            keys.push(NaturalKey::name(
                self.entity_type,
                self.scope().map(str::to_string),
                self.name.clone(),
            ));
        }
        if self.entity_type.has_guid() {
            if let Some(guid) = &self.payload.guid {
                keys.push(NaturalKey::guid(self.entity_type, guid.clone()));
            }
        }
        keys
    }
}

/// Natural key flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyKind {
    /// Name, optionally scoped
    Name,
    /// GUID
    Guid,
}

/// Uniqueness constraint other than the id
///
/// A `None` scope in a lookup matches entities in any scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Entity type
    pub entity_type: EntityType,
    /// Key flavour
    pub kind: KeyKind,
    /// Scope qualifier (parent folder, provider, keystore)
    pub scope: Option<String>,
    /// Key value
    pub value: String,
}

impl NaturalKey {
    /// Name key
    #[must_use]
    pub fn name(entity_type: EntityType, scope: Option<String>, value: impl Into<String>) -> Self {
        Self {
            entity_type,
            kind: KeyKind::Name,
            scope,
            value: value.into(),
        }
    }

    /// GUID key
    #[must_use]
    pub fn guid(entity_type: EntityType, value: impl Into<String>) -> Self {
        Self {
            entity_type,
            kind: KeyKind::Guid,
            scope: None,
            value: value.into(),
        }
    }

    /// Whether `entity` occupies this key
    #[must_use]
    pub fn matches(&self, entity: &EntityRef) -> bool {
        if entity.entity_type != self.entity_type {
            return false;
        }
        match self.kind {
            KeyKind::Name => {
                entity.name == self.value
                    && self
                        .scope
                        .as_deref()
                        .map_or(true, |scope| entity.scope() == Some(scope))
            }
            KeyKind::Guid => entity.payload.guid.as_deref() == Some(self.value.as_str()),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            KeyKind::Name => "name",
            KeyKind::Guid => "guid",
        };
        match &self.scope {
            Some(scope) => write!(f, "{} {kind} '{}' in {scope}", self.entity_type, self.value),
            None => write!(f, "{} {kind} '{}'", self.entity_type, self.value),
        }
    }
}
