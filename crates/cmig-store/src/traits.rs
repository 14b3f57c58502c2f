//! Store adapter interface
//!
//! # Core Concepts
//!
//! - [`EntityReader`]: lookups used by export and by target-candidate search
//! - [`EntityStore`]: writes applied by the resolver
//! - [`TransactionalStore`] / [`Transaction`]: one import is one transaction;
//!   dropping a transaction without committing rolls it back

use crate::error::StoreResult;
use cmig_model::{EntityId, EntityKey, EntityRef, EntityType, NaturalKey};
use serde::{Deserialize, Serialize};

/// Options applied to versioned entities on create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Make the written revision active
    pub activate: bool,
    /// Comment attached to the written revision
    pub version_comment: Option<String>,
}

impl WriteOptions {
    /// Active revisions without comment
    #[inline]
    #[must_use]
    pub fn activated() -> Self {
        Self {
            activate: true,
            version_comment: None,
        }
    }

    /// With version comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.version_comment = Some(comment.into());
        self
    }
}

/// Revision state of a versioned entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// 1-based revision number
    pub number: u32,
    /// Whether the latest revision is active
    pub active: bool,
    /// Comment of the latest revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Read access to entities
pub trait EntityReader {
    /// Entity by `(type, id)`
    fn find(&self, key: &EntityKey) -> StoreResult<Option<EntityRef>>;

    /// Entities occupying a natural key; a `None` scope matches any scope
    fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Vec<EntityRef>>;

    /// All entities of a type, in store order
    fn list(&self, entity_type: EntityType) -> StoreResult<Vec<EntityRef>>;

    /// Entities whose parent folder is `folder_id`
    fn children(&self, folder_id: &EntityId) -> StoreResult<Vec<EntityRef>>;

    /// Roles generated for `owner`
    fn owned_roles(&self, owner: &EntityKey) -> StoreResult<Vec<EntityRef>>;

    /// Whether the entity may not be modified
    fn is_read_only(&self, key: &EntityKey) -> StoreResult<bool>;

    /// Revision state of a versioned entity
    fn revision(&self, key: &EntityKey) -> StoreResult<Option<Revision>>;
}

/// Write access to entities
pub trait EntityStore: EntityReader {
    /// Create `entity`, preferring its id; returns the id actually assigned
    ///
    /// A fresh id is assigned when the preferred one is taken. Types that own
    /// roles get their generated roles in the same call.
    fn create(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<EntityId>;

    /// Replace the entity with `entity.id`
    fn update(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<()>;

    /// Remove an entity and the roles it owns
    fn delete(&mut self, key: &EntityKey) -> StoreResult<()>;
}

/// A unit of work over a [`TransactionalStore`]
pub trait Transaction: EntityStore {
    /// Publish every change
    fn commit(self) -> StoreResult<()>
    where
        Self: Sized;

    /// Discard every change
    fn rollback(self)
    where
        Self: Sized;
}

/// A store that can open transactions
pub trait TransactionalStore: EntityReader {
    /// Transaction type
    type Txn<'a>: Transaction
    where
        Self: 'a;

    /// Open a transaction
    fn begin(&self) -> StoreResult<Self::Txn<'_>>;
}
