//! In-memory reference store
//!
//! [`MemoryStore`] keeps every entity in insertion order behind a
//! `parking_lot::RwLock`. Transactions take the writer mutex, work on a private
//! copy of the state and swap it in on commit, so readers never observe a
//! partial import and concurrent imports serialise.

use crate::error::{StoreError, StoreResult};
use crate::traits::{EntityReader, EntityStore, Revision, Transaction, TransactionalStore, WriteOptions};
use cmig_model::{roles, well_known, EntityId, EntityKey, EntityRef, EntityType, NaturalKey};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace};

/// An entity as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntity {
    /// The entity
    pub entity: EntityRef,
    /// Protected from update and delete
    #[serde(default)]
    pub read_only: bool,
    /// Revision state for versioned types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
}

/// Serialized form of a store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every stored entity, in store order
    pub entities: Vec<StoredEntity>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    records: IndexMap<EntityKey, StoredEntity>,
}

impl StoreState {
    fn seeded() -> Self {
        let mut state = Self::default();
        state.seed_fixed();
        state
    }

    fn seed_fixed(&mut self) {
        for entity in well_known::fixed_entities() {
            self.records.entry(entity.key()).or_insert(StoredEntity {
                entity,
                read_only: true,
                revision: None,
            });
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = Self::default();
        for stored in snapshot.entities {
            state.records.insert(stored.entity.key(), stored);
        }
        state.seed_fixed();
        state
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.records.values().cloned().collect(),
        }
    }

    fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.records.values().map(|s| &s.entity)
    }

    fn find(&self, key: &EntityKey) -> Option<EntityRef> {
        self.records.get(key).map(|s| s.entity.clone())
    }

    fn find_by_natural_key(&self, key: &NaturalKey) -> Vec<EntityRef> {
        self.entities().filter(|e| key.matches(e)).cloned().collect()
    }

    fn list(&self, entity_type: EntityType) -> Vec<EntityRef> {
        self.entities()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect()
    }

    fn children(&self, folder_id: &EntityId) -> Vec<EntityRef> {
        self.entities()
            .filter(|e| e.entity_type.is_folderable())
            .filter(|e| e.payload.folder_id.as_ref() == Some(folder_id))
            .filter(|e| !(e.entity_type == EntityType::Folder && &e.id == folder_id))
            .cloned()
            .collect()
    }

    fn owned_roles(&self, owner: &EntityKey) -> Vec<EntityRef> {
        self.entities()
            .filter(|e| roles::owner_of(e) == Some(owner))
            .cloned()
            .collect()
    }

    fn is_read_only(&self, key: &EntityKey) -> bool {
        self.records.get(key).is_some_and(|s| s.read_only)
    }

    fn revision(&self, key: &EntityKey) -> Option<Revision> {
        self.records.get(key).and_then(|s| s.revision.clone())
    }

    fn check_unique(&self, entity: &EntityRef) -> StoreResult<()> {
        for key in entity.natural_keys() {
            if let Some(holder) = self
                .entities()
                .find(|e| e.id != entity.id && key.matches(e))
            {
                return Err(StoreError::UniqueKeyViolation {
                    key,
                    existing: holder.id.clone(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<EntityId> {
        let mut entity = entity;
        if entity.id.is_empty() || self.records.contains_key(&entity.key()) {
            let fresh = EntityId::generate();
            trace!(preferred = %entity.id, assigned = %fresh, "preferred id unavailable");
            entity.id = fresh;
        }
        self.check_unique(&entity)?;

        let generated = roles::generate(&entity);
        for role in &generated {
            self.check_unique(role)?;
        }

        let revision = entity.entity_type.is_versioned().then(|| Revision {
            number: 1,
            active: options.activate,
            comment: options.version_comment.clone(),
        });
        let id = entity.id.clone();
        debug!(entity = %entity.key(), name = %entity.name, "created");
        self.records.insert(
            entity.key(),
            StoredEntity {
                entity,
                read_only: false,
                revision,
            },
        );
        for role in generated {
            trace!(role = %role.name, "generated role");
            self.records.insert(
                role.key(),
                StoredEntity {
                    entity: role,
                    read_only: false,
                    revision: None,
                },
            );
        }
        Ok(id)
    }

    fn replace(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<()> {
        let key = entity.key();
        let stored = self
            .records
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if stored.read_only {
            return Err(StoreError::ReadOnly(key));
        }
        self.check_unique(&entity)?;

        let revision = entity.entity_type.is_versioned().then(|| Revision {
            number: stored.revision.as_ref().map_or(1, |r| r.number + 1),
            active: options.activate,
            comment: options.version_comment.clone(),
        });
        debug!(entity = %key, "updated");
        self.records.insert(
            key,
            StoredEntity {
                entity,
                read_only: false,
                revision,
            },
        );
        Ok(())
    }

    fn remove(&mut self, key: &EntityKey) -> StoreResult<()> {
        let stored = self
            .records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if stored.read_only {
            return Err(StoreError::ReadOnly(key.clone()));
        }
        for role in self.owned_roles(key) {
            self.records.shift_remove(&role.key());
        }
        self.records.shift_remove(key);
        debug!(entity = %key, "deleted");
        Ok(())
    }
}

/// Thread-safe in-memory entity store
///
/// Seeded with the fixed entities, which are read-only.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    writer: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store holding only the fixed entities
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::seeded()),
            writer: Mutex::new(()),
        }
    }

    /// Store restored from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(StoreState::from_snapshot(snapshot)),
            writer: Mutex::new(()),
        }
    }

    /// Load a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write a JSON snapshot file
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Current committed state
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.read().snapshot()
    }

    /// Number of stored entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether the store holds nothing (never true for a seeded store)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Create directly, outside any transaction
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] while a transaction is open, plus the usual
    /// create failures.
    pub fn insert(&self, entity: EntityRef) -> StoreResult<EntityId> {
        let Some(_writer) = self.writer.try_lock() else {
            return Err(StoreError::Backend(
                "store is locked by an open transaction".to_string(),
            ));
        };
        self.state.write().insert(entity, &WriteOptions::activated())
    }
}

impl EntityReader for MemoryStore {
    fn find(&self, key: &EntityKey) -> StoreResult<Option<EntityRef>> {
        Ok(self.state.read().find(key))
    }

    fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Vec<EntityRef>> {
        Ok(self.state.read().find_by_natural_key(key))
    }

    fn list(&self, entity_type: EntityType) -> StoreResult<Vec<EntityRef>> {
        Ok(self.state.read().list(entity_type))
    }

    fn children(&self, folder_id: &EntityId) -> StoreResult<Vec<EntityRef>> {
        Ok(self.state.read().children(folder_id))
    }

    fn owned_roles(&self, owner: &EntityKey) -> StoreResult<Vec<EntityRef>> {
        Ok(self.state.read().owned_roles(owner))
    }

    fn is_read_only(&self, key: &EntityKey) -> StoreResult<bool> {
        Ok(self.state.read().is_read_only(key))
    }

    fn revision(&self, key: &EntityKey) -> StoreResult<Option<Revision>> {
        Ok(self.state.read().revision(key))
    }
}

impl EntityStore for MemoryStore {
    fn create(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<EntityId> {
        self.state.get_mut().insert(entity, options)
    }

    fn update(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<()> {
        self.state.get_mut().replace(entity, options)
    }

    fn delete(&mut self, key: &EntityKey) -> StoreResult<()> {
        self.state.get_mut().remove(key)
    }
}

impl TransactionalStore for MemoryStore {
    type Txn<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> StoreResult<MemoryTransaction<'_>> {
        let guard = self.writer.lock();
        let working = self.state.read().clone();
        debug!(entities = working.records.len(), "transaction opened");
        Ok(MemoryTransaction {
            store: self,
            working,
            finished: false,
            _writer: guard,
        })
    }
}

/// Open transaction on a [`MemoryStore`]
///
/// Dropped without [`Transaction::commit`], its changes are discarded.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    working: StoreState,
    finished: bool,
    _writer: MutexGuard<'a, ()>,
}

impl EntityReader for MemoryTransaction<'_> {
    fn find(&self, key: &EntityKey) -> StoreResult<Option<EntityRef>> {
        Ok(self.working.find(key))
    }

    fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Vec<EntityRef>> {
        Ok(self.working.find_by_natural_key(key))
    }

    fn list(&self, entity_type: EntityType) -> StoreResult<Vec<EntityRef>> {
        Ok(self.working.list(entity_type))
    }

    fn children(&self, folder_id: &EntityId) -> StoreResult<Vec<EntityRef>> {
        Ok(self.working.children(folder_id))
    }

    fn owned_roles(&self, owner: &EntityKey) -> StoreResult<Vec<EntityRef>> {
        Ok(self.working.owned_roles(owner))
    }

    fn is_read_only(&self, key: &EntityKey) -> StoreResult<bool> {
        Ok(self.working.is_read_only(key))
    }

    fn revision(&self, key: &EntityKey) -> StoreResult<Option<Revision>> {
        Ok(self.working.revision(key))
    }
}

impl EntityStore for MemoryTransaction<'_> {
    fn create(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<EntityId> {
        self.working.insert(entity, options)
    }

    fn update(&mut self, entity: EntityRef, options: &WriteOptions) -> StoreResult<()> {
        self.working.replace(entity, options)
    }

    fn delete(&mut self, key: &EntityKey) -> StoreResult<()> {
        self.working.remove(key)
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(mut self) -> StoreResult<()> {
        let working = std::mem::take(&mut self.working);
        *self.store.state.write() = working;
        self.finished = true;
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(mut self) {
        self.finished = true;
        debug!("transaction rolled back");
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("transaction dropped without commit; changes discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use cmig_model::well_known::{root_folder, ROOT_FOLDER_ID};
    use cmig_model::KeyKind;
    use pretty_assertions::assert_eq;

    fn create_test_policy(id: &str, name: &str) -> EntityRef {
        EntityRef::new(EntityType::Policy, id, name)
            .with_guid(format!("guid-{id}"))
            .in_folder(ROOT_FOLDER_ID)
    }

    #[test]
    fn test_new_store_is_seeded_read_only() {
        let store = MemoryStore::new();
        assert_eq!(store.len(), 2);
        assert!(store.is_read_only(&root_folder()).unwrap());
        assert!(store.find(&root_folder()).unwrap().is_some());
    }

    #[test]
    fn test_create_prefers_given_id() {
        let mut store = MemoryStore::new();
        let id = store
            .create(create_test_policy("p1", "Auth"), &WriteOptions::activated())
            .unwrap();
        assert_eq!(id.as_str(), "p1");
    }

    #[test]
    fn test_create_assigns_fresh_id_when_taken() {
        let mut store = MemoryStore::new();
        store
            .create(EntityRef::new(EntityType::ResourceDocument, "d1", "a.xsd"), &WriteOptions::default())
            .unwrap();
        let second = store
            .create(EntityRef::new(EntityType::ResourceDocument, "d1", "b.xsd"), &WriteOptions::default())
            .unwrap();
        assert_ne!(second.as_str(), "d1");
        assert_eq!(store.list(EntityType::ResourceDocument).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_name_violates_unique_key() {
        let mut store = MemoryStore::new();
        store
            .create(create_test_policy("p1", "Auth"), &WriteOptions::default())
            .unwrap();
        let err = store
            .create(create_test_policy("p2", "Auth"), &WriteOptions::default())
            .unwrap_err();
        assert_eq!(err.violated_key_kind(), Some(KeyKind::Name));
    }

    #[test]
    fn test_duplicate_guid_violates_unique_key() {
        let mut store = MemoryStore::new();
        store
            .create(create_test_policy("p1", "Auth"), &WriteOptions::default())
            .unwrap();
        let clash = EntityRef::new(EntityType::Policy, "p2", "Other").with_guid("guid-p1");
        let err = store.create(clash, &WriteOptions::default()).unwrap_err();
        assert_eq!(err.violated_key_kind(), Some(KeyKind::Guid));
    }

    #[test]
    fn test_policy_creation_generates_roles() {
        let mut store = MemoryStore::new();
        store
            .create(create_test_policy("p1", "Auth"), &WriteOptions::default())
            .unwrap();
        let owner = EntityKey::new(EntityType::Policy, "p1");
        let owned = store.owned_roles(&owner).unwrap();
        assert_eq!(owned.len(), 2);

        store.delete(&owner).unwrap();
        assert!(store.owned_roles(&owner).unwrap().is_empty());
        assert!(store.list(EntityType::Role).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_entities_reject_writes() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.delete(&root_folder()), Err(StoreError::ReadOnly(_))));
        let renamed = EntityRef::new(EntityType::Folder, ROOT_FOLDER_ID, "Renamed");
        assert!(matches!(
            store.update(renamed, &WriteOptions::default()),
            Err(StoreError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_update_bumps_revision() {
        let mut store = MemoryStore::new();
        store
            .create(create_test_policy("p1", "Auth"), &WriteOptions::activated())
            .unwrap();
        store
            .update(
                create_test_policy("p1", "Auth v2"),
                &WriteOptions::default().with_comment("imported"),
            )
            .unwrap();
        let revision = store
            .revision(&EntityKey::new(EntityType::Policy, "p1"))
            .unwrap()
            .unwrap();
        assert_eq!(
            revision,
            Revision {
                number: 2,
                active: false,
                comment: Some("imported".to_string()),
            }
        );
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut store = MemoryStore::new();
        let err = store
            .update(create_test_policy("nope", "X"), &WriteOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_transaction_commit_publishes() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.create(create_test_policy("p1", "Auth"), &WriteOptions::default())
            .unwrap();
        assert!(txn.find(&EntityKey::new(EntityType::Policy, "p1")).unwrap().is_some());
        txn.commit().unwrap();
        assert!(store.find(&EntityKey::new(EntityType::Policy, "p1")).unwrap().is_some());
    }

    #[test]
    fn test_transaction_drop_discards() {
        let store = MemoryStore::new();
        {
            let mut txn = store.begin().unwrap();
            txn.create(create_test_policy("p1", "Auth"), &WriteOptions::default())
                .unwrap();
        }
        assert_eq!(store.len(), 2);

        let mut txn = store.begin().unwrap();
        txn.create(create_test_policy("p2", "Other"), &WriteOptions::default())
            .unwrap();
        txn.rollback();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_insert_during_transaction_is_refused() {
        let store = MemoryStore::new();
        let txn = store.begin().unwrap();
        let err = store.insert(create_test_policy("p1", "Auth")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        txn.rollback();
        assert!(store.insert(create_test_policy("p1", "Auth")).is_ok());
    }

    #[test]
    fn test_children_of_folder() {
        let store = MemoryStore::new();
        store
            .insert(EntityRef::new(EntityType::Folder, "f1", "Shared").in_folder(ROOT_FOLDER_ID))
            .unwrap();
        store
            .insert(EntityRef::new(EntityType::Policy, "p1", "Auth").in_folder("f1"))
            .unwrap();
        let root_children = store.children(&EntityId::new(ROOT_FOLDER_ID)).unwrap();
        assert_eq!(root_children.len(), 1);
        assert_eq!(root_children[0].id.as_str(), "f1");
        assert_eq!(store.children(&EntityId::new("f1")).unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store.insert(create_test_policy("p1", "Auth")).unwrap();
        store.save(&path).unwrap();

        let restored = MemoryStore::load(&path).unwrap();
        assert_eq!(restored.snapshot().entities, store.snapshot().entities);
        assert!(restored.is_read_only(&root_folder()).unwrap());
    }
}
