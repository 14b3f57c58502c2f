//! Dependency Graph Builder
//!
//! Walks the source store depth first from a root and produces a [`Bundle`]
//! whose directives list every dependency before its dependents.
//!
//! Visiting an entity emits its reference, then visits each unvisited direct
//! dependency, then emits its directive. A visited set keyed by `(type, id)`
//! stops recursion on cycles. Fixed entities are emitted as directives only.
//!
//! Usage:
//! ```rust,ignore
//! let export = DependencyGraphBuilder::new(&store, ExportOptions::default())
//!     .build(&RootSelector::policy("abc"))?;
//! export.verify()?;
//! let bundle = export.bundle;
//! ```

use crate::dag::DependencyDag;
use crate::discovery;
use crate::error::{GraphError, GraphResult};
use crate::options::{ExportOptions, RootSelector};
use cmig_model::{
    roles, well_known, Bundle, EntityId, EntityKey, EntityRef, EntityType, MapBy, MappingAction,
    MappingDirective, Secret,
};
use cmig_store::EntityReader;
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// Result of an export
#[derive(Debug)]
pub struct Export {
    /// The bundle
    pub bundle: Bundle,
    /// Every discovered dependency edge
    pub dag: DependencyDag,
}

impl Export {
    /// Check the directive order against the discovered edges
    pub fn verify(&self) -> GraphResult<()> {
        self.dag.verify_order(&self.bundle.directive_keys())
    }
}

/// Builder for dependency-ordered bundles
pub struct DependencyGraphBuilder<'s> {
    store: &'s dyn EntityReader,
    options: ExportOptions,
    include_owned_roles: bool,
    visited: HashSet<EntityKey>,
    bundle: Bundle,
    dag: DependencyDag,
}

impl<'s> DependencyGraphBuilder<'s> {
    /// Builder over a source store
    #[must_use]
    pub fn new(store: &'s dyn EntityReader, options: ExportOptions) -> Self {
        Self {
            store,
            options,
            include_owned_roles: false,
            visited: HashSet::new(),
            bundle: Bundle::new(),
            dag: DependencyDag::new(),
        }
    }

    /// Number of entities visited so far
    #[inline]
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Walk from `root` and assemble the bundle
    ///
    /// # Errors
    ///
    /// Missing root, store failures, and secret sealing failures.
    pub fn build(mut self, root: &RootSelector) -> GraphResult<Export> {
        let root = if self.options.all {
            RootSelector::All
        } else {
            root.clone()
        };
        self.include_owned_roles = self.options.owned_roles_included(&root);
        info!(%root, owned_roles = self.include_owned_roles, "export started");

        match &root {
            RootSelector::All => self.visit_all()?,
            RootSelector::Entity(key) => {
                if self.store.find(key)?.is_none() {
                    return Err(GraphError::RootNotFound(key.clone()));
                }
                if key.entity_type == EntityType::Folder {
                    self.visit_folder_root(key)?;
                } else {
                    self.visit(key)?;
                }
            }
        }

        if self.options.encrypt_secrets {
            let passphrase = self
                .options
                .passphrase
                .as_deref()
                .ok_or(GraphError::MissingPassphrase)?;
            self.bundle.seal_secrets(passphrase)?;
        }

        info!(
            references = self.bundle.references.len(),
            mappings = self.bundle.mappings.len(),
            nodes = self.dag.node_count(),
            edges = self.dag.edge_count(),
            "export complete"
        );
        Ok(Export {
            bundle: self.bundle,
            dag: self.dag,
        })
    }

    fn visit_all(&mut self) -> GraphResult<()> {
        for entity_type in EntityType::ALL {
            for entity in self.store.list(entity_type)? {
                if !self.include_owned_roles && roles::owner_of(&entity).is_some() {
                    continue;
                }
                self.visit(&entity.key())?;
            }
        }
        Ok(())
    }

    fn visit_folder_root(&mut self, key: &EntityKey) -> GraphResult<()> {
        match (self.options.include_request_folder, well_known::is_fixed(key)) {
            (true, true) => self.visit_requested_fixed(key)?,
            (true, false) | (false, true) => self.visit(key)?,
            (false, false) => {
                self.visited.insert(key.clone());
                self.dag.add_node(key);
                self.push_directive_only(key);
            }
        }
        self.visit_folder_contents(&key.id)
    }

    /// A fixed folder requested as the export root keeps its payload.
    /// Reached any other way it stays directive-only.
    fn visit_requested_fixed(&mut self, key: &EntityKey) -> GraphResult<()> {
        if !self.visited.insert(key.clone()) {
            return Ok(());
        }
        self.dag.add_node(key);
        let Some(entity) = self.store.find(key)? else {
            return Err(GraphError::RootNotFound(key.clone()));
        };
        let exported = self.export_payload(&entity);
        self.bundle.references.push(exported);
        self.bundle.mappings.push(MappingDirective::new(
            key.entity_type,
            key.id.clone(),
            MappingAction::NewOrExisting,
        ));
        Ok(())
    }

    fn visit_folder_contents(&mut self, folder_id: &EntityId) -> GraphResult<()> {
        for child in self.store.children(folder_id)? {
            self.visit(&child.key())?;
            if child.entity_type == EntityType::Folder {
                self.visit_folder_contents(&child.id)?;
            }
        }
        Ok(())
    }

    fn visit(&mut self, key: &EntityKey) -> GraphResult<()> {
        if !self.visited.insert(key.clone()) {
            return Ok(());
        }
        self.dag.add_node(key);

        if well_known::is_fixed(key) {
            self.push_directive_only(key);
            return Ok(());
        }

        let Some(entity) = self.store.find(key)? else {
            return Err(GraphError::RootNotFound(key.clone()));
        };
        let exported = self.export_payload(&entity);
        self.bundle.references.push(exported);

        for dependency in discovery::dependencies(self.store, &entity)? {
            self.dag.add_edge(&dependency.key, key)?;
            self.visit(&dependency.key)?;
        }

        let directive = self.directive_for(&entity);
        trace!(entity = %key, action = %directive.action, "directive emitted");
        self.bundle.mappings.push(directive);

        if self.include_owned_roles && entity.entity_type.owns_roles() {
            for role in self.store.owned_roles(key)? {
                self.visit(&role.key())?;
            }
        }
        Ok(())
    }

    fn push_directive_only(&mut self, key: &EntityKey) {
        debug!(entity = %key, "emitting directive without payload");
        self.bundle.mappings.push(MappingDirective::new(
            key.entity_type,
            key.id.clone(),
            MappingAction::NewOrExisting,
        ));
    }

    fn directive_for(&self, entity: &EntityRef) -> MappingDirective {
        let directive = MappingDirective::new(
            entity.entity_type,
            entity.id.clone(),
            self.options.default_action,
        );
        if roles::owner_of(entity).is_some() {
            directive.map_by(MapBy::RoleEntity)
        } else {
            directive
        }
    }

    fn export_payload(&self, entity: &EntityRef) -> EntityRef {
        let mut exported = entity.clone();
        if !self.options.encrypt_secrets {
            if let Some(Secret::Clear(_)) = exported.payload.secret {
                exported.payload.secret = Some(Secret::Redacted);
            }
        }
        exported
    }
}

/// Export `root` from `store` in one call
pub fn build(
    store: &dyn EntityReader,
    root: &RootSelector,
    options: ExportOptions,
) -> GraphResult<Export> {
    DependencyGraphBuilder::new(store, options).build(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmig_model::well_known::ROOT_FOLDER_ID;
    use cmig_store::MemoryStore;

    fn create_test_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(EntityRef::new(EntityType::Policy, "p1", "Auth").in_folder(ROOT_FOLDER_ID))
            .unwrap();
        store
    }

    #[test]
    fn test_missing_root_is_error() {
        let store = create_test_store();
        let result = build(&store, &RootSelector::policy("nope"), ExportOptions::default());
        assert!(matches!(result, Err(GraphError::RootNotFound(_))));
    }

    #[test]
    fn test_single_policy_export() {
        let store = create_test_store();
        let export = build(&store, &RootSelector::policy("p1"), ExportOptions::default()).unwrap();
        assert_eq!(export.bundle.references.len(), 1);
        assert_eq!(export.bundle.mappings.len(), 2);
        assert_eq!(export.bundle.mappings[0].src_id.as_str(), ROOT_FOLDER_ID);
        assert!(export.verify().is_ok());
    }

    #[test]
    fn test_default_action_is_applied_except_to_fixed() {
        let store = create_test_store();
        let options = ExportOptions::default().with_default_action(MappingAction::NewOrUpdate);
        let export = build(&store, &RootSelector::policy("p1"), options).unwrap();
        assert_eq!(export.bundle.mappings[0].action, MappingAction::NewOrExisting);
        assert_eq!(export.bundle.mappings[1].action, MappingAction::NewOrUpdate);
    }

    #[test]
    fn test_encrypt_without_passphrase_fails() {
        let store = create_test_store();
        let options = ExportOptions {
            encrypt_secrets: true,
            ..ExportOptions::default()
        };
        let result = build(&store, &RootSelector::policy("p1"), options);
        assert!(matches!(result, Err(GraphError::MissingPassphrase)));
    }

    #[test]
    fn test_builder_counts_visits() {
        let store = create_test_store();
        let mut builder = DependencyGraphBuilder::new(&store, ExportOptions::default());
        assert_eq!(builder.visited_count(), 0);
        builder.visit(&EntityKey::new(EntityType::Policy, "p1")).unwrap();
        assert_eq!(builder.visited_count(), 2);
    }
}
