//! Mapping Resolver
//!
//! Walks a bundle's directives strictly in order and reconciles each one
//! against the target store:
//!
//! 1. structural validation of the bundle (fails the whole import)
//! 2. per-directive checks (`InvalidResource`, not resolved further)
//! 3. one pass: locate candidate, apply the action algebra, rewrite
//!    references, write, record the identity
//! 4. if nothing failed, a fix-up pass rewrites entities that referenced bundle
//!    entities resolved after them
//!
//! Usage:
//! ```rust,ignore
//! let mut txn = store.begin()?;
//! let resolution = MappingResolver::new(&mut txn, WriteOptions::activated()).resolve(&bundle)?;
//! if resolution.has_errors() { txn.rollback() } else { txn.commit()? }
//! ```

use crate::algebra::{self, Decision};
use crate::error::ResolveResult;
use crate::identity::IdentityTable;
use crate::locate::{self, Located};
use crate::rewrite::{self, BundleIndex};
use crate::validate;
use cmig_model::{
    ActionTaken, Bundle, EntityId, EntityKey, EntityRef, ErrorType, KeyKind, MapBy, MappingAction,
    MappingDirective, ResolvedMapping,
};
use cmig_store::{EntityStore, StoreError, WriteOptions};
use tracing::{debug, info, warn};

/// Result of resolving one bundle
#[derive(Debug, Clone)]
pub struct Resolution {
    /// One outcome per directive, in directive order
    pub mappings: Vec<ResolvedMapping>,
    /// Identities resolved during the pass
    pub identities: IdentityTable,
    /// Entities rewritten by the fix-up pass
    pub fixed_up: usize,
}

impl Resolution {
    /// Whether any directive failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.mappings.iter().any(ResolvedMapping::is_error)
    }
}

/// An entity written with references still pointing at source identities
#[derive(Debug)]
struct Deferred {
    source: EntityRef,
    target_id: EntityId,
    guid: Option<String>,
}

/// Import-side resolver over a writable store
pub struct MappingResolver<'s, S: EntityStore + ?Sized> {
    store: &'s mut S,
    options: WriteOptions,
    identities: IdentityTable,
    deferred: Vec<Deferred>,
}

impl<'s, S: EntityStore + ?Sized> MappingResolver<'s, S> {
    /// Resolver writing to `store` with `options`
    #[must_use]
    pub fn new(store: &'s mut S, options: WriteOptions) -> Self {
        Self {
            store,
            options,
            identities: IdentityTable::new(),
            deferred: Vec::new(),
        }
    }

    /// Resolve every directive of `bundle`
    ///
    /// # Errors
    ///
    /// Structural bundle errors and store failures other than reconciliation
    /// conflicts. Conflicts are reported on the returned mappings.
    pub fn resolve(mut self, bundle: &Bundle) -> ResolveResult<Resolution> {
        bundle.validate()?;
        let flagged = validate::flag_directives(bundle);
        let references = bundle.reference_index();
        let index = BundleIndex::new(bundle);
        info!(
            directives = bundle.mappings.len(),
            references = bundle.references.len(),
            flagged = flagged.len(),
            "resolving bundle"
        );

        let mut mappings = Vec::with_capacity(bundle.mappings.len());
        for (position, directive) in bundle.mappings.iter().enumerate() {
            let resolved = if directive.action == MappingAction::Ignore {
                self.ignore(directive)?
            } else if let Some(message) = flagged.get(&position) {
                ResolvedMapping::failed(directive.clone(), ErrorType::InvalidResource, message.clone())
            } else {
                let source = references.get(&directive.key()).copied();
                self.resolve_one(directive, source, &index)?
            };
            match (&resolved.action_taken, &resolved.error_type) {
                (Some(action), _) => debug!(
                    entity = %directive.key(),
                    requested = %directive.action,
                    taken = %action,
                    target = ?resolved.target_id().map(EntityId::as_str),
                    "resolved"
                ),
                (None, Some(error)) => debug!(
                    entity = %directive.key(),
                    requested = %directive.action,
                    %error,
                    message = resolved.error_message.as_deref().unwrap_or_default(),
                    "conflict"
                ),
                (None, None) => {}
            }
            mappings.push(resolved);
        }

        let failed = mappings.iter().filter(|m| m.is_error()).count();
        let fixed_up = if failed == 0 {
            self.fix_up(&index)?
        } else {
            warn!(failed, "conflicts found; skipping reference fix-up");
            0
        };
        info!(resolved = mappings.len() - failed, failed, fixed_up, "bundle resolved");

        Ok(Resolution {
            mappings,
            identities: self.identities,
            fixed_up,
        })
    }

    fn resolve_one(
        &mut self,
        directive: &MappingDirective,
        source: Option<&EntityRef>,
        index: &BundleIndex,
    ) -> ResolveResult<ResolvedMapping> {
        let candidate = match locate::locate(&*self.store, &self.identities, directive, source)? {
            Located::Found(entity) => Some(entity),
            Located::Absent => None,
            Located::Invalid(message) => {
                return Ok(ResolvedMapping::failed(
                    directive.clone(),
                    ErrorType::InvalidResource,
                    message,
                ))
            }
        };

        let decision = algebra::decide(directive.action, candidate.is_some(), &directive.properties);
        match (decision, candidate) {
            (Decision::Fail(error_type), candidate) => {
                let message = match (error_type, &candidate) {
                    (ErrorType::TargetExists, Some(existing)) => format!(
                        "Target entity {} already exists for {}",
                        existing.key(),
                        directive.key()
                    ),
                    _ => format!("Could not locate entity {}", directive.key()),
                };
                Ok(ResolvedMapping::failed(directive.clone(), error_type, message))
            }
            (Decision::UseExisting, Some(existing)) => {
                self.record(directive, source, &existing)?;
                Ok(ResolvedMapping::taken(
                    directive.clone(),
                    ActionTaken::UsedExisting,
                    Some(existing.id),
                ))
            }
            (Decision::Update, Some(existing)) => self.update(directive, source, existing, index),
            (Decision::Create, candidate) => self.create(directive, source, candidate.as_ref(), index),
            (Decision::Delete, Some(existing)) => {
                if let Err(err) = self.store.delete(&existing.key()) {
                    return conflict(directive, err);
                }
                self.identities.record(directive.key(), existing.id.clone())?;
                Ok(ResolvedMapping::taken(
                    directive.clone(),
                    ActionTaken::Deleted,
                    Some(existing.id),
                ))
            }
            (Decision::Ignore, _) => self.ignore(directive),
            (decision, None) => Ok(ResolvedMapping::failed(
                directive.clone(),
                ErrorType::TargetNotFound,
                format!("Could not locate entity {} to apply {decision:?}", directive.key()),
            )),
        }
    }

    /// `Ignore` performs no lookup; an explicit id-mapped target is still
    /// recorded so dependents can be rewritten onto it
    fn ignore(&mut self, directive: &MappingDirective) -> ResolveResult<ResolvedMapping> {
        if let Some(target) = &directive.target_id {
            if directive.properties.map_by() == MapBy::Id {
                self.identities.record(directive.key(), target.clone())?;
            }
        }
        Ok(ResolvedMapping::taken(directive.clone(), ActionTaken::Ignored, None))
    }

    fn create(
        &mut self,
        directive: &MappingDirective,
        source: Option<&EntityRef>,
        candidate: Option<&EntityRef>,
        index: &BundleIndex,
    ) -> ResolveResult<ResolvedMapping> {
        let Some(source) = source else {
            return Ok(ResolvedMapping::failed(
                directive.clone(),
                ErrorType::TargetNotFound,
                format!(
                    "Could not locate entity {}: the bundle carries no reference to create it from",
                    directive.key()
                ),
            ));
        };

        let rewritten = rewrite::rewrite(source, &self.identities, index);
        let complete = rewritten.is_complete();
        let mut entity = rewritten.entity;
        entity.id = match (&directive.target_id, directive.properties.map_by()) {
            (Some(target), MapBy::Id) => target.clone(),
            _ => directive.src_id.clone(),
        };
        let clashes_on_guid = directive.action == MappingAction::AlwaysCreateNew
            && candidate.is_some_and(|c| c.payload.guid.is_some() && c.payload.guid == source.payload.guid);
        if clashes_on_guid {
            entity.payload.guid = Some(uuid::Uuid::new_v4().to_string());
        }
        let guid = entity.payload.guid.clone();

        let target_id = match self.store.create(entity, &self.options) {
            Ok(id) => id,
            Err(err) => return conflict(directive, err),
        };
        self.identities.record(directive.key(), target_id.clone())?;
        if let (Some(from), Some(to)) = (&source.payload.guid, &guid) {
            self.identities.record_guid(directive.entity_type, from, to);
        }
        if !complete {
            self.deferred.push(Deferred {
                source: source.clone(),
                target_id: target_id.clone(),
                guid,
            });
        }
        Ok(ResolvedMapping::taken(
            directive.clone(),
            ActionTaken::CreatedNew,
            Some(target_id),
        ))
    }

    fn update(
        &mut self,
        directive: &MappingDirective,
        source: Option<&EntityRef>,
        existing: EntityRef,
        index: &BundleIndex,
    ) -> ResolveResult<ResolvedMapping> {
        let Some(source) = source else {
            return Ok(ResolvedMapping::failed(
                directive.clone(),
                ErrorType::TargetNotFound,
                format!(
                    "Could not locate entity {}: the bundle carries no reference to update from",
                    directive.key()
                ),
            ));
        };

        let rewritten = rewrite::rewrite(source, &self.identities, index);
        let complete = rewritten.is_complete();
        let mut entity = rewritten.entity;
        entity.id = existing.id.clone();
        entity.payload.guid = existing.payload.guid.clone().or(entity.payload.guid);
        let guid = entity.payload.guid.clone();

        if let Err(err) = self.store.update(entity, &self.options) {
            return conflict(directive, err);
        }
        self.record(directive, Some(source), &existing)?;
        if !complete {
            self.deferred.push(Deferred {
                source: source.clone(),
                target_id: existing.id.clone(),
                guid,
            });
        }
        Ok(ResolvedMapping::taken(
            directive.clone(),
            ActionTaken::UpdatedExisting,
            Some(existing.id),
        ))
    }

    fn record(
        &mut self,
        directive: &MappingDirective,
        source: Option<&EntityRef>,
        target: &EntityRef,
    ) -> ResolveResult<()> {
        self.identities.record(directive.key(), target.id.clone())?;
        let source_guid = source.and_then(|s| s.payload.guid.as_deref());
        if let (Some(from), Some(to)) = (source_guid, target.payload.guid.as_deref()) {
            self.identities.record_guid(directive.entity_type, from, to);
        }
        Ok(())
    }

    /// Rewrite deferred entities now that every identity is known
    fn fix_up(&mut self, index: &BundleIndex) -> ResolveResult<usize> {
        let deferred = std::mem::take(&mut self.deferred);
        for item in &deferred {
            let mut entity = rewrite::rewrite(&item.source, &self.identities, index).entity;
            entity.id = item.target_id.clone();
            entity.payload.guid.clone_from(&item.guid);
            debug!(entity = %EntityKey::new(entity.entity_type, entity.id.clone()), "fixing up forward references");
            self.store.update(entity, &self.options)?;
        }
        Ok(deferred.len())
    }
}

/// Map a store failure on create, update or delete to a directive outcome
///
/// Store failures that are not reconciliation conflicts abort the import.
fn conflict(directive: &MappingDirective, err: StoreError) -> ResolveResult<ResolvedMapping> {
    let error_type = match &err {
        StoreError::UniqueKeyViolation { .. } => match err.violated_key_kind() {
            Some(KeyKind::Guid) => ErrorType::InvalidResource,
            _ => ErrorType::UniqueKeyConflict,
        },
        StoreError::ReadOnly(_) => ErrorType::TargetReadOnly,
        StoreError::NotFound(_) => ErrorType::TargetNotFound,
        _ => return Err(err.into()),
    };
    Ok(ResolvedMapping::failed(directive.clone(), error_type, err.to_string()))
}
