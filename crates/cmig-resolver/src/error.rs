//! Resolver errors
//!
//! Per-entity conflicts are not errors here: they are reported on the
//! corresponding [`cmig_model::ResolvedMapping`]. These variants abort the
//! whole import.

use cmig_model::{BundleError, EntityId, EntityKey};
use cmig_store::StoreError;

/// Import-aborting failures
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Bundle failed structural validation
    #[error("invalid bundle: {0}")]
    Bundle(#[from] BundleError),

    /// Target store failed for a reason other than a reconciliation conflict
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Identity table entry written twice with different targets
    #[error("{key} already resolved to {existing}, refusing {attempted}")]
    IdentityConflict {
        /// Source identity
        key: EntityKey,
        /// Target already recorded
        existing: EntityId,
        /// Target that was attempted
        attempted: EntityId,
    },
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
