//! Store errors

use cmig_model::{EntityId, EntityKey, KeyKind, NaturalKey};

/// Entity store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No entity with this key
    #[error("entity not found: {0}")]
    NotFound(EntityKey),

    /// Write would duplicate a natural key
    #[error("{key} must be unique (held by {existing})")]
    UniqueKeyViolation {
        /// The violated key
        key: NaturalKey,
        /// Id of the entity already holding it
        existing: EntityId,
    },

    /// Entity may not be modified
    #[error("entity is read-only: {0}")]
    ReadOnly(EntityKey),

    /// Snapshot file could not be read or written
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be (de)serialized
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Kind of natural key violated, if this is a unique-key violation
    #[inline]
    #[must_use]
    pub fn violated_key_kind(&self) -> Option<KeyKind> {
        match self {
            Self::UniqueKeyViolation { key, .. } => Some(key.kind),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
