//! Export errors

use cmig_model::{EntityKey, SecretError};
use cmig_store::StoreError;

/// Dependency graph and export failures
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Export root does not exist
    #[error("export root not found: {0}")]
    RootNotFound(EntityKey),

    /// Edge from an entity to itself
    #[error("self-referencing edge on {0}")]
    SelfLoop(EntityKey),

    /// A dependency is ordered after its dependent
    #[error("{dependency} is ordered after its dependent {dependent}")]
    OrderViolation {
        /// The dependency
        dependency: EntityKey,
        /// The dependent
        dependent: EntityKey,
    },

    /// A graph node is missing from a checked order
    #[error("{0} is missing from the order")]
    MissingFromOrder(EntityKey),

    /// Secret encryption requested without a passphrase
    #[error("encryptSecrets requires a passphrase")]
    MissingPassphrase,

    /// Malformed export option
    #[error("invalid export option: {0}")]
    InvalidOption(String),

    /// Source store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Secret sealing failure
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
