//! Structural bundle errors
//!
//! Any of these rejects a bundle as a whole before a single directive is
//! resolved.

use crate::entity::EntityKey;
use crate::secret::SecretError;

/// Bundle rejected before resolution
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Not valid bundle JSON, including unrecognised directive properties
    #[error("malformed bundle: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two directives share `(type, srcId)`
    #[error("duplicate mapping directive for {0}")]
    DuplicateDirective(EntityKey),

    /// Two references share `(type, id)`
    #[error("duplicate reference for {0}")]
    DuplicateReference(EntityKey),

    /// A reference has no directive
    #[error("reference {0} has no mapping directive")]
    ReferenceWithoutDirective(EntityKey),

    /// Directive or reference with a blank id
    #[error("{what} at position {index} has an empty id")]
    EmptyIdentifier {
        /// `mapping` or `reference`
        what: &'static str,
        /// Position in its list
        index: usize,
    },

    /// Secrets could not be opened
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// Result type for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;
