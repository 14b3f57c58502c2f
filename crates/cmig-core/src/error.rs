//! Error types for cmig Core
//!
//! Provides error handling for:
//! - Bundle structure and secret opening
//! - Export graph construction
//! - Import resolution and store failures
//! - Configuration and option parsing
//! - Audit chain integrity

use cmig_graph::GraphError;
use cmig_model::{BundleError, SecretError};
use cmig_resolver::ResolveError;
use cmig_store::StoreError;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Bundle is structurally invalid
    #[error("invalid bundle: {0}")]
    Bundle(#[from] BundleError),

    /// Secrets could not be sealed or opened
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),

    /// Export failed
    #[error("export failed: {0}")]
    Graph(#[from] GraphError),

    /// Import aborted
    #[error("import failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Store failure outside resolution
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed per-call option
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Audit chain failure
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

impl MigrationError {
    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Backend(_) | StoreError::Io(_))
                | Self::Graph(GraphError::Store(StoreError::Backend(_)))
                | Self::Resolve(ResolveError::Store(StoreError::Backend(_)))
        )
    }

    /// Check if the caller can fix the input and resubmit
    #[inline]
    #[must_use]
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            Self::Bundle(_)
                | Self::Secret(_)
                | Self::InvalidOption(_)
                | Self::Config(_)
                | Self::Resolve(ResolveError::Bundle(_))
                | Self::Graph(
                    GraphError::RootNotFound(_)
                        | GraphError::InvalidOption(_)
                        | GraphError::MissingPassphrase
                )
        )
    }
}

/// Audit chain errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A record's hash or back link does not match
    #[error("audit chain broken at record {sequence}")]
    IntegrityViolation {
        /// Sequence number of the first bad record
        sequence: u64,
    },
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
