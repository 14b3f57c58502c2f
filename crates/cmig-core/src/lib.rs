//! cmig Core - configuration migration engine
//!
//! Moves gateway configuration between stores:
//! - Exports a root entity and everything it depends on as an ordered bundle
//! - Imports a bundle into a target store, reconciling identities per directive
//! - Runs each import in one transaction that rolls back on any conflict
//! - Keeps a hash-chained audit trail of committed imports
//!
//! # Example
//!
//! ```rust,ignore
//! use cmig_core::prelude::*;
//!
//! let source = MigrationEngine::new(MemoryStore::load("source.json")?, MigrationConfig::new());
//! let export = source.export(&RootSelector::policy("abc"), source.export_options())?;
//!
//! let target = MigrationEngine::new(MemoryStore::load("target.json")?, MigrationConfig::new());
//! let report = target.import(&export.bundle, ImportOptions::new().with_version_comment("release-7"))?;
//! println!("{}", report.summary());
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod options;
pub mod report;

pub use audit::{verify_chain, AuditRecord, AuditTrail};
pub use config::MigrationConfig;
pub use engine::MigrationEngine;
pub use error::{AuditError, MigrationError, MigrationResult};
pub use options::ImportOptions;
pub use report::{ImportReport, ImportStatus, ReportSummary};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running migrations
    pub use crate::{
        ImportOptions, ImportReport, ImportStatus, MigrationConfig, MigrationEngine,
        MigrationError, MigrationResult,
    };
    pub use cmig_graph::{ExportOptions, RootSelector};
    pub use cmig_model::prelude::*;
    pub use cmig_store::{EntityReader, MemoryStore, TransactionalStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
