//! cmig Graph - dependency-ordered export
//!
//! Given a root selector, finds every entity the root transitively depends on
//! and assembles a bundle with dependencies first.
//!
//! # Core Concepts
//!
//! - [`discovery`]: direct dependencies of one entity (security zone, links,
//!   body references, parent folder)
//! - [`DependencyGraphBuilder`]: depth-first walk with a visited set, cycle safe
//! - [`DependencyDag`]: the discovered edges, for order verification
//!
//! # Example
//!
//! ```rust,ignore
//! use cmig_graph::{build, ExportOptions, RootSelector};
//!
//! let export = build(&store, &RootSelector::policy("abc"), ExportOptions::default())?;
//! assert!(export.verify().is_ok());
//! ```

pub mod builder;
pub mod dag;
pub mod discovery;
pub mod error;
pub mod options;

pub use builder::{build, DependencyGraphBuilder, Export};
pub use dag::DependencyDag;
pub use discovery::{Dependency, DependencyKind};
pub use error::{GraphError, GraphResult};
pub use options::{ExportOptions, RootSelector};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
