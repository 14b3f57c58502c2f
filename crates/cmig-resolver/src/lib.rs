//! cmig Resolver - identity-reconciling import
//!
//! Reconciles a bundle's directives against a target store, one directive at
//! a time, in bundle order.
//!
//! # Core Concepts
//!
//! - [`IdentityTable`]: `(type, source id)` to target id, written once per import
//! - [`algebra`]: the action/conflict table as a pure function
//! - [`locate`]: target candidate lookup by id, name, GUID or owning entity
//! - [`rewrite`]: translation of embedded references into target identities
//! - [`MappingResolver`]: the single pass, plus the forward-reference fix-up
//!
//! # Example
//!
//! ```rust,ignore
//! use cmig_resolver::MappingResolver;
//! use cmig_store::WriteOptions;
//!
//! let resolution = MappingResolver::new(&mut txn, WriteOptions::activated()).resolve(&bundle)?;
//! for mapping in &resolution.mappings {
//!     println!("{} {:?} {:?}", mapping.directive.src_id, mapping.action_taken, mapping.error_type);
//! }
//! ```

pub mod algebra;
pub mod error;
pub mod identity;
pub mod locate;
pub mod resolver;
pub mod rewrite;
pub mod validate;

pub use algebra::{decide, Decision};
pub use error::{ResolveError, ResolveResult};
pub use identity::IdentityTable;
pub use locate::Located;
pub use resolver::{MappingResolver, Resolution};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
