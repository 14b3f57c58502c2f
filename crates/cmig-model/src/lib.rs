//! cmig Model - the vocabulary of configuration migration
//!
//! Types shared by export, import and every store:
//! - Entity identity, payloads and natural keys
//! - Mapping directives, actions and outcomes
//! - Bundles and their structural validation
//! - References embedded in payload bodies
//! - Sealing of secret material
//!
//! # Example
//!
//! ```rust,ignore
//! use cmig_model::prelude::*;
//!
//! let mut bundle = Bundle::new();
//! bundle.references.push(EntityRef::new(EntityType::Policy, "p1", "Auth"));
//! bundle.mappings.push(MappingDirective::new(EntityType::Policy, "p1", MappingAction::NewOrExisting));
//! bundle.validate()?;
//! ```

pub mod bundle;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod references;
pub mod roles;
pub mod secret;
pub mod well_known;

pub use bundle::Bundle;
pub use entity::{
    EntityId, EntityKey, EntityRef, EntityType, KeyKind, Link, NaturalKey, Payload,
    KEYSTORE_PROPERTY, PROVIDER_LINK,
};
pub use error::{BundleError, BundleResult};
pub use mapping::{
    ActionTaken, ErrorType, MapBy, MappingAction, MappingDirective, MappingProperties,
    ResolvedMapping,
};
pub use references::{BodyReference, Selector};
pub use roles::RolePrefix;
pub use secret::{SealingKey, Secret, SecretError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with cmig models
    pub use crate::{
        ActionTaken, Bundle, EntityId, EntityKey, EntityRef, EntityType, ErrorType, MapBy,
        MappingAction, MappingDirective, NaturalKey, ResolvedMapping, Secret,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
