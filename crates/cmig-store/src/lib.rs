//! cmig Store - entity store adapter
//!
//! The migration engine reaches entity storage only through the traits in
//! [`traits`]. [`MemoryStore`] implements them in memory, with unique natural
//! keys, generated roles, revisions and all-or-nothing transactions; it backs
//! the CLI through JSON snapshot files.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmig_store::{MemoryStore, TransactionalStore, Transaction, EntityStore, WriteOptions};
//!
//! let store = MemoryStore::new();
//! let mut txn = store.begin()?;
//! txn.create(entity, &WriteOptions::activated())?;
//! txn.commit()?;
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryTransaction, Snapshot, StoredEntity};
pub use traits::{
    EntityReader, EntityStore, Revision, Transaction, TransactionalStore, WriteOptions,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
