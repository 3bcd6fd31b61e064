//! Scoped blob storage.
//!
//! The storage layer is a dumb key-value store partitioned by entity id and
//! scope. It performs no cryptographic interpretation; callers pick the
//! scope that matches the trust classification of the bytes:
//!
//! - `public`: signed containers, possibly plaintext.
//! - `private`: signed containers encrypted to the owning entity.
//! - `local`: unsigned, unencrypted bootstrap data for the entity this
//!   process runs as.
//!
//! # Directory layout ([`FsStorage`])
//!
//! ```text
//! {root}/
//! ├── public/
//! │   └── {entity_id}/{key}.json
//! ├── private/
//! │   └── {entity_id}/{key}.json
//! └── local/
//!     └── {local_id}/{key}.json
//! ```
//!
//! # Modules
//!
//! - [`fs`]: filesystem backend with atomic writes.
//! - [`memory`]: in-process backend.

pub mod fs;
pub mod memory;

use crate::entity::EntityId;
use crate::error::StorageError;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

/// Storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Public,
    Private,
    Local,
}

impl Scope {
    /// Return a stable string representation, also used as directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoped accessors over a storage backend.
///
/// Every write fully replaces the stored object; concurrent writers to the
/// same key race and the last write wins.
pub trait Storage: Send + Sync {
    fn get_public(&self, entity_id: &EntityId, key: &str) -> Result<Vec<u8>, StorageError>;

    fn get_private(&self, entity_id: &EntityId, key: &str) -> Result<Vec<u8>, StorageError>;

    fn send_public(
        &self,
        entity_id: &EntityId,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError>;

    fn send_private(
        &self,
        entity_id: &EntityId,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError>;

    /// Read bootstrap data for the local entity.
    fn read_local(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write bootstrap data for the local entity.
    fn write_local(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Fetch from `entity_id`'s partition in `scope`.
    ///
    /// `Local` ignores `entity_id`.
    fn get(
        &self,
        scope: Scope,
        entity_id: &EntityId,
        key: &str,
    ) -> Result<Vec<u8>, StorageError> {
        match scope {
            Scope::Public => self.get_public(entity_id, key),
            Scope::Private => self.get_private(entity_id, key),
            Scope::Local => self.read_local(key),
        }
    }
}

/// Human-readable location used in error messages and logs.
pub(crate) fn location(scope: Scope, owner: &str, key: &str) -> String {
    format!("{scope}/{owner}/{key}")
}
