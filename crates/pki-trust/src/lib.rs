//! pki-trust: a signed, encrypted trust chain for a small PKI.
//!
//! An **admin** bootstrapped from local storage is the single root of
//! trust. The admin signs and encrypts the **organization** it manages,
//! and the organization signs and encrypts its **index**, a registry
//! mapping logical names to secret references.
//!
//! Every persisted object travels in a [`Container`]. A container must be
//! verified by its expected signer before its body can be read, and the
//! type system enforces that order: only [`Entity::verify`] produces a
//! [`VerifiedContainer`], and only a verified container can be decrypted.
//!
//! ```no_run
//! use pki_trust::{FsStorage, EntityId, TrustChainLoader};
//!
//! # fn main() -> pki_trust::Result<()> {
//! let storage = FsStorage::new("/var/lib/pki", EntityId::new("admin-1"));
//! let loader = TrustChainLoader::new(&storage);
//! let admin = loader.load_local_admin()?;
//! let org = loader.load_organization_private(&admin)?;
//! let mut index = loader.load_index(&org)?;
//! index.add_entry("db-cert", "blob://abc");
//! loader.save_index(&org, &index)?;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod crypto;
pub mod document;
pub mod entity;
pub mod error;
pub mod ids;
pub mod index;
pub mod provision;
pub mod storage;
pub mod time;

// Re-export primary types
pub use chain::TrustChainLoader;
pub use config::{AdminConfig, Config, OrgConfig, CONFIG_FILE};
pub use document::{Container, ContainerState, OpenedContainer, VerifiedContainer};
pub use entity::{Entity, EntityDocument, EntityId, EntityRole};
pub use error::{
    DecryptionError, PkiError, Result, StorageError, TrustStep, VerificationError,
};
pub use index::{parse_tags, Index};
pub use provision::{provision_admin, provision_organization};
pub use storage::{FsStorage, MemoryStorage, Scope, Storage};
