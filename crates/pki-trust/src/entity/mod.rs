//! Entities: the identities of the trust hierarchy.
//!
//! An `Entity` holds signing and encryption key material and performs
//! every container operation: sign, verify, encrypt, decrypt.

pub mod document;
#[allow(clippy::module_inception)]
pub mod entity;
pub mod id;

pub use document::{EntityDocument, ENTITY_DOCUMENT_VERSION};
pub use entity::Entity;
pub use id::{EntityId, EntityRole};
