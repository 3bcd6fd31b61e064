//! Serialized entity documents.
//!
//! An entity document is what travels inside container bodies and the
//! local bootstrap file. The public form carries only the public keys;
//! the private form additionally carries base64 private keys.
//!
//! ```json
//! {
//!     "version": 1,
//!     "id": "org-1",
//!     "role": "organization",
//!     "name": "acme",
//!     "created_at": 1700000000000000,
//!     "public_signing_key": "<base64-32-bytes>",
//!     "public_encryption_key": "<base64-32-bytes>",
//!     "private_signing_key": "<base64-32-bytes>",
//!     "private_encryption_key": "<base64-32-bytes>"
//! }
//! ```

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::id::{EntityId, EntityRole};
use crate::error::{PkiError, Result};

pub const ENTITY_DOCUMENT_VERSION: u32 = 1;

/// Wire form of an [`super::Entity`]. Private fields are zeroized on drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDocument {
    pub version: u32,
    pub id: EntityId,
    pub role: EntityRole,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: u64,
    pub public_signing_key: String,
    pub public_encryption_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_signing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_encryption_key: Option<String>,
}

impl EntityDocument {
    /// Parse a document from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: Self = serde_json::from_slice(bytes)
            .map_err(|e| PkiError::Parse(format!("failed to parse entity document: {e}")))?;
        if doc.version != ENTITY_DOCUMENT_VERSION {
            return Err(PkiError::Parse(format!(
                "unsupported entity document version {}",
                doc.version
            )));
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PkiError::Serialization(e.to_string()))
    }

    /// `true` if both the private signing and encryption keys are present.
    pub fn has_private_keys(&self) -> bool {
        self.private_signing_key.is_some() && self.private_encryption_key.is_some()
    }
}

impl Drop for EntityDocument {
    fn drop(&mut self) {
        self.private_signing_key.zeroize();
        self.private_encryption_key.zeroize();
    }
}
