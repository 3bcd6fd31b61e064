//! Document container: the signed, optionally encrypted envelope.
//!
//! Wire format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "signer_id": "<entity id>",
//!     "recipients": ["<entity id>", ...],
//!     "encryption": {
//!         "scheme": "x25519-hkdf-sha256-chacha20poly1305",
//!         "nonce": "<base64-12-bytes>",
//!         "keys": { "<entity id>": { ... WrappedKey ... } }
//!     },
//!     "body": "<base64 plaintext or ciphertext>",
//!     "signature": "<base64 ed25519 signature>"
//! }
//! ```
//!
//! `recipients` and `encryption` are absent for plaintext containers.
//! Unknown fields are ignored when parsing. The signature covers every
//! field except itself, so it always covers the ciphertext.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::envelope::WrappedKey;
use crate::entity::EntityId;
use crate::error::{PkiError, Result, VerificationError};

/// Current container format version.
pub const CONTAINER_VERSION: u32 = 1;

/// Encryption parameters carried by an encrypted container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// Envelope scheme identifier.
    pub scheme: String,
    /// Base64 nonce of the body ciphertext.
    pub nonce: String,
    /// Recipient id → content key wrapped for that recipient.
    pub keys: BTreeMap<String, WrappedKey>,
}

/// Where a container value sits in its verify-then-open lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Unverified,
    Verified,
    Decrypted,
    PlaintextReady,
}

/// An untrusted container as produced or read from storage.
///
/// Never mutated after creation; signing yields a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    version: u32,
    signer_id: EntityId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recipients: Vec<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption: Option<EncryptionMetadata>,
    body: String,
    signature: String,
}

/// Parse target: every field optional so missing ones can be reported
/// precisely instead of as a generic parse failure.
#[derive(Deserialize)]
struct RawContainer {
    version: Option<u32>,
    signer_id: Option<EntityId>,
    #[serde(default)]
    recipients: Vec<EntityId>,
    #[serde(default)]
    encryption: Option<EncryptionMetadata>,
    body: Option<String>,
    signature: Option<String>,
}

/// Payload covered by the signature (excludes the signature field).
#[derive(Serialize)]
struct SignPayload<'a> {
    version: u32,
    signer_id: &'a EntityId,
    recipients: &'a [EntityId],
    encryption: &'a Option<EncryptionMetadata>,
    body: &'a str,
}

impl Container {
    /// Build an unsigned plaintext container.
    pub(crate) fn plaintext(signer_id: EntityId, body: &[u8]) -> Self {
        Self {
            version: CONTAINER_VERSION,
            signer_id,
            recipients: Vec::new(),
            encryption: None,
            body: encode(body),
            signature: String::new(),
        }
    }

    /// Build an unsigned encrypted container.
    pub(crate) fn encrypted(
        signer_id: EntityId,
        recipients: Vec<EntityId>,
        encryption: EncryptionMetadata,
        ciphertext: &[u8],
    ) -> Self {
        Self {
            version: CONTAINER_VERSION,
            signer_id,
            recipients,
            encryption: Some(encryption),
            body: encode(ciphertext),
            signature: String::new(),
        }
    }

    /// Return a copy carrying `signature`.
    pub(crate) fn with_signature(&self, signature: String) -> Self {
        Self {
            signature,
            ..self.clone()
        }
    }

    /// Parse a container from its wire form.
    ///
    /// # Errors
    ///
    /// `PkiError::Parse` for undecodable bytes or an unsupported version,
    /// `VerificationError::MalformedContainer` when `body`, `signer_id`, or
    /// `signature` is missing or the encryption fields are inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: RawContainer = serde_json::from_slice(bytes)
            .map_err(|e| PkiError::Parse(format!("failed to parse container: {e}")))?;

        let version = raw.version.unwrap_or(CONTAINER_VERSION);
        if version == 0 || version > CONTAINER_VERSION {
            return Err(PkiError::Parse(format!(
                "unsupported container version {version}"
            )));
        }

        let missing: Vec<&str> = [
            ("body", raw.body.is_none()),
            ("signer_id", raw.signer_id.is_none()),
            ("signature", raw.signature.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(VerificationError::MalformedContainer(format!(
                "missing required field(s): {}",
                missing.join(", ")
            ))
            .into());
        }

        let container = Self {
            version,
            signer_id: raw.signer_id.unwrap_or_else(|| EntityId::new("")),
            recipients: raw.recipients,
            encryption: raw.encryption,
            body: raw.body.unwrap_or_default(),
            signature: raw.signature.unwrap_or_default(),
        };
        container.check_structure()?;
        Ok(container)
    }

    /// Serialize to the wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PkiError::Serialization(e.to_string()))
    }

    /// Structural checks that do not need any key.
    pub(crate) fn check_structure(&self) -> std::result::Result<(), VerificationError> {
        if self.signer_id.as_str().is_empty() {
            return Err(VerificationError::MalformedContainer(
                "empty signer_id".into(),
            ));
        }
        if self.signature.is_empty() {
            return Err(VerificationError::MalformedContainer(
                "container is not signed".into(),
            ));
        }
        match (&self.encryption, self.recipients.is_empty()) {
            (None, false) => Err(VerificationError::MalformedContainer(
                "recipients listed without encryption metadata".into(),
            )),
            (Some(_), true) => Err(VerificationError::MalformedContainer(
                "encryption metadata without recipients".into(),
            )),
            (Some(meta), false) => {
                let all_wrapped = self
                    .recipients
                    .iter()
                    .all(|r| meta.keys.contains_key(r.as_str()));
                if all_wrapped {
                    Ok(())
                } else {
                    Err(VerificationError::MalformedContainer(
                        "recipient without a wrapped key".into(),
                    ))
                }
            }
            (None, true) => Ok(()),
        }
    }

    /// Bytes covered by the signature.
    pub(crate) fn signing_payload(&self) -> Result<Vec<u8>> {
        let payload = SignPayload {
            version: self.version,
            signer_id: &self.signer_id,
            recipients: &self.recipients,
            encryption: &self.encryption,
            body: &self.body,
        };
        serde_json::to_vec(&payload).map_err(|e| PkiError::Serialization(e.to_string()))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Claimed signer. Not trusted until verified.
    pub fn signer_id(&self) -> &EntityId {
        &self.signer_id
    }

    pub fn recipients(&self) -> &[EntityId] {
        &self.recipients
    }

    pub fn encryption(&self) -> Option<&EncryptionMetadata> {
        self.encryption.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        !self.recipients.is_empty()
    }

    /// Base64 body as stored.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decoded body bytes (ciphertext when encrypted).
    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        decode(&self.body)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn state(&self) -> ContainerState {
        ContainerState::Unverified
    }
}

/// A container whose signature has been checked against its signer.
///
/// Only [`crate::entity::Entity::verify`] constructs this type, so nothing
/// can be decrypted before its origin is established.
#[derive(Debug, Clone)]
pub struct VerifiedContainer {
    container: Container,
}

impl VerifiedContainer {
    pub(crate) fn new(container: Container) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn signer_id(&self) -> &EntityId {
        self.container.signer_id()
    }

    pub fn is_encrypted(&self) -> bool {
        self.container.is_encrypted()
    }

    pub fn state(&self) -> ContainerState {
        ContainerState::Verified
    }

    /// Take the body of a plaintext container.
    ///
    /// Encrypted containers must go through
    /// [`crate::entity::Entity::decrypt`] instead.
    pub fn into_plaintext(self) -> Result<OpenedContainer> {
        if self.is_encrypted() {
            return Err(crate::error::DecryptionError::DecryptionFailed(
                "container body is encrypted".into(),
            )
            .into());
        }
        let body = self.container.body_bytes()?;
        Ok(OpenedContainer::new(
            self.container.signer_id.clone(),
            ContainerState::PlaintextReady,
            body,
        ))
    }
}

/// The trusted, readable body of a container.
///
/// The body is zeroized on drop.
pub struct OpenedContainer {
    signer_id: EntityId,
    state: ContainerState,
    body: Vec<u8>,
}

impl OpenedContainer {
    pub(crate) fn new(signer_id: EntityId, state: ContainerState, body: Vec<u8>) -> Self {
        Self {
            signer_id,
            state,
            body,
        }
    }

    pub fn signer_id(&self) -> &EntityId {
        &self.signer_id
    }

    /// `Decrypted` or `PlaintextReady`.
    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take ownership of the body. The caller becomes responsible for it.
    pub fn into_body(mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }
}

impl Drop for OpenedContainer {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.body);
    }
}

fn encode(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
}

fn decode(encoded: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|e| PkiError::Parse(format!("invalid base64 body: {e}")))
}
