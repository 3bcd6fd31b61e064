//! Entity: an identity with signing and encryption key material.
//!
//! An entity always knows its public keys. It may additionally hold the
//! private halves: an admin loaded from local bootstrap holds both, an
//! organization loaded through the public scope holds neither.
//!
//! Every container operation lives here: signing, verification,
//! encryption for recipients, and decryption of verified containers.

use std::collections::BTreeSet;

use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use x25519_dalek::PublicKey as X25519PublicKey;
use zeroize::Zeroize;

use super::document::{EntityDocument, ENTITY_DOCUMENT_VERSION};
use super::id::{EntityId, EntityRole};
use crate::crypto::envelope::{self, SCHEME};
use crate::crypto::keys::{decode_key_32, encode_key, Ed25519KeyPair, X25519KeyPair};
use crate::crypto::signing;
use crate::document::{
    Container, ContainerState, EncryptionMetadata, OpenedContainer, VerifiedContainer,
};
use crate::error::{DecryptionError, PkiError, Result, VerificationError};

/// An identity in the trust hierarchy.
pub struct Entity {
    id: EntityId,
    role: EntityRole,
    /// Human-readable name (optional).
    pub name: Option<String>,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    verifying_key: VerifyingKey,
    encryption_public: X25519PublicKey,
    signing: Option<Ed25519KeyPair>,
    encryption: Option<X25519KeyPair>,
    /// Entity whose verification this entity was materialized through.
    anchored_by: Option<EntityId>,
}

impl Entity {
    /// Create a new entity with fresh signing and encryption key pairs.
    pub fn generate(id: EntityId, role: EntityRole, name: Option<String>) -> Self {
        let signing = Ed25519KeyPair::generate();
        let encryption = X25519KeyPair::generate();
        Self {
            id,
            role,
            name,
            created_at: crate::time::now_micros(),
            verifying_key: *signing.verifying_key(),
            encryption_public: *encryption.public_key(),
            signing: Some(signing),
            encryption: Some(encryption),
            anchored_by: None,
        }
    }

    /// Reconstruct from a document, validating that any private keys match
    /// the stated public keys.
    pub fn from_document(doc: &EntityDocument) -> Result<Self> {
        let verifying_bytes = decode_key_32(&doc.public_signing_key, "public signing key")?;
        let verifying_key = Ed25519KeyPair::verifying_key_from_bytes(&verifying_bytes)?;
        let encryption_public = X25519PublicKey::from(decode_key_32(
            &doc.public_encryption_key,
            "public encryption key",
        )?);

        let signing = match &doc.private_signing_key {
            Some(encoded) => {
                let mut bytes = decode_key_32(encoded, "private signing key")?;
                let pair = Ed25519KeyPair::from_signing_key_bytes(&bytes);
                bytes.zeroize();
                if pair.verifying_key_bytes() != verifying_bytes {
                    return Err(PkiError::InvalidKey(
                        "private signing key does not match public signing key".into(),
                    ));
                }
                Some(pair)
            }
            None => None,
        };

        let encryption = match &doc.private_encryption_key {
            Some(encoded) => {
                let secret = decode_key_32(encoded, "private encryption key")?;
                let pair = X25519KeyPair::from_secret_bytes(secret);
                if pair.public_key() != &encryption_public {
                    return Err(PkiError::InvalidKey(
                        "private encryption key does not match public encryption key".into(),
                    ));
                }
                Some(pair)
            }
            None => None,
        };

        Ok(Self {
            id: doc.id.clone(),
            role: doc.role,
            name: doc.name.clone(),
            created_at: doc.created_at,
            verifying_key,
            encryption_public,
            signing,
            encryption,
            anchored_by: None,
        })
    }

    /// Reconstruct from JSON entity document bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Self::from_document(&EntityDocument::from_json(bytes)?)
    }

    /// Build the document form, optionally including private keys.
    pub fn to_document(&self, include_private: bool) -> EntityDocument {
        let (private_signing_key, private_encryption_key) = if include_private {
            (
                self.signing.as_ref().map(|kp| {
                    let mut bytes = kp.signing_key_bytes();
                    let encoded = encode_key(&bytes);
                    bytes.zeroize();
                    encoded
                }),
                self.encryption.as_ref().map(|kp| {
                    let mut bytes = kp.secret_bytes();
                    let encoded = encode_key(&bytes);
                    bytes.zeroize();
                    encoded
                }),
            )
        } else {
            (None, None)
        };

        EntityDocument {
            version: ENTITY_DOCUMENT_VERSION,
            id: self.id.clone(),
            role: self.role,
            name: self.name.clone(),
            created_at: self.created_at,
            public_signing_key: encode_key(self.verifying_key.as_bytes()),
            public_encryption_key: encode_key(self.encryption_public.as_bytes()),
            private_signing_key,
            private_encryption_key,
        }
    }

    /// JSON of the public document.
    pub fn dump_public(&self) -> Result<Vec<u8>> {
        self.to_document(false).to_json()
    }

    /// JSON of the private document. Caller must zeroize after use.
    pub fn dump_private(&self) -> Result<Vec<u8>> {
        self.to_document(true).to_json()
    }

    /// Copy of this entity without any private key material.
    pub fn public(&self) -> Self {
        Self {
            id: self.id.clone(),
            role: self.role,
            name: self.name.clone(),
            created_at: self.created_at,
            verifying_key: self.verifying_key,
            encryption_public: self.encryption_public,
            signing: None,
            encryption: None,
            anchored_by: self.anchored_by.clone(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn role(&self) -> EntityRole {
        self.role
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn encryption_public_key(&self) -> &X25519PublicKey {
        &self.encryption_public
    }

    pub fn has_signing_key(&self) -> bool {
        self.signing.is_some()
    }

    pub fn has_decryption_key(&self) -> bool {
        self.encryption.is_some()
    }

    /// Entity that verified the container this entity was loaded from.
    pub fn anchored_by(&self) -> Option<&EntityId> {
        self.anchored_by.as_ref()
    }

    /// Record the trust anchor after a successful verification.
    pub(crate) fn anchored(mut self, anchor: &EntityId) -> Self {
        self.anchored_by = Some(anchor.clone());
        self
    }

    /// Short display fingerprint: base58 of the first 16 bytes of
    /// SHA-256(public signing key).
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.verifying_key.as_bytes());
        bs58::encode(&hash[..16]).into_string()
    }

    /// Fail unless this entity has `expected` role.
    pub fn require_role(&self, expected: EntityRole) -> Result<()> {
        if self.role == expected {
            Ok(())
        } else {
            Err(PkiError::UnexpectedRole {
                expected: expected.to_string(),
                found: self.role.to_string(),
            })
        }
    }

    // ── Signing ──────────────────────────────────────────────────────────────

    /// Sign `body`, returning a base64 signature.
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let pair = self
            .signing
            .as_ref()
            .ok_or_else(|| PkiError::NoSigningKey(self.id.to_string()))?;
        Ok(signing::sign_payload(pair.signing_key(), body))
    }

    /// Sign an unsigned container, producing a new one.
    ///
    /// The container must name this entity as signer.
    pub fn sign_container(&self, container: &Container) -> Result<Container> {
        if container.signer_id() != &self.id {
            return Err(VerificationError::UnknownSigner(container.signer_id().to_string()).into());
        }
        let signature = self.sign(&container.signing_payload()?)?;
        Ok(container.with_signature(signature))
    }

    /// Plaintext container signed by this entity (public scope).
    pub fn sign_string(&self, body: &str) -> Result<Container> {
        self.sign_container(&Container::plaintext(self.id.clone(), body.as_bytes()))
    }

    /// Check the container's signature with this entity's public key.
    ///
    /// # Errors
    ///
    /// `UnknownSigner` if the container claims a different signer,
    /// `MalformedContainer` if it is structurally incomplete,
    /// `SignatureMismatch` if the signature does not check out.
    pub fn verify(&self, container: Container) -> Result<VerifiedContainer> {
        if container.signer_id() != &self.id {
            return Err(VerificationError::UnknownSigner(container.signer_id().to_string()).into());
        }
        container.check_structure()?;
        signing::verify_payload(
            &self.verifying_key,
            &container.signing_payload()?,
            container.signature(),
        )?;
        Ok(VerifiedContainer::new(container))
    }

    // ── Encryption ───────────────────────────────────────────────────────────

    /// Encrypt `body` for `recipients`, returning an unsigned container
    /// with this entity as signer.
    pub fn encrypt(&self, body: &[u8], recipients: &[&Entity]) -> Result<Container> {
        let mut seen = BTreeSet::new();
        let unique: Vec<&Entity> = recipients
            .iter()
            .copied()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();

        let keys: Vec<(&str, &X25519PublicKey)> = unique
            .iter()
            .map(|r| (r.id.as_str(), &r.encryption_public))
            .collect();
        let sealed = envelope::seal(body, &keys)?;

        let metadata = EncryptionMetadata {
            scheme: SCHEME.to_string(),
            nonce: encode_key(&sealed.nonce),
            keys: sealed.keys,
        };
        let ids = unique.iter().map(|r| r.id.clone()).collect();
        Ok(Container::encrypted(
            self.id.clone(),
            ids,
            metadata,
            &sealed.ciphertext,
        ))
    }

    /// Decrypt a verified container addressed to this entity.
    ///
    /// # Errors
    ///
    /// `NotARecipient` if this entity is not listed, `NoDecryptionKey` if
    /// only the public half is held, `DecryptionFailed` otherwise.
    pub fn decrypt(&self, verified: &VerifiedContainer) -> Result<Vec<u8>> {
        let container = verified.container();
        if !container.recipients().contains(&self.id) {
            return Err(DecryptionError::NotARecipient(self.id.to_string()).into());
        }
        let pair = self
            .encryption
            .as_ref()
            .ok_or_else(|| DecryptionError::NoDecryptionKey(self.id.to_string()))?;

        let meta = container
            .encryption()
            .ok_or_else(|| DecryptionError::DecryptionFailed("container is not encrypted".into()))?;
        if meta.scheme != SCHEME {
            return Err(DecryptionError::DecryptionFailed(format!(
                "unsupported scheme {}",
                meta.scheme
            ))
            .into());
        }
        let wrapped = meta.keys.get(self.id.as_str()).ok_or_else(|| {
            DecryptionError::DecryptionFailed("no wrapped key for recipient".into())
        })?;

        let nonce = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &meta.nonce)
            .map_err(|_| DecryptionError::DecryptionFailed("invalid nonce".into()))?;
        let ciphertext = container
            .body_bytes()
            .map_err(|_| DecryptionError::DecryptionFailed("invalid ciphertext".into()))?;

        let mut content_key = envelope::unwrap(pair, self.id.as_str(), wrapped)?;
        let body = envelope::open(&content_key, &nonce, &ciphertext);
        content_key.zeroize();
        body
    }

    /// Move a verified container to its readable state: decrypt when it
    /// is encrypted, otherwise take the plaintext.
    pub fn open(&self, verified: VerifiedContainer) -> Result<OpenedContainer> {
        if verified.is_encrypted() {
            let body = self.decrypt(&verified)?;
            Ok(OpenedContainer::new(
                verified.signer_id().clone(),
                ContainerState::Decrypted,
                body,
            ))
        } else {
            verified.into_plaintext()
        }
    }

    /// Encrypt `body` then sign the ciphertext container.
    ///
    /// `None` recipients means this entity alone.
    pub fn encrypt_then_sign(
        &self,
        body: &[u8],
        recipients: Option<&[&Entity]>,
    ) -> Result<Container> {
        let container = match recipients {
            Some(list) => self.encrypt(body, list)?,
            None => self.encrypt(body, &[self])?,
        };
        self.sign_container(&container)
    }

    /// [`Self::encrypt_then_sign`] over a string body.
    pub fn encrypt_then_sign_string(
        &self,
        body: &str,
        recipients: Option<&[&Entity]>,
    ) -> Result<Container> {
        self.encrypt_then_sign(body.as_bytes(), recipients)
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("name", &self.name)
            .field("has_signing_key", &self.has_signing_key())
            .field("has_decryption_key", &self.has_decryption_key())
            .field("anchored_by", &self.anchored_by)
            .finish()
    }
}
