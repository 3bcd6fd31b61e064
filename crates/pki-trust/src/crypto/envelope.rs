//! Hybrid envelope encryption.
//!
//! A random content key encrypts the body once. For every recipient an
//! ephemeral X25519 secret agrees a shared secret with the recipient's
//! static public key; HKDF-SHA256 turns that into a wrap key, and
//! ChaCha20-Poly1305 wraps the content key under it.
//!
//! ```text
//! content_key  = random(32)
//! body_ct      = ChaCha20Poly1305(content_key, body, aad = SCHEME)
//! shared       = X25519(ephemeral_secret, recipient_public)
//! wrap_key     = HKDF(shared, salt = eph_pub || recipient_pub, "pki-trust/wrap/{id}")
//! wrapped      = ChaCha20Poly1305(wrap_key, content_key, aad = id)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use x25519_dalek::PublicKey as X25519PublicKey;
use zeroize::Zeroize;

use crate::crypto::keys::{decode_key_32, encode_key, ephemeral_x25519, X25519KeyPair};
use crate::crypto::{derivation, encryption, random};
use crate::error::{DecryptionError, PkiError, Result};

/// Identifier of the only envelope scheme this crate produces.
pub const SCHEME: &str = "x25519-hkdf-sha256-chacha20poly1305";

/// The content key wrapped for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Base64 ephemeral X25519 public key.
    pub ephemeral_public: String,
    /// Base64 12-byte nonce.
    pub nonce: String,
    /// Base64 ciphertext of the content key.
    pub ciphertext: String,
}

/// Output of [`seal`].
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
    /// Recipient id → wrapped content key.
    pub keys: BTreeMap<String, WrappedKey>,
}

/// Encrypt `plaintext` for every `(recipient_id, public_key)` pair.
pub fn seal(plaintext: &[u8], recipients: &[(&str, &X25519PublicKey)]) -> Result<Sealed> {
    if recipients.is_empty() {
        return Err(PkiError::EncryptionFailed(
            "at least one recipient is required".into(),
        ));
    }

    let mut content_key = random::content_key();
    let body = encryption::encrypt(&content_key, plaintext, SCHEME.as_bytes());

    let mut keys = BTreeMap::new();
    let wrapped = body.and_then(|body| {
        for (id, public) in recipients {
            keys.insert((*id).to_string(), wrap(&content_key, id, public)?);
        }
        Ok(body)
    });
    content_key.zeroize();

    let (nonce, ciphertext) = wrapped?;
    Ok(Sealed {
        nonce,
        ciphertext,
        keys,
    })
}

/// Recover the content key from `wrapped` using the recipient's key pair.
pub fn unwrap(
    key_pair: &X25519KeyPair,
    recipient_id: &str,
    wrapped: &WrappedKey,
) -> Result<[u8; 32]> {
    let ephemeral = decode_key_32(&wrapped.ephemeral_public, "ephemeral public key")
        .map_err(|_| DecryptionError::DecryptionFailed("invalid ephemeral public key".into()))?;
    let nonce = decode_b64(&wrapped.nonce)?;
    let ciphertext = decode_b64(&wrapped.ciphertext)?;

    let mut shared = key_pair.diffie_hellman(&X25519PublicKey::from(ephemeral));
    let salt = wrap_salt(&ephemeral, &key_pair.public_key_bytes());
    let context = derivation::wrap_context(recipient_id);
    let wrap_key = derivation::derive_key(&shared, Some(&salt), &context);
    shared.zeroize();
    let mut wrap_key = wrap_key?;

    let unwrapped = encryption::decrypt(&wrap_key, &nonce, &ciphertext, recipient_id.as_bytes());
    wrap_key.zeroize();
    let mut unwrapped = unwrapped?;

    let content_key: std::result::Result<[u8; 32], _> = unwrapped.as_slice().try_into();
    unwrapped.zeroize();
    content_key.map_err(|_| {
        DecryptionError::DecryptionFailed("content key must be 32 bytes".into()).into()
    })
}

/// Decrypt a body sealed under `content_key`.
pub fn open(content_key: &[u8; 32], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    encryption::decrypt(content_key, nonce, ciphertext, SCHEME.as_bytes())
}

fn wrap(
    content_key: &[u8; 32],
    recipient_id: &str,
    public: &X25519PublicKey,
) -> Result<WrappedKey> {
    let (ephemeral_secret, ephemeral_public) = ephemeral_x25519();
    let mut shared = *ephemeral_secret.diffie_hellman(public).as_bytes();
    let salt = wrap_salt(ephemeral_public.as_bytes(), public.as_bytes());
    let context = derivation::wrap_context(recipient_id);
    let wrap_key = derivation::derive_key(&shared, Some(&salt), &context);
    shared.zeroize();
    let mut wrap_key = wrap_key?;

    let sealed = encryption::encrypt(&wrap_key, content_key, recipient_id.as_bytes());
    wrap_key.zeroize();
    let (nonce, ciphertext) = sealed?;

    Ok(WrappedKey {
        ephemeral_public: encode_key(ephemeral_public.as_bytes()),
        nonce: encode_key(&nonce),
        ciphertext: encode_key(&ciphertext),
    })
}

fn wrap_salt(ephemeral_public: &[u8; 32], recipient_public: &[u8; 32]) -> [u8; 64] {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);
    salt
}

fn decode_b64(encoded: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|_| {
            DecryptionError::DecryptionFailed("invalid base64 in wrapped key".into()).into()
        })
}
