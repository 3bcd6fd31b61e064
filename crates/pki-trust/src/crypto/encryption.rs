//! Symmetric authenticated encryption using ChaCha20-Poly1305.
//!
//! Used for container bodies (under a random content key) and for
//! wrapping that content key per recipient.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};

use crate::crypto::random::random_nonce_12;
use crate::error::{DecryptionError, PkiError, Result};

/// Encrypt plaintext with ChaCha20-Poly1305, binding `aad`.
///
/// Returns `(nonce, ciphertext)`. The nonce must be stored alongside
/// the ciphertext for decryption.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<([u8; 12], Vec<u8>)> {
    let nonce_bytes = random_nonce_12();
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| PkiError::EncryptionFailed(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| PkiError::EncryptionFailed(format!("encrypt: {e}")))?;
    Ok((nonce_bytes, ciphertext))
}

/// Decrypt ciphertext with ChaCha20-Poly1305.
///
/// Authentication failures are reported without detail.
pub fn decrypt(key: &[u8; 32], nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != 12 {
        return Err(DecryptionError::DecryptionFailed("nonce must be 12 bytes".into()).into());
    }
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| DecryptionError::DecryptionFailed(format!("cipher init: {e}")))?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| DecryptionError::DecryptionFailed("authentication failed".into()).into())
}
