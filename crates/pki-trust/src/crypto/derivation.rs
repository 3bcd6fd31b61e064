//! Key derivation using HKDF-SHA256.
//!
//! Turns an X25519 shared secret into the key that wraps a container's
//! content key for one recipient.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{PkiError, Result};

/// Derive a 32-byte key from input key material and a context string.
///
/// Uses HKDF-SHA256 (RFC 5869) with the optional salt and the context as
/// info.
pub fn derive_key(ikm: &[u8; 32], salt: Option<&[u8]>, context: &str) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut output = [0u8; 32];
    hk.expand(context.as_bytes(), &mut output)
        .map_err(|e| PkiError::EncryptionFailed(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Context string binding a wrap key to its recipient.
pub fn wrap_context(recipient_id: &str) -> String {
    format!("pki-trust/wrap/{recipient_id}")
}
