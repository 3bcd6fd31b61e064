//! Container signatures.
//!
//! A container carries one Ed25519 signature over its signing payload,
//! stored as standard base64 in the `signature` field.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{Result, VerificationError};

/// Sign a container payload, returning the base64 form stored on the wire.
pub fn sign_payload(signing_key: &SigningKey, payload: &[u8]) -> String {
    STANDARD.encode(signing_key.sign(payload).to_bytes())
}

/// Check a wire signature against a container payload.
pub fn verify_payload(verifying_key: &VerifyingKey, payload: &[u8], signature: &str) -> Result<()> {
    let signature = decode_signature(signature)?;
    verifying_key
        .verify(payload, &signature)
        .map_err(|_| VerificationError::SignatureMismatch.into())
}

/// Decode a wire signature.
///
/// Anything that is not 64 bytes of base64 can never match, so it is a
/// mismatch rather than a malformed container.
fn decode_signature(encoded: &str) -> std::result::Result<Signature, VerificationError> {
    let bytes: [u8; 64] = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(VerificationError::SignatureMismatch)?;
    Ok(Signature::from_bytes(&bytes))
}
