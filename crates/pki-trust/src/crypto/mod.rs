//! Cryptographic primitives for pki-trust.
//!
//! This module provides:
//! - Ed25519 key generation, signing, and verification
//! - X25519 key agreement
//! - HKDF-SHA256 key derivation
//! - ChaCha20-Poly1305 authenticated encryption
//! - The hybrid multi-recipient envelope used by encrypted containers
//! - Cryptographically secure random number generation

pub mod derivation;
pub mod encryption;
pub mod envelope;
pub mod keys;
pub mod random;
pub mod signing;
