//! Error types for pki-trust.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material and decrypted plaintext are never included in
//! error messages.

use std::fmt;

/// Failure to establish who signed a container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Unknown signer: {0}")]
    UnknownSigner(String),

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Malformed container: {0}")]
    MalformedContainer(String),
}

/// Failure to recover the plaintext of a verified container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecryptionError {
    #[error("Not a recipient: {0}")]
    NotARecipient(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("No private encryption key held for {0}")]
    NoDecryptionKey(String),
}

/// Failure of a scoped storage accessor.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Write failed for {location}")]
    WriteError {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Read failed for {location}")]
    ReadError {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stage of the trust chain at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustStep {
    LoadLocalAdmin,
    FetchOrganization,
    ParseOrganizationContainer,
    VerifyOrganization,
    DecryptOrganization,
    BuildOrganization,
    FetchIndex,
    ParseIndexContainer,
    VerifyIndex,
    DecryptIndex,
    BuildIndex,
    SealIndex,
    WriteIndex,
}

impl TrustStep {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadLocalAdmin => "load local admin",
            Self::FetchOrganization => "fetch organization",
            Self::ParseOrganizationContainer => "parse organization container",
            Self::VerifyOrganization => "verify organization",
            Self::DecryptOrganization => "decrypt organization",
            Self::BuildOrganization => "build organization",
            Self::FetchIndex => "fetch index",
            Self::ParseIndexContainer => "parse index container",
            Self::VerifyIndex => "verify index",
            Self::DecryptIndex => "decrypt index",
            Self::BuildIndex => "build index",
            Self::SealIndex => "encrypt and sign index",
            Self::WriteIndex => "write index",
        }
    }
}

impl fmt::Display for TrustStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum PkiError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Trust chain broken at {step}")]
    TrustChain {
        step: TrustStep,
        #[source]
        cause: Box<PkiError>,
    },

    #[error("Admin bootstrap data missing from local storage")]
    AdminBootstrapMissing,

    #[error("No private signing key held for {0}")]
    NoSigningKey(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unexpected role: expected {expected}, found {found}")]
    UnexpectedRole { expected: String, found: String },

    #[error("Index owner mismatch: expected {expected}, found {found}")]
    OwnerMismatch { expected: String, found: String },

    #[error("Unsupported scope for {0}")]
    UnsupportedScope(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl PkiError {
    /// Wrap `self` with the trust-chain stage it occurred at.
    pub fn at(self, step: TrustStep) -> Self {
        Self::TrustChain {
            step,
            cause: Box::new(self),
        }
    }

    /// Return the innermost error, looking through trust-chain wrappers.
    pub fn root_cause(&self) -> &PkiError {
        match self {
            Self::TrustChain { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Return the stage a trust-chain failure occurred at, if any.
    pub fn step(&self) -> Option<TrustStep> {
        match self {
            Self::TrustChain { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// `true` when the data simply has not been provisioned yet.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Storage(StorageError::NotFound(_)) | Self::AdminBootstrapMissing
        )
    }

    /// `true` when stored data exists but cannot be trusted or parsed.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::Parse(_) | Self::Verification(_) | Self::Decryption(_)
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PkiError>;
