//! Entity identifiers and roles.

use serde::{Deserialize, Serialize};

/// Opaque, stable identifier of an entity.
///
/// New entities get a time-ordered id from [`crate::ids::new_id`]; any
/// string is accepted when reconstructing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(crate::ids::new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of roles in the two-level trust hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// Root of trust, bootstrapped from local storage.
    Admin,
    /// Provisioned and signed by an admin; owns the index.
    Organization,
}

impl EntityRole {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Organization => "organization",
        }
    }
}

impl std::fmt::Display for EntityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
