//! Organization index: logical names mapped to secret references.
//!
//! The index is owned by one organization and travels as the body of a
//! container that organization encrypts to itself and signs. Every save
//! replaces the stored form completely.
//!
//! Both maps are `BTreeMap`s, so [`Index::dump`] is deterministic for the
//! same logical content.
//!
//! ```json
//! {
//!     "version": 1,
//!     "owner_id": "org-1",
//!     "entries": { "db-cert": "blob://abc" },
//!     "tags": { "prod": ["db-cert"] }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{PkiError, Result};

pub const INDEX_VERSION: u32 = 1;

/// Registry of secret references owned by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    version: u32,
    owner_id: EntityId,
    #[serde(default)]
    entries: BTreeMap<String, String>,
    /// Tag → names of entries carrying it.
    #[serde(default)]
    tags: BTreeMap<String, BTreeSet<String>>,
}

impl Index {
    /// Create an empty index owned by `owner_id`.
    pub fn new(owner_id: EntityId) -> Self {
        Self {
            version: INDEX_VERSION,
            owner_id,
            entries: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Parse an index from a decrypted container body.
    pub fn load(body: &[u8]) -> Result<Self> {
        let index: Self = serde_json::from_slice(body)
            .map_err(|e| PkiError::Parse(format!("failed to parse index: {e}")))?;
        if index.version != INDEX_VERSION {
            return Err(PkiError::Parse(format!(
                "unsupported index version {}",
                index.version
            )));
        }
        Ok(index)
    }

    /// Canonical serialization used as the container body.
    pub fn dump(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PkiError::Serialization(e.to_string()))
    }

    pub fn owner_id(&self) -> &EntityId {
        &self.owner_id
    }

    /// Insert or replace the reference stored under `name`.
    ///
    /// Returns the previous reference, if any.
    pub fn add_entry(
        &mut self,
        name: impl Into<String>,
        reference: impl Into<String>,
    ) -> Option<String> {
        self.entries.insert(name.into(), reference.into())
    }

    /// Remove `name` and drop it from every tag.
    pub fn remove_entry(&mut self, name: &str) -> Result<String> {
        let reference = self
            .entries
            .remove(name)
            .ok_or_else(|| PkiError::EntryNotFound(name.to_string()))?;
        self.tags.retain(|_, names| {
            names.remove(name);
            !names.is_empty()
        });
        Ok(reference)
    }

    pub fn lookup(&self, name: &str) -> Result<&str> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PkiError::EntryNotFound(name.to_string()))
    }

    /// Attach `tags` to an existing entry.
    pub fn add_tags<I, S>(&mut self, name: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.entries.contains_key(name) {
            return Err(PkiError::EntryNotFound(name.to_string()));
        }
        for tag in tags {
            let tag = tag.into();
            if tag.is_empty() {
                continue;
            }
            self.tags.entry(tag).or_default().insert(name.to_string());
        }
        Ok(())
    }

    /// Names of entries carrying `tag`, in order.
    pub fn entries_by_tag(&self, tag: &str) -> Vec<&str> {
        self.tags
            .get(tag)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Tags attached to `name`, in order.
    pub fn tags_for(&self, name: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|(_, names)| names.contains(name))
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// All entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a comma-separated tag list: trimmed, lower-cased, empties dropped.
pub fn parse_tags(tag_string: &str) -> Vec<String> {
    tag_string
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
