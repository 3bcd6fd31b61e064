//! Filesystem storage backend.
//!
//! Each stored object is one file. Writes go to a sibling temporary file
//! that is then renamed into place, so a concurrent reader sees either the
//! previous object or the new one, never a partial write.

use std::path::{Path, PathBuf};

use log::debug;

use super::{location, Scope, Storage};
use crate::entity::EntityId;
use crate::error::StorageError;

const OBJECT_EXTENSION: &str = "json";

/// Filesystem-backed [`Storage`] rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    local_id: EntityId,
}

impl FsStorage {
    /// Create a store rooted at `root`, acting as `local_id` for the local
    /// scope. Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>, local_id: EntityId) -> Self {
        Self {
            root: root.into(),
            local_id,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn local_id(&self) -> &EntityId {
        &self.local_id
    }

    /// Return a store over the same root acting as a different local entity.
    pub fn with_local_id(&self, local_id: EntityId) -> Self {
        Self {
            root: self.root.clone(),
            local_id,
        }
    }

    fn object_path(
        &self,
        scope: Scope,
        owner: &str,
        key: &str,
    ) -> Result<PathBuf, StorageError> {
        Ok(self
            .root
            .join(scope.as_str())
            .join(path_component(owner)?)
            .join(format!("{}.{OBJECT_EXTENSION}", path_component(key)?)))
    }

    fn read(&self, scope: Scope, owner: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(scope, owner, key)?;
        debug!("reading {}", path.display());
        std::fs::read(&path).map_err(|source| {
            let location = location(scope, owner, key);
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location)
            } else {
                StorageError::ReadError { location, source }
            }
        })
    }

    fn write(
        &self,
        scope: Scope,
        owner: &str,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.object_path(scope, owner, key)?;
        debug!("writing {} ({} bytes)", path.display(), data.len());
        write_atomic(&path, data).map_err(|source| StorageError::WriteError {
            location: location(scope, owner, key),
            source,
        })
    }
}

impl Storage for FsStorage {
    fn get_public(&self, entity_id: &EntityId, key: &str) -> Result<Vec<u8>, StorageError> {
        self.read(Scope::Public, entity_id.as_str(), key)
    }

    fn get_private(&self, entity_id: &EntityId, key: &str) -> Result<Vec<u8>, StorageError> {
        self.read(Scope::Private, entity_id.as_str(), key)
    }

    fn send_public(
        &self,
        entity_id: &EntityId,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError> {
        self.write(Scope::Public, entity_id.as_str(), key, data)
    }

    fn send_private(
        &self,
        entity_id: &EntityId,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError> {
        self.write(Scope::Private, entity_id.as_str(), key, data)
    }

    fn read_local(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.read(Scope::Local, self.local_id.as_str(), key)
    }

    fn write_local(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write(Scope::Local, self.local_id.as_str(), key, data)
    }
}

/// Accept an id or key only if it names exactly one path component.
///
/// Anything else is refused rather than rewritten, so distinct ids and keys
/// never map to the same file.
fn path_component(component: &str) -> Result<&str, StorageError> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidKey(component.to_string()));
    }
    Ok(component)
}

/// Write `data` to `path` atomically using a sibling temporary file.
///
/// Creates the parent directory if it does not exist.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Unique per writer so concurrent writers never share a temp file.
    let tmp_path = path.with_extension(format!(
        "{OBJECT_EXTENSION}.{}.tmp",
        crate::ids::new_id()
    ));
    std::fs::write(&tmp_path, data)?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    Ok(())
}
