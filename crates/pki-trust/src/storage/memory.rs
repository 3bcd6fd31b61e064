//! In-process storage backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{location, Scope, Storage};
use crate::entity::EntityId;
use crate::error::StorageError;

type ObjectKey = (Scope, String, String);

/// Mutex-guarded map implementing [`Storage`].
#[derive(Debug)]
pub struct MemoryStorage {
    local_id: EntityId,
    objects: Mutex<HashMap<ObjectKey, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(local_id: EntityId) -> Self {
        Self {
            local_id,
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored objects across all scopes.
    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored object in place, e.g. to simulate corruption.
    ///
    /// Returns `false` if nothing is stored under the key.
    pub fn tamper<F>(&self, scope: Scope, owner: &EntityId, key: &str, f: F) -> bool
    where
        F: FnOnce(&mut Vec<u8>),
    {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        match objects.get_mut(&(scope, owner.to_string(), key.to_string())) {
            Some(bytes) => {
                f(bytes);
                true
            }
            None => false,
        }
    }

    fn read(&self, scope: Scope, owner: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(scope, owner.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location(scope, owner, key)))
    }

    fn write(
        &self,
        scope: Scope,
        owner: &str,
        key: &str,
        data: &[u8],
    ) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope, owner.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }
}

impl Storage for MemoryStorage {
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
