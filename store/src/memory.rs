//! In-memory content store. Thread-safe; used by tests and ephemeral daemons.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ideas_types::ContentLocator;

use crate::{locator_for, validate_locator, ContentStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies().map(|bodies| bodies.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bodies(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.bodies
            .lock()
            .map_err(|_| StoreError::Backend("content map lock poisoned".into()))
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentLocator, StoreError> {
        let locator = locator_for(bytes)?;
        self.bodies()?
            .insert(locator.as_str().to_string(), bytes.to_vec());
        Ok(locator)
    }

    fn get(&self, locator: &ContentLocator) -> Result<Vec<u8>, StoreError> {
        validate_locator(locator)?;
        self.bodies()?
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }

    fn unpin(&self, locator: &ContentLocator) -> Result<(), StoreError> {
        validate_locator(locator)?;
        self.bodies()?
            .remove(locator.as_str())
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }
}
