//! Filesystem content store: one file per locator under a root directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ideas_types::ContentLocator;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{locator_for, validate_locator, ContentStore, StoreError};

#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, locator: &ContentLocator) -> Result<PathBuf, StoreError> {
        validate_locator(locator)?;
        Ok(self.root.join(locator.as_str()))
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentLocator, StoreError> {
        let locator = locator_for(bytes)?;
        let path = self.path_of(&locator)?;
        if path.exists() {
            return Ok(locator);
        }

        // Each writer stages into its own file; the final name only ever
        // holds a complete body. Identical bodies may race to the same name.
        let mut staging = NamedTempFile::new_in(&self.root)?;
        staging.write_all(bytes)?;
        staging.as_file().sync_all()?;
        if let Err(e) = staging.persist(&path) {
            if !path.exists() {
                return Err(StoreError::Io(e.error));
            }
        }
        debug!(%locator, size = bytes.len(), "content stored");
        Ok(locator)
    }

    fn get(&self, locator: &ContentLocator) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(locator)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(locator.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn unpin(&self, locator: &ContentLocator) -> Result<(), StoreError> {
        let path = self.path_of(locator)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(locator.to_string()),
            _ => StoreError::Io(e),
        })?;
        debug!(%locator, "content unpinned");
        Ok(())
    }
}
