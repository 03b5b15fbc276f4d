//! The content store trait and locator derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ideas_types::ContentLocator;

use crate::StoreError;

/// Locators are the hex Blake2b-256 digest of the body.
pub const LOCATOR_HEX_LEN: usize = 64;

/// Opaque content-addressed blob store.
///
/// Identical bodies map to the same locator, so `put` is idempotent.
pub trait ContentStore: Send + Sync {
    /// Store a body and return its locator.
    fn put(&self, bytes: &[u8]) -> Result<ContentLocator, StoreError>;

    /// Fetch the body behind a locator.
    fn get(&self, locator: &ContentLocator) -> Result<Vec<u8>, StoreError>;

    /// Release a body. Later `get`s fail with `NotFound` until it is stored again.
    fn unpin(&self, locator: &ContentLocator) -> Result<(), StoreError>;
}

/// Compute the locator a body will be stored under.
pub fn locator_for(bytes: &[u8]) -> Result<ContentLocator, StoreError> {
    let digest = Blake2b::<U32>::digest(bytes);
    ContentLocator::new(hex::encode(digest)).map_err(|e| StoreError::InvalidLocator(e.to_string()))
}

/// Reject locators this store could never have produced.
pub fn validate_locator(locator: &ContentLocator) -> Result<(), StoreError> {
    let raw = locator.as_str();
    let well_formed = raw.len() == LOCATOR_HEX_LEN
        && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(StoreError::InvalidLocator(raw.to_string()))
    }
}
