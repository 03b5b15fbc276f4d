//! Content-addressed storage for description bodies.
//!
//! The ledger only ever records locators; the bodies they point at live
//! behind the [`ContentStore`] trait. The RPC layer stores a body first and
//! then hands the returned locator to the ledger.

pub mod content;
pub mod error;
pub mod fs;
pub mod memory;

pub use content::{locator_for, validate_locator, ContentStore, LOCATOR_HEX_LEN};
pub use error::StoreError;
pub use fs::FsContentStore;
pub use memory::MemoryContentStore;
