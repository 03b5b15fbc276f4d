//! Opaque reference to a body held in an external content-addressed store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A content locator such as a content hash or CID.
///
/// The ledger only stores and compares locators; it never resolves them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentLocator(String);

impl ContentLocator {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TypesError::EmptyLocator);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ContentLocator {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentLocator> for String {
    fn from(locator: ContentLocator) -> Self {
        locator.0
    }
}
