//! Errors raised while parsing or constructing fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("content locator must not be empty")]
    EmptyLocator,

    #[error("invalid vote decision code {0}, expected 1 (approve) or 2 (reject)")]
    InvalidDecision(u8),
}
