use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("invalid content locator: {0}")]
    InvalidLocator(String),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}
