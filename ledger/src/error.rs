use ideas_types::{Address, CommentId, IdeaId, TypesError};
use thiserror::Error;

/// Reasons a ledger operation is rejected. A rejected operation has no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("idea {0} not found")]
    IdeaNotFound(IdeaId),

    #[error("comment {0} not found")]
    CommentNotFound(CommentId),

    #[error("caller {caller} is neither the author nor the administrator")]
    Unauthorized { caller: Address },

    #[error("the author of idea {0} cannot vote on it")]
    SelfVoteForbidden(IdeaId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("snapshot encoding failed: {0}")]
    SnapshotEncoding(String),
}

/// Coarse classification of [`LedgerError`], used for status codes and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    SelfVoteForbidden,
    InvalidInput,
    Snapshot,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::SelfVoteForbidden => "self_vote_forbidden",
            Self::InvalidInput => "invalid_input",
            Self::Snapshot => "snapshot",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdeaNotFound(_) | Self::CommentNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::SelfVoteForbidden(_) => ErrorKind::SelfVoteForbidden,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::CorruptSnapshot(_) | Self::SnapshotEncoding(_) => ErrorKind::Snapshot,
        }
    }
}

impl From<TypesError> for LedgerError {
    fn from(e: TypesError) -> Self {
        LedgerError::InvalidInput(e.to_string())
    }
}
