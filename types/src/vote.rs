//! Vote decisions and the caller-relative vote state.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// A decision a voter can record on an idea. Wire codes: 1 = approve, 2 = reject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDecision {
    Approved,
    Rejected,
}

impl VoteDecision {
    pub fn code(&self) -> u8 {
        match self {
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }
}

impl TryFrom<u8> for VoteDecision {
    type Error = TypesError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Approved),
            2 => Ok(Self::Rejected),
            other => Err(TypesError::InvalidDecision(other)),
        }
    }
}

/// The vote a specific caller currently holds on an idea.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserVote {
    /// No vote recorded.
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl UserVote {
    /// Wire code: 0 = pending, 1 = approved, 2 = rejected.
    pub fn code(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }
}

impl From<Option<VoteDecision>> for UserVote {
    fn from(decision: Option<VoteDecision>) -> Self {
        match decision {
            None => Self::Pending,
            Some(VoteDecision::Approved) => Self::Approved,
            Some(VoteDecision::Rejected) => Self::Rejected,
        }
    }
}

impl From<VoteDecision> for UserVote {
    fn from(decision: VoteDecision) -> Self {
        Some(decision).into()
    }
}
