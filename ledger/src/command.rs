//! The mutating operations, as values.

use ideas_types::{CommentId, ContentLocator, IdeaId, VoteDecision};
use serde::{Deserialize, Serialize};

/// One mutating call against the ledger. Fed to [`crate::IdeaLedger::apply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LedgerCommand {
    CreateIdea {
        title: String,
        description_locator: ContentLocator,
    },
    EditIdeaTitle {
        id: IdeaId,
        title: String,
    },
    EditIdeaDescription {
        id: IdeaId,
        description_locator: ContentLocator,
    },
    DeleteIdea {
        id: IdeaId,
    },
    VoteForIdea {
        id: IdeaId,
        decision: VoteDecision,
    },
    AddComment {
        idea_id: IdeaId,
        description_locator: ContentLocator,
    },
    DeleteComment {
        comment_id: CommentId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateIdea,
    EditIdeaTitle,
    EditIdeaDescription,
    DeleteIdea,
    VoteForIdea,
    AddComment,
    DeleteComment,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIdea => "create_idea",
            Self::EditIdeaTitle => "edit_idea_title",
            Self::EditIdeaDescription => "edit_idea_description",
            Self::DeleteIdea => "delete_idea",
            Self::VoteForIdea => "vote_for_idea",
            Self::AddComment => "add_comment",
            Self::DeleteComment => "delete_comment",
        }
    }
}

impl LedgerCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateIdea { .. } => CommandKind::CreateIdea,
            Self::EditIdeaTitle { .. } => CommandKind::EditIdeaTitle,
            Self::EditIdeaDescription { .. } => CommandKind::EditIdeaDescription,
            Self::DeleteIdea { .. } => CommandKind::DeleteIdea,
            Self::VoteForIdea { .. } => CommandKind::VoteForIdea,
            Self::AddComment { .. } => CommandKind::AddComment,
            Self::DeleteComment { .. } => CommandKind::DeleteComment,
        }
    }
}
