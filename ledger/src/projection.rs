//! Caller-relative read projection.
//!
//! Pure functions from a borrowed ledger plus a caller identity to owned view
//! records. Nothing here writes to the ledger.

use ideas_types::{Address, CommentId, ContentLocator, IdeaId, Timestamp, UserVote};
use serde::{Deserialize, Serialize};

use crate::{Comment, Idea, IdeaLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub idea_id: IdeaId,
    pub author: Address,
    pub description_locator: ContentLocator,
    pub created_on: Timestamp,
    pub can_delete: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaView {
    pub id: IdeaId,
    /// Empty for tombstones.
    pub title: String,
    pub description_locator: ContentLocator,
    pub author: Address,
    pub created_on: Timestamp,
    pub approved_count: u64,
    pub rejected_count: u64,
    pub user_vote: UserVote,
    pub can_vote_for_idea: bool,
    pub can_change: bool,
    pub comments: Vec<CommentView>,
}

impl IdeaView {
    pub fn is_tombstone(&self) -> bool {
        self.title.is_empty()
    }
}

/// One view per idea slot in ascending id order, tombstones included.
pub fn project_all(ledger: &IdeaLedger, caller: &Address) -> Vec<IdeaView> {
    ledger
        .ideas()
        .iter()
        .map(|idea| view_of(ledger, idea, caller))
        .collect()
}

pub fn project_one(ledger: &IdeaLedger, id: IdeaId, caller: &Address) -> Option<IdeaView> {
    ledger
        .ideas()
        .get(id)
        .map(|idea| view_of(ledger, idea, caller))
}

/// Drop tombstones from a projection.
pub fn live(views: Vec<IdeaView>) -> Vec<IdeaView> {
    views.into_iter().filter(|view| !view.is_tombstone()).collect()
}

fn view_of(ledger: &IdeaLedger, idea: &Idea, caller: &Address) -> IdeaView {
    let roles = ledger.roles();
    let tally = ledger.votes().tally(idea.id);
    IdeaView {
        id: idea.id,
        title: idea.title.clone(),
        description_locator: idea.description_locator.clone(),
        author: idea.author.clone(),
        created_on: idea.created_on,
        approved_count: tally.approved,
        rejected_count: tally.rejected,
        user_vote: ledger.votes().vote_of(idea.id, caller).into(),
        can_vote_for_idea: !idea.is_tombstone() && *caller != idea.author,
        can_change: roles.can_change(caller, &idea.author),
        comments: ledger
            .comments()
            .for_idea(idea.id)
            .iter()
            .map(|comment| comment_view(ledger, comment, caller))
            .collect(),
    }
}

fn comment_view(ledger: &IdeaLedger, comment: &Comment, caller: &Address) -> CommentView {
    CommentView {
        id: comment.id,
        idea_id: comment.idea_id,
        author: comment.author.clone(),
        description_locator: comment.description_locator.clone(),
        created_on: comment.created_on,
        can_delete: ledger.roles().can_change(caller, &comment.author),
    }
}
