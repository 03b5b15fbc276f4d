//! Comment store.
//!
//! Comments are grouped per idea but addressed by a ledger-wide id. Unlike
//! ideas they are physically removed on deletion.

use std::collections::{BTreeMap, HashMap};

use ideas_types::{Address, CommentId, ContentLocator, IdeaId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub idea_id: IdeaId,
    pub author: Address,
    pub description_locator: ContentLocator,
    pub created_on: Timestamp,
}

#[derive(Clone, Debug, Default)]
pub struct CommentStore {
    /// Per idea, in ascending comment id order.
    by_idea: BTreeMap<IdeaId, Vec<Comment>>,
    owners: HashMap<CommentId, IdeaId>,
    next_id: CommentId,
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        comments: Vec<Comment>,
        next_id: CommentId,
    ) -> Result<Self, LedgerError> {
        let mut store = Self {
            next_id,
            ..Self::default()
        };
        for comment in comments {
            if comment.id >= next_id {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "comment {} is not below the next id {next_id}",
                    comment.id
                )));
            }
            if store.owners.insert(comment.id, comment.idea_id).is_some() {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "comment {} appears twice",
                    comment.id
                )));
            }
            store.by_idea.entry(comment.idea_id).or_default().push(comment);
        }
        for comments in store.by_idea.values_mut() {
            comments.sort_by_key(|c| c.id);
        }
        Ok(store)
    }

    /// The id the next added comment will receive.
    pub fn next_id(&self) -> CommentId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Resolve a comment by its ledger-wide id.
    ///
    /// This is the only place that maps a comment reference to a record, so a
    /// deployment addressing comments by idea-scoped index would swap this out.
    pub fn locate(&self, id: CommentId) -> Option<&Comment> {
        let idea_id = self.owners.get(&id)?;
        self.by_idea
            .get(idea_id)?
            .iter()
            .find(|comment| comment.id == id)
    }

    pub fn for_idea(&self, idea_id: IdeaId) -> &[Comment] {
        self.by_idea
            .get(&idea_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.by_idea.values().flatten()
    }

    pub(crate) fn insert(
        &mut self,
        idea_id: IdeaId,
        author: Address,
        description_locator: ContentLocator,
        created_on: Timestamp,
    ) -> CommentId {
        let id = self.next_id;
        self.next_id = id.next();
        self.owners.insert(id, idea_id);
        self.by_idea.entry(idea_id).or_default().push(Comment {
            id,
            idea_id,
            author,
            description_locator,
            created_on,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: CommentId) -> Result<Comment, LedgerError> {
        let idea_id = self
            .owners
            .get(&id)
            .copied()
            .ok_or(LedgerError::CommentNotFound(id))?;
        let comments = self
            .by_idea
            .get_mut(&idea_id)
            .ok_or(LedgerError::CommentNotFound(id))?;
        let position = comments
            .iter()
            .position(|comment| comment.id == id)
            .ok_or(LedgerError::CommentNotFound(id))?;
        let removed = comments.remove(position);
        if comments.is_empty() {
            self.by_idea.remove(&idea_id);
        }
        self.owners.remove(&id);
        Ok(removed)
    }
}
