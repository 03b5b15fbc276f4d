//! Idea store: the append-only, index-addressed array of idea slots.
//!
//! A slot is never removed. Deletion clears the title, turning the slot into a
//! tombstone whose author and creation time stay readable for audit.

use ideas_types::{Address, ContentLocator, IdeaId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    /// Empty for tombstones.
    pub title: String,
    pub description_locator: ContentLocator,
    pub author: Address,
    pub created_on: Timestamp,
}

impl Idea {
    pub fn is_tombstone(&self) -> bool {
        self.title.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct IdeaStore {
    slots: Vec<Idea>,
}

impl IdeaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from slots, which must be ordered by id starting at 0.
    pub(crate) fn from_slots(slots: Vec<Idea>) -> Result<Self, LedgerError> {
        for (index, idea) in slots.iter().enumerate() {
            if idea.id.index() != Some(index) {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "idea {} stored in slot {index}",
                    idea.id
                )));
            }
        }
        Ok(Self { slots })
    }

    /// The id the next created idea will receive.
    pub fn next_id(&self) -> IdeaId {
        IdeaId::new(self.slots.len() as u64)
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|idea| !idea.is_tombstone()).count()
    }

    /// Any slot, tombstones included.
    pub fn get(&self, id: IdeaId) -> Option<&Idea> {
        id.index().and_then(|index| self.slots.get(index))
    }

    /// A slot that can still be edited, voted on or commented on.
    pub fn live(&self, id: IdeaId) -> Result<&Idea, LedgerError> {
        self.get(id)
            .filter(|idea| !idea.is_tombstone())
            .ok_or(LedgerError::IdeaNotFound(id))
    }

    fn live_mut(&mut self, id: IdeaId) -> Result<&mut Idea, LedgerError> {
        id.index()
            .and_then(|index| self.slots.get_mut(index))
            .filter(|idea| !idea.is_tombstone())
            .ok_or(LedgerError::IdeaNotFound(id))
    }

    /// All slots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Idea> {
        self.slots.iter()
    }

    pub(crate) fn push(
        &mut self,
        title: String,
        description_locator: ContentLocator,
        author: Address,
        created_on: Timestamp,
    ) -> IdeaId {
        let id = self.next_id();
        self.slots.push(Idea {
            id,
            title,
            description_locator,
            author,
            created_on,
        });
        id
    }

    pub(crate) fn set_title(&mut self, id: IdeaId, title: String) -> Result<(), LedgerError> {
        self.live_mut(id)?.title = title;
        Ok(())
    }

    pub(crate) fn set_description(
        &mut self,
        id: IdeaId,
        locator: ContentLocator,
    ) -> Result<(), LedgerError> {
        self.live_mut(id)?.description_locator = locator;
        Ok(())
    }

    pub(crate) fn tombstone(&mut self, id: IdeaId) -> Result<(), LedgerError> {
        self.live_mut(id)?.title.clear();
        Ok(())
    }
}

/// Titles must contain a visible character; the empty title is the tombstone marker.
pub(crate) fn validate_title(title: &str) -> Result<(), LedgerError> {
    if title.trim().is_empty() {
        return Err(LedgerError::InvalidInput("title must not be empty".into()));
    }
    Ok(())
}
