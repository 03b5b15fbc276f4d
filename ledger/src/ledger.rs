//! The ledger aggregate: idea store, comment store, vote ledger and event log
//! behind one set of authorization rules.
//!
//! Each operation validates everything before its first write, so a rejected
//! call leaves the aggregate untouched and emits nothing.

use ideas_types::{Address, CommentId, ContentLocator, IdeaId, Timestamp, VoteDecision};
use tracing::debug;

use crate::event::EventLog;
use crate::idea::validate_title;
use crate::{
    CommentStore, IdeaField, IdeaStore, LedgerCommand, LedgerError, LedgerEvent, Roles,
    SequencedEvent, VoteLedger,
};

/// The value an accepted operation produced, plus the event it emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub event: SequencedEvent,
}

/// Summary counters for the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub idea_slots: u64,
    pub live_ideas: u64,
    pub comments: u64,
    pub votes: u64,
    pub last_sequence: u64,
}

#[derive(Debug)]
pub struct IdeaLedger {
    pub(crate) roles: Roles,
    pub(crate) ideas: IdeaStore,
    pub(crate) comments: CommentStore,
    pub(crate) votes: VoteLedger,
    pub(crate) events: EventLog,
}

impl IdeaLedger {
    pub fn new(administrator: Address) -> Self {
        Self::with_event_retention(administrator, crate::DEFAULT_EVENT_RETENTION)
    }

    pub fn with_event_retention(administrator: Address, retention: usize) -> Self {
        Self {
            roles: Roles::new(administrator),
            ideas: IdeaStore::new(),
            comments: CommentStore::new(),
            votes: VoteLedger::new(),
            events: EventLog::new(retention),
        }
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn ideas(&self) -> &IdeaStore {
        &self.ideas
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    pub fn votes(&self) -> &VoteLedger {
        &self.votes
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            idea_slots: self.ideas.len() as u64,
            live_ideas: self.ideas.live_count() as u64,
            comments: self.comments.len() as u64,
            votes: self.votes.relations().count() as u64,
            last_sequence: self.events.high_water_mark(),
        }
    }

    /// Single mutation entry point: run `command` on behalf of `caller`.
    pub fn apply(
        &mut self,
        caller: &Address,
        command: LedgerCommand,
        now: Timestamp,
    ) -> Result<SequencedEvent, LedgerError> {
        let event = match command {
            LedgerCommand::CreateIdea {
                title,
                description_locator,
            } => self.create_idea(caller, title, description_locator, now)?.event,
            LedgerCommand::EditIdeaTitle { id, title } => {
                self.edit_idea_title(caller, id, title)?.event
            }
            LedgerCommand::EditIdeaDescription {
                id,
                description_locator,
            } => self.edit_idea_description(caller, id, description_locator)?.event,
            LedgerCommand::DeleteIdea { id } => self.delete_idea(caller, id)?.event,
            LedgerCommand::VoteForIdea { id, decision } => {
                self.vote_for_idea(caller, id, decision)?.event
            }
            LedgerCommand::AddComment {
                idea_id,
                description_locator,
            } => self.add_comment(caller, idea_id, description_locator, now)?.event,
            LedgerCommand::DeleteComment { comment_id } => {
                self.delete_comment(caller, comment_id)?.event
            }
        };
        Ok(event)
    }

    /// Append a new idea. Open to every caller.
    pub fn create_idea(
        &mut self,
        caller: &Address,
        title: impl Into<String>,
        description_locator: ContentLocator,
        now: Timestamp,
    ) -> Result<Receipt<IdeaId>, LedgerError> {
        let title = title.into();
        validate_title(&title)?;

        let id = self
            .ideas
            .push(title, description_locator, caller.clone(), now);
        Ok(self.emit(id, LedgerEvent::IdeaCreated { id }))
    }

    pub fn edit_idea_title(
        &mut self,
        caller: &Address,
        id: IdeaId,
        title: impl Into<String>,
    ) -> Result<Receipt<()>, LedgerError> {
        let title = title.into();
        let idea = self.ideas.live(id)?;
        self.roles.authorize(caller, &idea.author)?;
        validate_title(&title)?;

        self.ideas.set_title(id, title)?;
        Ok(self.emit(
            (),
            LedgerEvent::IdeaEdited {
                id,
                field: IdeaField::Title,
            },
        ))
    }

    pub fn edit_idea_description(
        &mut self,
        caller: &Address,
        id: IdeaId,
        description_locator: ContentLocator,
    ) -> Result<Receipt<()>, LedgerError> {
        let idea = self.ideas.live(id)?;
        self.roles.authorize(caller, &idea.author)?;

        self.ideas.set_description(id, description_locator)?;
        Ok(self.emit(
            (),
            LedgerEvent::IdeaEdited {
                id,
                field: IdeaField::Description,
            },
        ))
    }

    /// Turn an idea into a tombstone. Irreversible; deleting a tombstone is `IdeaNotFound`.
    pub fn delete_idea(&mut self, caller: &Address, id: IdeaId) -> Result<Receipt<()>, LedgerError> {
        let idea = self.ideas.live(id)?;
        self.roles.authorize(caller, &idea.author)?;

        self.ideas.tombstone(id)?;
        Ok(self.emit((), LedgerEvent::IdeaDeleted { id }))
    }

    /// Record or overwrite the caller's vote. The administrator role does not
    /// lift the self-vote rule.
    pub fn vote_for_idea(
        &mut self,
        caller: &Address,
        id: IdeaId,
        decision: VoteDecision,
    ) -> Result<Receipt<()>, LedgerError> {
        let idea = self.ideas.live(id)?;
        let change = self.votes.cast(idea, caller, decision)?;
        debug!(idea = %id, voter = %caller, ?decision, ?change, "vote recorded");

        Ok(self.emit(
            (),
            LedgerEvent::UserVotePerformed {
                id,
                voter: caller.clone(),
                decision,
            },
        ))
    }

    /// Comment on a live idea. Open to every caller.
    pub fn add_comment(
        &mut self,
        caller: &Address,
        idea_id: IdeaId,
        description_locator: ContentLocator,
        now: Timestamp,
    ) -> Result<Receipt<CommentId>, LedgerError> {
        self.ideas.live(idea_id)?;

        let comment_id = self
            .comments
            .insert(idea_id, caller.clone(), description_locator, now);
        Ok(self.emit(
            comment_id,
            LedgerEvent::CommentAdded {
                comment_id,
                idea_id,
            },
        ))
    }

    pub fn delete_comment(
        &mut self,
        caller: &Address,
        comment_id: CommentId,
    ) -> Result<Receipt<()>, LedgerError> {
        let comment = self
            .comments
            .locate(comment_id)
            .ok_or(LedgerError::CommentNotFound(comment_id))?;
        self.roles.authorize(caller, &comment.author)?;

        self.comments.remove(comment_id)?;
        Ok(self.emit((), LedgerEvent::CommentDeleted { comment_id }))
    }

    fn emit<T>(&mut self, value: T, event: LedgerEvent) -> Receipt<T> {
        let event = self.events.append(event);
        Receipt { value, event }
    }
}
