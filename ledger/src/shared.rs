//! Shared single-writer handle over [`IdeaLedger`].
//!
//! Every mutation runs under the write guard from authorization to event
//! emission; reads take the read guard and always observe a fully applied
//! state.

use std::sync::Arc;

use ideas_types::{Address, Clock, CommentId, ContentLocator, IdeaId, Timestamp, VoteDecision};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    project_all, project_one, CommandKind, EventBus, EventReplay, IdeaLedger, IdeaView,
    LedgerCommand, LedgerError, LedgerSnapshot, LedgerStats, Listener, Receipt, SequencedEvent,
};

struct LedgerState {
    ledger: IdeaLedger,
    bus: EventBus,
}

#[derive(Clone)]
pub struct SharedLedger {
    state: Arc<RwLock<LedgerState>>,
    clock: Arc<dyn Clock>,
}

impl SharedLedger {
    pub fn new(ledger: IdeaLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                ledger,
                bus: EventBus::new(),
            })),
            clock,
        }
    }

    /// Register a listener called with every accepted event, in sequence order.
    pub async fn subscribe(&self, listener: Listener) {
        self.state.write().await.bus.subscribe(listener);
    }

    pub async fn apply(
        &self,
        caller: &Address,
        command: LedgerCommand,
    ) -> Result<SequencedEvent, LedgerError> {
        let kind = command.kind();
        self.mutate(caller, kind, |ledger, now| {
            ledger
                .apply(caller, command, now)
                .map(|event| Receipt { value: (), event })
        })
        .await
        .map(|receipt| receipt.event)
    }

    pub async fn create_idea(
        &self,
        caller: &Address,
        title: String,
        description_locator: ContentLocator,
    ) -> Result<Receipt<IdeaId>, LedgerError> {
        self.mutate(caller, CommandKind::CreateIdea, |ledger, now| {
            ledger.create_idea(caller, title, description_locator, now)
        })
        .await
    }

    pub async fn edit_idea_title(
        &self,
        caller: &Address,
        id: IdeaId,
        title: String,
    ) -> Result<Receipt<()>, LedgerError> {
        self.mutate(caller, CommandKind::EditIdeaTitle, |ledger, _| {
            ledger.edit_idea_title(caller, id, title)
        })
        .await
    }

    pub async fn edit_idea_description(
        &self,
        caller: &Address,
        id: IdeaId,
        description_locator: ContentLocator,
    ) -> Result<Receipt<()>, LedgerError> {
        self.mutate(caller, CommandKind::EditIdeaDescription, |ledger, _| {
            ledger.edit_idea_description(caller, id, description_locator)
        })
        .await
    }

    pub async fn delete_idea(&self, caller: &Address, id: IdeaId) -> Result<Receipt<()>, LedgerError> {
        self.mutate(caller, CommandKind::DeleteIdea, |ledger, _| {
            ledger.delete_idea(caller, id)
        })
        .await
    }

    pub async fn vote_for_idea(
        &self,
        caller: &Address,
        id: IdeaId,
        decision: VoteDecision,
    ) -> Result<Receipt<()>, LedgerError> {
        self.mutate(caller, CommandKind::VoteForIdea, |ledger, _| {
            ledger.vote_for_idea(caller, id, decision)
        })
        .await
    }

    pub async fn add_comment(
        &self,
        caller: &Address,
        idea_id: IdeaId,
        description_locator: ContentLocator,
    ) -> Result<Receipt<CommentId>, LedgerError> {
        self.mutate(caller, CommandKind::AddComment, |ledger, now| {
            ledger.add_comment(caller, idea_id, description_locator, now)
        })
        .await
    }

    pub async fn delete_comment(
        &self,
        caller: &Address,
        comment_id: CommentId,
    ) -> Result<Receipt<()>, LedgerError> {
        self.mutate(caller, CommandKind::DeleteComment, |ledger, _| {
            ledger.delete_comment(caller, comment_id)
        })
        .await
    }

    /// getAllIdeas for `caller`.
    pub async fn all_ideas(&self, caller: &Address) -> Vec<IdeaView> {
        project_all(&self.state.read().await.ledger, caller)
    }

    pub async fn idea(&self, id: IdeaId, caller: &Address) -> Option<IdeaView> {
        project_one(&self.state.read().await.ledger, id, caller)
    }

    pub async fn events_since(&self, mark: u64) -> EventReplay {
        self.state.read().await.ledger.events().since(mark)
    }

    pub async fn high_water_mark(&self) -> u64 {
        self.state.read().await.ledger.events().high_water_mark()
    }

    pub async fn stats(&self) -> LedgerStats {
        self.state.read().await.ledger.stats()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let now = self.clock.now();
        self.state.read().await.ledger.snapshot(now)
    }

    /// Run `f` under the write guard; on success, hand the event to every
    /// listener before the guard is released.
    async fn mutate<T, F>(
        &self,
        caller: &Address,
        kind: CommandKind,
        f: F,
    ) -> Result<Receipt<T>, LedgerError>
    where
        F: FnOnce(&mut IdeaLedger, Timestamp) -> Result<Receipt<T>, LedgerError>,
    {
        let mut state = self.state.write().await;
        let now = self.clock.now();
        match f(&mut state.ledger, now) {
            Ok(receipt) => {
                debug!(
                    command = kind.as_str(),
                    caller = %caller,
                    sequence = receipt.event.sequence,
                    "command accepted"
                );
                state.bus.emit(&receipt.event);
                Ok(receipt)
            }
            Err(e) => {
                debug!(command = kind.as_str(), caller = %caller, error = %e, "command rejected");
                Err(e)
            }
        }
    }
}
