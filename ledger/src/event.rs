//! Events emitted for every accepted mutation, the replayable event log and
//! the synchronous listener bus.

use std::collections::VecDeque;

use ideas_types::{Address, CommentId, IdeaId, VoteDecision};
use serde::{Deserialize, Serialize};

/// Default number of events kept for replay.
pub const DEFAULT_EVENT_RETENTION: usize = 10_000;

/// Which idea attribute an edit changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaField {
    Title,
    Description,
}

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A new idea slot was appended.
    IdeaCreated { id: IdeaId },
    /// The title or description locator of an idea changed.
    IdeaEdited { id: IdeaId, field: IdeaField },
    /// An idea became a tombstone.
    IdeaDeleted { id: IdeaId },
    /// A voter recorded (or repeated) a decision.
    UserVotePerformed {
        id: IdeaId,
        voter: Address,
        decision: VoteDecision,
    },
    CommentAdded {
        comment_id: CommentId,
        idea_id: IdeaId,
    },
    CommentDeleted { comment_id: CommentId },
}

/// The kind of a [`LedgerEvent`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    IdeaCreated,
    IdeaEdited,
    IdeaDeleted,
    UserVotePerformed,
    CommentAdded,
    CommentDeleted,
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::IdeaCreated { .. } => EventKind::IdeaCreated,
            Self::IdeaEdited { .. } => EventKind::IdeaEdited,
            Self::IdeaDeleted { .. } => EventKind::IdeaDeleted,
            Self::UserVotePerformed { .. } => EventKind::UserVotePerformed,
            Self::CommentAdded { .. } => EventKind::CommentAdded,
            Self::CommentDeleted { .. } => EventKind::CommentDeleted,
        }
    }

    /// The idea this event concerns, when the payload names one.
    pub fn idea_id(&self) -> Option<IdeaId> {
        match self {
            Self::IdeaCreated { id }
            | Self::IdeaEdited { id, .. }
            | Self::IdeaDeleted { id }
            | Self::UserVotePerformed { id, .. } => Some(*id),
            Self::CommentAdded { idea_id, .. } => Some(*idea_id),
            Self::CommentDeleted { .. } => None,
        }
    }
}

/// An event together with its position in the log. Sequences start at 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub event: LedgerEvent,
}

/// Result of asking the log for everything after a high-water mark.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReplay {
    pub events: Vec<SequencedEvent>,
    /// Some events after the mark are no longer retained; the listener must
    /// refetch the full projection instead of relying on `events`.
    pub gap: bool,
    pub high_water_mark: u64,
}

/// Append-only log of the most recent events.
#[derive(Clone, Debug)]
pub struct EventLog {
    entries: VecDeque<SequencedEvent>,
    retention: usize,
    last_sequence: u64,
}

impl EventLog {
    pub fn new(retention: usize) -> Self {
        Self::resume(retention, 0)
    }

    /// An empty log whose next event follows `last_sequence`.
    pub fn resume(retention: usize, last_sequence: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
            last_sequence,
        }
    }

    pub fn append(&mut self, event: LedgerEvent) -> SequencedEvent {
        self.last_sequence += 1;
        let entry = SequencedEvent {
            sequence: self.last_sequence,
            event,
        };
        self.entries.push_back(entry.clone());
        while self.entries.len() > self.retention {
            self.entries.pop_front();
        }
        entry
    }

    /// Sequence of the latest event, 0 when nothing was ever emitted.
    pub fn high_water_mark(&self) -> u64 {
        self.last_sequence
    }

    pub fn retained(&self) -> usize {
        self.entries.len()
    }

    /// All retained events with a sequence above `mark`.
    pub fn since(&self, mark: u64) -> EventReplay {
        let oldest_retained = self
            .entries
            .front()
            .map(|e| e.sequence)
            .unwrap_or(self.last_sequence + 1);
        let gap = mark < self.last_sequence && mark + 1 < oldest_retained;
        let events = self
            .entries
            .iter()
            .filter(|e| e.sequence > mark)
            .cloned()
            .collect();
        EventReplay {
            events,
            gap,
            high_water_mark: self.last_sequence,
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_RETENTION)
    }
}

pub type Listener = Box<dyn Fn(&SequencedEvent) + Send + Sync>;

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline while the writer still holds the ledger; keep
/// handlers fast to avoid stalling mutations.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &SequencedEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
