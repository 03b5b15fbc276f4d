//! Client protocol and per-connection subscription state.

use std::collections::HashSet;

use ideas_ledger::{EventKind, EventReplay, LedgerEvent, SequencedEvent};
use ideas_types::IdeaId;
use serde::{Deserialize, Serialize};

/// Messages a client may send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start (or restart) the subscription. `since` is the last sequence the
    /// client has already processed; without it only new events are sent.
    Subscribe {
        #[serde(default)]
        since: Option<u64>,
        #[serde(default)]
        filter: Option<SubscriptionFilter>,
    },
    Unsubscribe,
    Ping,
}

/// Messages the server sends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack { action: String },
    Event { sequence: u64, event: LedgerEvent },
    /// Events were missed; refetch the full listing and continue from
    /// `high_water_mark`.
    Resync { high_water_mark: u64 },
    Pong,
    Error { message: String },
}

impl From<SequencedEvent> for ServerMessage {
    fn from(event: SequencedEvent) -> Self {
        ServerMessage::Event {
            sequence: event.sequence,
            event: event.event,
        }
    }
}

/// Restricts delivery to some ideas and/or some event kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    #[serde(default)]
    pub ideas: Option<HashSet<IdeaId>>,
    #[serde(default)]
    pub kinds: Option<HashSet<EventKind>>,
}

impl SubscriptionFilter {
    /// Events that name no idea (comment deletions) pass the idea filter.
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        let idea_ok = match (&self.ideas, event.idea_id()) {
            (Some(ideas), Some(id)) => ideas.contains(&id),
            _ => true,
        };
        let kind_ok = self
            .kinds
            .as_ref()
            .map_or(true, |kinds| kinds.contains(&event.kind()));
        idea_ok && kind_ok
    }
}

/// Delivery state of one subscribed connection.
#[derive(Clone, Debug, Default)]
pub struct ClientSubscription {
    filter: SubscriptionFilter,
    last_delivered: u64,
}

impl ClientSubscription {
    pub fn new(filter: Option<SubscriptionFilter>, last_delivered: u64) -> Self {
        Self {
            filter: filter.unwrap_or_default(),
            last_delivered,
        }
    }

    pub fn last_delivered(&self) -> u64 {
        self.last_delivered
    }

    /// Whether `event` should go to the client. Advances the high-water mark
    /// for every new sequence, filtered or not.
    pub fn accept(&mut self, event: &SequencedEvent) -> bool {
        if event.sequence <= self.last_delivered {
            return false;
        }
        self.last_delivered = event.sequence;
        self.filter.matches(&event.event)
    }

    /// Skip ahead after a resync; nothing at or below `mark` is sent later.
    pub fn fast_forward(&mut self, mark: u64) {
        self.last_delivered = self.last_delivered.max(mark);
    }

    /// Messages that bring a client holding `mark` up to date with `replay`.
    ///
    /// A mark the log no longer covers, or one from the future, yields a
    /// single `resync`.
    pub fn catch_up(&mut self, mark: u64, replay: EventReplay) -> Vec<ServerMessage> {
        if replay.gap || mark > replay.high_water_mark {
            self.fast_forward(replay.high_water_mark);
            return vec![ServerMessage::Resync {
                high_water_mark: replay.high_water_mark,
            }];
        }
        let messages = replay
            .events
            .into_iter()
            .filter(|event| self.accept(event))
            .map(ServerMessage::from)
            .collect();
        self.fast_forward(replay.high_water_mark);
        messages
    }
}
