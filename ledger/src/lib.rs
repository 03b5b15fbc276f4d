//! Record-and-vote ledger for community ideas.
//!
//! Ideas live in an append-only slot array (deletion leaves a tombstone so ids
//! stay stable), comments are keyed by a ledger-wide id, and votes are a
//! relation `(idea, voter) -> decision` with incrementally maintained tallies.
//! Every accepted mutation appends exactly one sequenced event.
//!
//! [`IdeaLedger`] is the single owned aggregate; [`SharedLedger`] serialises
//! concurrent callers through one exclusive-access guard.

pub mod command;
pub mod comment;
pub mod error;
pub mod event;
pub mod idea;
pub mod ledger;
pub mod projection;
pub mod role;
pub mod shared;
pub mod snapshot;
pub mod vote;

pub use command::{CommandKind, LedgerCommand};
pub use comment::{Comment, CommentStore};
pub use error::{ErrorKind, LedgerError};
pub use event::{
    EventBus, EventKind, EventLog, EventReplay, IdeaField, LedgerEvent, Listener, SequencedEvent,
    DEFAULT_EVENT_RETENTION,
};
pub use idea::{Idea, IdeaStore};
pub use ledger::{IdeaLedger, LedgerStats, Receipt};
pub use projection::{live, project_all, project_one, CommentView, IdeaView};
pub use role::{Role, Roles};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, VoteRecord, SNAPSHOT_VERSION};
pub use vote::{Tally, VoteChange, VoteLedger};
