//! Fundamental types for the ideas ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! caller addresses, timestamps, record identifiers, content locators and vote decisions.

pub mod address;
pub mod error;
pub mod id;
pub mod locator;
pub mod time;
pub mod vote;

pub use address::Address;
pub use error::TypesError;
pub use id::{CommentId, IdeaId};
pub use locator::ContentLocator;
pub use time::{Clock, SystemClock, Timestamp};
pub use vote::{UserVote, VoteDecision};
