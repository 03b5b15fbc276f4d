//! WebSocket server for live ledger events.
//!
//! Clients subscribe with the last sequence they have seen and receive:
//! - a replay of retained events after that mark, or a `resync` notice when
//!   the log no longer covers it
//! - every later event, optionally filtered by idea and event kind
//!
//! Events are never delivered twice: anything at or below the last delivered
//! sequence is dropped.

pub mod error;
pub mod server;
pub mod subscriptions;

pub use error::WsError;
pub use server::{WebSocketServer, WsState};
pub use subscriptions::{ClientMessage, ClientSubscription, ServerMessage, SubscriptionFilter};
