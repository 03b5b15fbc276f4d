//! HTTP/JSON API over the ideas ledger.
//!
//! Provides endpoints for:
//! - Listing ideas as seen by a caller (votes, permissions, comments)
//! - Creating, editing and deleting ideas
//! - Voting and commenting
//! - Event replay from a high-water mark
//! - Storing and fetching description bodies
//! - Health and Prometheus metrics

pub mod caller;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pagination;
pub mod routes;
pub mod server;

pub use caller::{Caller, Viewer, CALLER_HEADER};
pub use error::{ErrorResponse, RpcError, RpcResult};
pub use metrics::ApiMetrics;
pub use routes::create_router;
pub use server::{AppState, RpcServer};
