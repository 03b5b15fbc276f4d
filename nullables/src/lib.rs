//! Nullable infrastructure for deterministic testing.
//!
//! External inputs the ledger and its surfaces depend on (wall-clock time,
//! event listeners) get test-friendly stand-ins here that:
//! - return deterministic values
//! - can be controlled programmatically
//! - never touch the filesystem or network

pub mod clock;
pub mod recorder;

pub use clock::NullClock;
pub use recorder::EventRecorder;
