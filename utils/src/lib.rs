//! Shared utilities for the ideas ledger services.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
