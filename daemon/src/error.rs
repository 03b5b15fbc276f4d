use std::path::PathBuf;

use ideas_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot file {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
