//! Snapshot file handling.
//!
//! The ledger is kept in memory; durability comes from periodically writing
//! a hashed [`LedgerSnapshot`] to `<data_dir>/ledger.snapshot`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ideas_ledger::{IdeaLedger, LedgerSnapshot};
use ideas_types::Address;
use tracing::{info, warn};

use crate::error::DaemonError;

/// Restore the ledger from `path`, or start an empty one when no file exists.
///
/// A snapshot naming a different administrator is refused.
pub fn load_or_init(
    path: &Path,
    administrator: &Address,
    event_retention: usize,
) -> Result<IdeaLedger, DaemonError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot found, starting empty ledger");
            return Ok(IdeaLedger::with_event_retention(
                administrator.clone(),
                event_retention,
            ));
        }
        Err(source) => {
            return Err(DaemonError::SnapshotIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let snapshot = LedgerSnapshot::from_bytes(&bytes)?;
    if &snapshot.administrator != administrator {
        return Err(DaemonError::Config(format!(
            "snapshot administrator {} differs from configured {}",
            snapshot.administrator, administrator
        )));
    }
    info!(
        path = %path.display(),
        hash = %snapshot.hash_hex(),
        last_sequence = snapshot.last_sequence,
        "restoring ledger snapshot"
    );
    Ok(IdeaLedger::restore(snapshot, event_retention)?)
}

/// Write `snapshot` to `path` through a sibling staging file and a rename.
pub fn save_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<(), DaemonError> {
    let bytes = snapshot.to_bytes()?;
    let io_err = |source: std::io::Error| DaemonError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let staging = path.with_extension("snapshot.tmp");
    fs::write(&staging, &bytes).map_err(io_err)?;
    if let Err(source) = fs::rename(&staging, path) {
        warn!(path = %staging.display(), error = %source, "failed to move snapshot into place");
        let _ = fs::remove_file(&staging);
        return Err(io_err(source));
    }
    info!(
        path = %path.display(),
        hash = %snapshot.hash_hex(),
        last_sequence = snapshot.last_sequence,
        "snapshot saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideas_ledger::{DEFAULT_EVENT_RETENTION, LedgerError};
    use ideas_types::{ContentLocator, Timestamp, VoteDecision};

    fn admin() -> Address {
        Address::from_index(0xad)
    }

    fn populated() -> IdeaLedger {
        let mut ledger = IdeaLedger::new(admin());
        let author = Address::from_index(1);
        let voter = Address::from_index(2);
        let now = Timestamp::new(1_000);
        let idea = ledger
            .create_idea(&author, "bike lanes", ContentLocator::new("h1").unwrap(), now)
            .unwrap()
            .value;
        ledger
            .vote_for_idea(&voter, idea, VoteDecision::Approved)
            .unwrap();
        ledger
            .add_comment(&voter, idea, ContentLocator::new("c1").unwrap(), now)
            .unwrap();
        ledger
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load_or_init(
            &dir.path().join("ledger.snapshot"),
            &admin(),
            DEFAULT_EVENT_RETENTION,
        )
        .unwrap();
        assert_eq!(ledger.stats().idea_slots, 0);
        assert_eq!(ledger.stats().last_sequence, 0);
    }

    #[test]
    fn saved_snapshot_restores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.snapshot");
        let ledger = populated();
        save_snapshot(&path, &ledger.snapshot(Timestamp::new(2_000))).unwrap();

        let restored = load_or_init(&path, &admin(), DEFAULT_EVENT_RETENTION).unwrap();
        assert_eq!(restored.stats(), ledger.stats());
        assert!(!path.with_extension("snapshot.tmp").exists());
    }

    #[test]
    fn overwrite_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.snapshot");
        save_snapshot(&path, &IdeaLedger::new(admin()).snapshot(Timestamp::EPOCH)).unwrap();
        let ledger = populated();
        save_snapshot(&path, &ledger.snapshot(Timestamp::EPOCH)).unwrap();

        let restored = load_or_init(&path, &admin(), DEFAULT_EVENT_RETENTION).unwrap();
        assert_eq!(restored.stats().idea_slots, 1);
    }

    #[test]
    fn other_administrator_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.snapshot");
        save_snapshot(&path, &populated().snapshot(Timestamp::EPOCH)).unwrap();

        let result = load_or_init(&path, &Address::from_index(0xbe), DEFAULT_EVENT_RETENTION);
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn garbage_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.snapshot");
        fs::write(&path, b"not a snapshot").unwrap();

        let result = load_or_init(&path, &admin(), DEFAULT_EVENT_RETENTION);
        assert!(matches!(
            result,
            Err(DaemonError::Ledger(LedgerError::CorruptSnapshot(_)))
        ));
    }
}
