//! Ledger snapshots: the full aggregate state at one event sequence.
//!
//! A snapshot carries a Blake2b-256 hash computed deterministically from its
//! content, so a damaged or hand-edited file is refused on restore instead of
//! producing a ledger with diverged tallies.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ideas_types::{Address, CommentId, IdeaId, Timestamp, VoteDecision};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::event::EventLog;
use crate::{Comment, CommentStore, Idea, IdeaLedger, IdeaStore, LedgerError, Roles, Tally, VoteLedger};

/// Bumped whenever the encoded layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One `(idea, voter) -> decision` relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub idea_id: IdeaId,
    pub voter: Address,
    pub decision: VoteDecision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    /// Blake2b-256 over everything except `hash` and `created_at`.
    pub hash: [u8; 32],
    pub created_at: Timestamp,
    pub administrator: Address,
    /// Every slot in id order, tombstones included.
    pub ideas: Vec<Idea>,
    pub comments: Vec<Comment>,
    pub next_comment_id: CommentId,
    /// Sorted by idea, then voter.
    pub votes: Vec<VoteRecord>,
    /// Sorted by idea. Ideas without votes are omitted.
    pub tallies: Vec<(IdeaId, Tally)>,
    /// Sequence of the last event applied before the snapshot was taken.
    pub last_sequence: u64,
}

impl LedgerSnapshot {
    fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.version.to_le_bytes());
        feed_str(&mut hasher, self.administrator.as_str());
        hasher.update((self.ideas.len() as u64).to_le_bytes());
        for idea in &self.ideas {
            hasher.update(idea.id.as_u64().to_le_bytes());
            feed_str(&mut hasher, &idea.title);
            feed_str(&mut hasher, idea.description_locator.as_str());
            feed_str(&mut hasher, idea.author.as_str());
            hasher.update(idea.created_on.as_secs().to_le_bytes());
        }
        hasher.update((self.comments.len() as u64).to_le_bytes());
        for comment in &self.comments {
            hasher.update(comment.id.as_u64().to_le_bytes());
            hasher.update(comment.idea_id.as_u64().to_le_bytes());
            feed_str(&mut hasher, comment.author.as_str());
            feed_str(&mut hasher, comment.description_locator.as_str());
            hasher.update(comment.created_on.as_secs().to_le_bytes());
        }
        hasher.update(self.next_comment_id.as_u64().to_le_bytes());
        hasher.update((self.votes.len() as u64).to_le_bytes());
        for vote in &self.votes {
            hasher.update(vote.idea_id.as_u64().to_le_bytes());
            feed_str(&mut hasher, vote.voter.as_str());
            hasher.update([vote.decision.code()]);
        }
        hasher.update((self.tallies.len() as u64).to_le_bytes());
        for (idea_id, tally) in &self.tallies {
            hasher.update(idea_id.as_u64().to_le_bytes());
            hasher.update(tally.approved.to_le_bytes());
            hasher.update(tally.rejected.to_le_bytes());
        }
        hasher.update(self.last_sequence.to_le_bytes());

        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Whether the stored hash matches the content.
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::SnapshotEncoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::CorruptSnapshot(e.to_string()))
    }
}

/// Length-prefix strings so adjacent fields cannot run into each other.
fn feed_str(hasher: &mut Blake2b<U32>, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

impl IdeaLedger {
    /// Capture the current state.
    pub fn snapshot(&self, created_at: Timestamp) -> LedgerSnapshot {
        let mut votes: Vec<VoteRecord> = self
            .votes
            .relations()
            .map(|(idea_id, voter, decision)| VoteRecord {
                idea_id,
                voter: voter.clone(),
                decision,
            })
            .collect();
        votes.sort_by(|a, b| (a.idea_id, &a.voter).cmp(&(b.idea_id, &b.voter)));

        let mut tallies: Vec<(IdeaId, Tally)> = self
            .votes
            .tallies()
            .filter(|(_, tally)| *tally != Tally::default())
            .collect();
        tallies.sort_by_key(|(idea_id, _)| *idea_id);

        let mut comments: Vec<Comment> = self.comments.iter().cloned().collect();
        comments.sort_by_key(|c| c.id);

        let mut snapshot = LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            hash: [0u8; 32],
            created_at,
            administrator: self.roles.administrator().clone(),
            ideas: self.ideas.iter().cloned().collect(),
            comments,
            next_comment_id: self.comments.next_id(),
            votes,
            tallies,
            last_sequence: self.events.high_water_mark(),
        };
        snapshot.hash = snapshot.compute_hash();
        snapshot
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// The hash, the slot layout and the tallies are all checked. The event log
    /// starts empty and continues numbering after `last_sequence`, so listeners
    /// holding an older mark see a gap.
    pub fn restore(snapshot: LedgerSnapshot, event_retention: usize) -> Result<Self, LedgerError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::CorruptSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        if !snapshot.verify() {
            return Err(LedgerError::CorruptSnapshot("hash mismatch".into()));
        }

        let ideas = IdeaStore::from_slots(snapshot.ideas)?;
        for comment in &snapshot.comments {
            if ideas.get(comment.idea_id).is_none() {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "comment {} refers to unknown idea {}",
                    comment.id, comment.idea_id
                )));
            }
        }
        for vote in &snapshot.votes {
            let idea = ideas.get(vote.idea_id).ok_or_else(|| {
                LedgerError::CorruptSnapshot(format!("vote on unknown idea {}", vote.idea_id))
            })?;
            if idea.author == vote.voter {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "author of idea {} has a vote on it",
                    vote.idea_id
                )));
            }
        }

        let comments = CommentStore::from_parts(snapshot.comments, snapshot.next_comment_id)?;
        let votes = VoteLedger::from_parts(
            snapshot
                .votes
                .into_iter()
                .map(|v| (v.idea_id, v.voter, v.decision)),
            snapshot.tallies,
        )?;

        info!(
            ideas = ideas.len(),
            comments = comments.len(),
            last_sequence = snapshot.last_sequence,
            "ledger restored from snapshot"
        );

        Ok(Self {
            roles: Roles::new(snapshot.administrator),
            ideas,
            comments,
            votes,
            events: EventLog::resume(event_retention, snapshot.last_sequence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideas_types::ContentLocator;

    fn locator(s: &str) -> ContentLocator {
        ContentLocator::new(s).unwrap()
    }

    fn populated() -> IdeaLedger {
        let admin = Address::from_index(0xad);
        let mut ledger = IdeaLedger::new(admin.clone());
        let alice = Address::from_index(1);
        let bob = Address::from_index(2);

        let first = ledger
            .create_idea(&alice, "first", locator("h1"), Timestamp::new(10))
            .unwrap()
            .value;
        let second = ledger
            .create_idea(&bob, "second", locator("h2"), Timestamp::new(11))
            .unwrap()
            .value;
        ledger.vote_for_idea(&bob, first, VoteDecision::Approved).unwrap();
        ledger.vote_for_idea(&admin, first, VoteDecision::Rejected).unwrap();
        ledger
            .add_comment(&alice, second, locator("c1"), Timestamp::new(12))
            .unwrap();
        ledger.delete_idea(&bob, second).unwrap();
        ledger
    }

    #[test]
    fn snapshot_verifies() {
        let snapshot = populated().snapshot(Timestamp::new(100));
        assert!(snapshot.verify());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.ideas.len(), 2);
        assert_eq!(snapshot.votes.len(), 2);
        assert_eq!(snapshot.last_sequence, 6);
    }

    #[test]
    fn hash_ignores_creation_time() {
        let ledger = populated();
        assert_eq!(
            ledger.snapshot(Timestamp::new(1)).hash,
            ledger.snapshot(Timestamp::new(2)).hash
        );
    }

    #[test]
    fn restore_preserves_state_and_sequence() {
        let original = populated();
        let bytes = original.snapshot(Timestamp::new(100)).to_bytes().unwrap();
        let mut restored =
            IdeaLedger::restore(LedgerSnapshot::from_bytes(&bytes).unwrap(), 16).unwrap();

        assert_eq!(restored.ideas().len(), 2);
        assert!(restored.ideas().get(IdeaId::new(1)).unwrap().is_tombstone());
        assert_eq!(
            restored.votes().tally(IdeaId::new(0)),
            Tally {
                approved: 1,
                rejected: 1
            }
        );
        assert_eq!(restored.comments().len(), 1);
        assert_eq!(restored.comments().next_id(), CommentId::new(1));

        let receipt = restored
            .create_idea(&Address::from_index(3), "third", locator("h3"), Timestamp::new(200))
            .unwrap();
        assert_eq!(receipt.value, IdeaId::new(2));
        assert_eq!(receipt.event.sequence, 7);
    }

    #[test]
    fn tampered_snapshot_is_refused() {
        let mut snapshot = populated().snapshot(Timestamp::new(100));
        snapshot.tallies[0].1.approved = 5;
        assert!(!snapshot.verify());
        assert!(matches!(
            IdeaLedger::restore(snapshot, 16),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn rehashed_inconsistent_tally_is_refused() {
        let mut snapshot = populated().snapshot(Timestamp::new(100));
        snapshot.tallies[0].1.approved = 5;
        snapshot.hash = snapshot.compute_hash();
        assert!(matches!(
            IdeaLedger::restore(snapshot, 16),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        assert!(matches!(
            LedgerSnapshot::from_bytes(&[1, 2, 3]),
            Err(LedgerError::CorruptSnapshot(_))
        ));
    }
}
