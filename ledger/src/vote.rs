//! Vote ledger: the `(idea, voter) -> decision` relation and its tallies.
//!
//! Tallies are adjusted in the same step as the relation write, so
//! `approved` always equals the number of `Approved` relations for the idea
//! and `rejected` the number of `Rejected` ones.

use std::collections::HashMap;

use ideas_types::{Address, IdeaId, VoteDecision};
use serde::{Deserialize, Serialize};

use crate::{Idea, LedgerError};

/// Aggregate counters for one idea.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub approved: u64,
    pub rejected: u64,
}

impl Tally {
    fn add(&mut self, decision: VoteDecision) {
        match decision {
            VoteDecision::Approved => self.approved += 1,
            VoteDecision::Rejected => self.rejected += 1,
        }
    }

    fn remove(&mut self, decision: VoteDecision) {
        let counter = match decision {
            VoteDecision::Approved => &mut self.approved,
            VoteDecision::Rejected => &mut self.rejected,
        };
        debug_assert!(*counter > 0, "tally underflow");
        *counter = counter.saturating_sub(1);
    }

    pub fn total(&self) -> u64 {
        self.approved + self.rejected
    }
}

/// What a cast vote did to the caller's relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteChange {
    /// The caller had no vote on this idea.
    First,
    /// The caller switched from `previous`.
    Changed { previous: VoteDecision },
    /// The caller repeated their current decision.
    Unchanged,
}

#[derive(Clone, Debug, Default)]
pub struct VoteLedger {
    relations: HashMap<IdeaId, HashMap<Address, VoteDecision>>,
    tallies: HashMap<IdeaId, Tally>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored relations and tallies, rejecting tallies that
    /// disagree with the relation set.
    pub(crate) fn from_parts(
        relations: impl IntoIterator<Item = (IdeaId, Address, VoteDecision)>,
        tallies: impl IntoIterator<Item = (IdeaId, Tally)>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::default();
        for (idea_id, voter, decision) in relations {
            let previous = ledger
                .relations
                .entry(idea_id)
                .or_default()
                .insert(voter.clone(), decision);
            if previous.is_some() {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "voter {voter} has two votes on idea {idea_id}"
                )));
            }
        }
        for (idea_id, tally) in tallies {
            if tally != Tally::default() {
                ledger.tallies.insert(idea_id, tally);
            }
        }
        for idea_id in ledger.relations.keys().chain(ledger.tallies.keys()) {
            if ledger.tally(*idea_id) != ledger.recount(*idea_id) {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "tally of idea {idea_id} does not match its votes"
                )));
            }
        }
        Ok(ledger)
    }

    pub fn vote_of(&self, idea_id: IdeaId, voter: &Address) -> Option<VoteDecision> {
        self.relations.get(&idea_id)?.get(voter).copied()
    }

    pub fn tally(&self, idea_id: IdeaId) -> Tally {
        self.tallies.get(&idea_id).copied().unwrap_or_default()
    }

    /// Count the relation set directly. Used only to audit the tallies.
    pub fn recount(&self, idea_id: IdeaId) -> Tally {
        let mut tally = Tally::default();
        if let Some(votes) = self.relations.get(&idea_id) {
            for decision in votes.values() {
                tally.add(*decision);
            }
        }
        tally
    }

    /// Whether every tally equals the recount of its relations.
    pub fn is_consistent(&self) -> bool {
        self.relations
            .keys()
            .chain(self.tallies.keys())
            .all(|idea_id| self.tally(*idea_id) == self.recount(*idea_id))
    }

    /// Every relation, in no particular order.
    pub fn relations(&self) -> impl Iterator<Item = (IdeaId, &Address, VoteDecision)> {
        self.relations.iter().flat_map(|(idea_id, votes)| {
            votes
                .iter()
                .map(move |(voter, decision)| (*idea_id, voter, *decision))
        })
    }

    pub fn tallies(&self) -> impl Iterator<Item = (IdeaId, Tally)> + '_ {
        self.tallies.iter().map(|(idea_id, tally)| (*idea_id, *tally))
    }

    /// Record `voter`'s decision on a live idea.
    ///
    /// The author of an idea can never vote on it, whatever their role.
    pub(crate) fn cast(
        &mut self,
        idea: &Idea,
        voter: &Address,
        decision: VoteDecision,
    ) -> Result<VoteChange, LedgerError> {
        if idea.author == *voter {
            return Err(LedgerError::SelfVoteForbidden(idea.id));
        }

        let previous = self
            .relations
            .entry(idea.id)
            .or_default()
            .insert(voter.clone(), decision);
        let tally = self.tallies.entry(idea.id).or_default();
        let change = match previous {
            None => {
                tally.add(decision);
                VoteChange::First
            }
            Some(old) if old == decision => VoteChange::Unchanged,
            Some(old) => {
                tally.remove(old);
                tally.add(decision);
                VoteChange::Changed { previous: old }
            }
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideas_types::{ContentLocator, Timestamp};

    fn idea_by(author: u64) -> Idea {
        Idea {
            id: IdeaId::new(0),
            title: "t".into(),
            description_locator: ContentLocator::new("h").unwrap(),
            author: Address::from_index(author),
            created_on: Timestamp::EPOCH,
        }
    }

    #[test]
    fn first_vote_counts_once() {
        let mut votes = VoteLedger::new();
        let idea = idea_by(1);
        let change = votes
            .cast(&idea, &Address::from_index(2), VoteDecision::Approved)
            .unwrap();
        assert_eq!(change, VoteChange::First);
        assert_eq!(votes.tally(idea.id), Tally { approved: 1, rejected: 0 });
    }

    #[test]
    fn switching_moves_the_count() {
        let mut votes = VoteLedger::new();
        let idea = idea_by(1);
        let voter = Address::from_index(2);
        votes.cast(&idea, &voter, VoteDecision::Approved).unwrap();
        let change = votes.cast(&idea, &voter, VoteDecision::Rejected).unwrap();
        assert_eq!(
            change,
            VoteChange::Changed {
                previous: VoteDecision::Approved
            }
        );
        assert_eq!(votes.tally(idea.id), Tally { approved: 0, rejected: 1 });
        assert_eq!(votes.vote_of(idea.id, &voter), Some(VoteDecision::Rejected));
    }

    #[test]
    fn repeating_is_a_noop() {
        let mut votes = VoteLedger::new();
        let idea = idea_by(1);
        let voter = Address::from_index(2);
        votes.cast(&idea, &voter, VoteDecision::Rejected).unwrap();
        let change = votes.cast(&idea, &voter, VoteDecision::Rejected).unwrap();
        assert_eq!(change, VoteChange::Unchanged);
        assert_eq!(votes.tally(idea.id), Tally { approved: 0, rejected: 1 });
    }

    #[test]
    fn author_cannot_vote() {
        let mut votes = VoteLedger::new();
        let idea = idea_by(1);
        let err = votes
            .cast(&idea, &Address::from_index(1), VoteDecision::Approved)
            .unwrap_err();
        assert_eq!(err, LedgerError::SelfVoteForbidden(idea.id));
        assert_eq!(votes.tally(idea.id), Tally::default());
        assert_eq!(votes.vote_of(idea.id, &Address::from_index(1)), None);
    }

    #[test]
    fn from_parts_detects_diverged_tally() {
        let relations = vec![(IdeaId::new(0), Address::from_index(2), VoteDecision::Approved)];
        let bad = vec![(IdeaId::new(0), Tally { approved: 2, rejected: 0 })];
        assert!(VoteLedger::from_parts(relations.clone(), bad).is_err());

        let good = vec![(IdeaId::new(0), Tally { approved: 1, rejected: 0 })];
        let ledger = VoteLedger::from_parts(relations, good).unwrap();
        assert!(ledger.is_consistent());
    }
}
