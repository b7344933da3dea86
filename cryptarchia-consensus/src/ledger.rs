//! Ledger state attached to every block
//!
//! A state is a value: applying a block never modifies the parent state but
//! builds the state of the child. The note sets are persistent, so sibling
//! states share most of their structure.

use crate::{
    header::Header,
    key::{tag, DomainHasher, Hash, HeaderId},
    leadership::LeaderProof,
    note::{Commitment, Nullifier},
};
use chain_time::Slot;
use rpds::HashTrieSetSync;
use thiserror::Error;

pub type CommitmentSet = HashTrieSetSync<Commitment>;
pub type NullifierSet = HashTrieSetSync<Nullifier>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("block {block} extends {parent} and not {expected}")]
    NotTheParentBlock {
        block: HeaderId,
        parent: HeaderId,
        expected: HeaderId,
    },

    #[error("block {0} carries no leader proof")]
    MissingLeaderProof(HeaderId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    block: Header,
    nonce: Hash,
    /// every note ever committed on this branch
    commitments: CommitmentSet,
    /// notes which can lead right away on this branch, without waiting for
    /// a stake distribution snapshot to include them
    lead_commitments: CommitmentSet,
    nullifiers: NullifierSet,
    /// number of blocks applied since the root of the chain
    leader_count: u64,
}

impl LedgerState {
    /// Root state of a chain. The initial notes are eligible for
    /// leadership immediately.
    pub fn from_commitments<I>(block: Header, nonce: Hash, commitments: I) -> Self
    where
        I: IntoIterator<Item = Commitment>,
    {
        let commitments: CommitmentSet = commitments.into_iter().collect();
        LedgerState {
            block,
            nonce,
            lead_commitments: commitments.clone(),
            commitments,
            nullifiers: NullifierSet::new_sync(),
            leader_count: 0,
        }
    }

    /// Build the state of `block` on top of this one: the orphaned proofs
    /// it carries are imported first, then its own leader proof.
    ///
    /// The leader proofs are not verified here: header validation is the
    /// caller's business.
    pub fn apply(&self, block: &Header) -> Result<Self, ApplyError> {
        if block.parent() != self.id() {
            return Err(ApplyError::NotTheParentBlock {
                block: block.id(),
                parent: block.parent(),
                expected: self.id(),
            });
        }
        let proof = block
            .leader_proof()
            .ok_or_else(|| ApplyError::MissingLeaderProof(block.id()))?;

        let mut state = self.clone();
        for orphan in block.orphaned_proofs() {
            let orphan_proof = orphan
                .leader_proof()
                .ok_or_else(|| ApplyError::MissingLeaderProof(orphan.id()))?;
            state = state.import_leader_proof(orphan_proof);
        }

        let nonce = DomainHasher::new(tag::EPOCH_NONCE)
            .chain(self.nonce.as_ref())
            .chain(proof.epoch_nonce_contribution().as_ref())
            .chain(&block.slot().to_be_bytes())
            .finalize();

        Ok(LedgerState {
            block: block.clone(),
            nonce,
            ..state.import_leader_proof(proof)
        })
    }

    /// Spend the leader note of `proof` and commit its evolution, counting
    /// one more leader. The block and the nonce are left untouched.
    pub fn import_leader_proof(&self, proof: &LeaderProof) -> Self {
        let evolved = proof.evolved_commitment();
        LedgerState {
            block: self.block.clone(),
            nonce: self.nonce,
            commitments: self.commitments.insert(evolved),
            lead_commitments: self.lead_commitments.insert(evolved),
            nullifiers: self.nullifiers.insert(proof.nullifier()),
            leader_count: self.leader_count + 1,
        }
    }

    /// Record a note created by the content of the block. It only becomes
    /// eligible for leadership once a stake distribution snapshot holds it.
    pub fn mint(&self, commitment: Commitment) -> Self {
        LedgerState {
            commitments: self.commitments.insert(commitment),
            ..self.clone()
        }
    }

    pub fn block(&self) -> &Header {
        &self.block
    }

    pub fn id(&self) -> HeaderId {
        self.block.id()
    }

    pub fn slot(&self) -> Slot {
        self.block.slot()
    }

    pub fn nonce(&self) -> &Hash {
        &self.nonce
    }

    pub fn commitments(&self) -> &CommitmentSet {
        &self.commitments
    }

    pub fn lead_commitments(&self) -> &CommitmentSet {
        &self.lead_commitments
    }

    pub fn nullifiers(&self) -> &NullifierSet {
        &self.nullifiers
    }

    pub fn is_nullified(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn leader_count(&self) -> u64 {
        self.leader_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mk_block, mk_block_with_orphans, mk_genesis_state};
    use crate::note::{Note, SecretKey};

    #[test]
    fn apply_updates_nonce_sets_and_counter() {
        let note = Note::new(100, SecretKey::from(0));
        let genesis = mk_genesis_state(&[note.clone()]);
        let block = mk_block(genesis.block(), 1, &note);

        let state = genesis.apply(&block).unwrap();
        assert_eq!(state.id(), block.id());
        assert_eq!(state.leader_count(), 1);
        assert_ne!(state.nonce(), genesis.nonce());
        assert!(state.is_nullified(&note.nullifier()));
        assert!(state.lead_commitments().contains(&note.evolve().commitment()));
        assert!(state.commitments().contains(&note.evolve().commitment()));

        // the parent is left untouched
        assert_eq!(genesis.leader_count(), 0);
        assert!(!genesis.is_nullified(&note.nullifier()));
    }

    #[test]
    fn nonce_is_a_hash_chain() {
        let note = Note::new(100, SecretKey::from(0));
        let genesis = mk_genesis_state(&[note.clone()]);
        let b1 = mk_block(genesis.block(), 1, &note);
        let s1 = genesis.apply(&b1).unwrap();

        let proof = b1.leader_proof().unwrap();
        let expected = DomainHasher::new(tag::EPOCH_NONCE)
            .chain(genesis.nonce().as_ref())
            .chain(proof.epoch_nonce_contribution().as_ref())
            .chain(&Slot::from(1).to_be_bytes())
            .finalize();
        assert_eq!(s1.nonce(), &expected);
    }

    #[test]
    fn apply_requires_the_parent() {
        let note = Note::new(100, SecretKey::from(0));
        let genesis = mk_genesis_state(&[note.clone()]);
        let b1 = mk_block(genesis.block(), 1, &note);
        let b2 = mk_block(&b1, 2, &note.evolve());

        assert_eq!(
            genesis.apply(&b2),
            Err(ApplyError::NotTheParentBlock {
                block: b2.id(),
                parent: b1.id(),
                expected: genesis.id(),
            })
        );
    }

    #[test]
    fn orphans_are_imported_before_the_block() {
        let note = Note::new(100, SecretKey::from(0));
        let other = Note::new(100, SecretKey::from(1));
        let genesis = mk_genesis_state(&[note.clone(), other.clone()]);
        let orphan = mk_block(genesis.block(), 1, &other);
        let block = mk_block_with_orphans(genesis.block(), 2, &note, &[orphan]);

        let state = genesis.apply(&block).unwrap();
        assert_eq!(state.leader_count(), 2);
        assert!(state.is_nullified(&other.nullifier()));
        assert!(state.lead_commitments().contains(&other.evolve().commitment()));
        // the nonce only follows the blocks of the chain
        let plain = genesis.apply(&mk_block(genesis.block(), 2, &note)).unwrap();
        assert_eq!(state.nonce(), plain.nonce());
    }

    #[test]
    fn minted_notes_are_not_lead_eligible() {
        let note = Note::new(100, SecretKey::from(0));
        let minted = Note::new(5, SecretKey::from(1)).commitment();
        let state = mk_genesis_state(&[note]).mint(minted);
        assert!(state.commitments().contains(&minted));
        assert!(!state.lead_commitments().contains(&minted));
    }
}
