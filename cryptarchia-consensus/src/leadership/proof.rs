use crate::{
    key::{tag, DomainHasher, Hash, HeaderId},
    ledger::{CommitmentSet, NullifierSet},
    note::{Commitment, Note, Nullifier},
};
use chain_time::Slot;

/// Proof that a note won the lottery of a slot on top of a given parent
///
/// The note is carried in clear: the zero knowledge layer proving
/// membership and ownership without revealing it lives outside of the
/// consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderProof {
    note: Note,
    slot: Slot,
    parent: HeaderId,
}

impl LeaderProof {
    pub fn new(note: Note, slot: Slot, parent: HeaderId) -> Self {
        LeaderProof { note, slot, parent }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn parent(&self) -> &HeaderId {
        &self.parent
    }

    pub fn commitment(&self) -> Commitment {
        self.note.commitment()
    }

    pub fn nullifier(&self) -> Nullifier {
        self.note.nullifier()
    }

    /// commitment of the note replacing the leader note
    pub fn evolved_commitment(&self) -> Commitment {
        self.note.evolve().commitment()
    }

    /// Contribution of this proof to the nonce chain
    pub fn epoch_nonce_contribution(&self) -> Hash {
        DomainHasher::new(tag::NONCE_CONTRIBUTION)
            .chain(&self.slot.to_be_bytes())
            .chain(self.commitment().as_hash().as_ref())
            .chain(self.note.secret_key.as_bytes())
            .finalize()
    }

    /// check the proof was made for this slot and parent, with a note
    /// committed in `commitments` and not yet spent according to `nullifiers`
    pub fn verify(
        &self,
        slot: Slot,
        parent: &HeaderId,
        commitments: &CommitmentSet,
        nullifiers: &NullifierSet,
    ) -> bool {
        self.slot == slot
            && &self.parent == parent
            && commitments.contains(&self.commitment())
            && !nullifiers.contains(&self.nullifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::SecretKey;

    fn sets(notes: &[&Note], spent: &[&Note]) -> (CommitmentSet, NullifierSet) {
        let commitments = notes.iter().map(|n| n.commitment()).collect();
        let nullifiers = spent.iter().map(|n| n.nullifier()).collect();
        (commitments, nullifiers)
    }

    #[test]
    fn verify_checks_slot_parent_and_membership() {
        let note = Note::new(10, SecretKey::from(0));
        let parent = Hash::hash_bytes(b"parent");
        let proof = LeaderProof::new(note.clone(), Slot::from(3), parent);

        let (commitments, nullifiers) = sets(&[&note], &[]);
        assert!(proof.verify(Slot::from(3), &parent, &commitments, &nullifiers));
        assert!(!proof.verify(Slot::from(4), &parent, &commitments, &nullifiers));
        assert!(!proof.verify(Slot::from(3), &Hash::zero(), &commitments, &nullifiers));

        let (empty, _) = sets(&[], &[]);
        assert!(!proof.verify(Slot::from(3), &parent, &empty, &nullifiers));

        let (commitments, spent) = sets(&[&note], &[&note]);
        assert!(!proof.verify(Slot::from(3), &parent, &commitments, &spent));
    }

    #[test]
    fn nonce_contribution_depends_on_slot() {
        let note = Note::new(10, SecretKey::from(0));
        let a = LeaderProof::new(note.clone(), Slot::from(1), Hash::zero());
        let b = LeaderProof::new(note, Slot::from(2), Hash::zero());
        assert_ne!(a.epoch_nonce_contribution(), b.epoch_nonce_contribution());
    }
}
