use crate::{
    key::{tag, DomainHasher, Hash, HeaderId},
    leadership::LeaderProof,
};
use chain_time::Slot;
use std::fmt;

/// Block header
///
/// The block content is opaque to the consensus, only its size and hash
/// are committed to. The identifier is computed once, at construction.
///
/// A header may carry the headers of blocks won on forks the chain does not
/// follow (orphans), so their leaders are counted on this chain too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    id: HeaderId,
    slot: Slot,
    parent: HeaderId,
    content_size: u32,
    content_id: Hash,
    leader_proof: Option<LeaderProof>,
    orphaned_proofs: Vec<Header>,
}

impl Header {
    pub fn new(
        parent: HeaderId,
        slot: Slot,
        content_size: u32,
        content_id: Hash,
        leader_proof: LeaderProof,
    ) -> Self {
        Self::build(
            parent,
            slot,
            content_size,
            content_id,
            Some(leader_proof),
            Vec::new(),
        )
    }

    /// Header importing the leader proofs of `orphaned_proofs`, in this
    /// order.
    pub fn with_orphaned_proofs(
        parent: HeaderId,
        slot: Slot,
        content_size: u32,
        content_id: Hash,
        leader_proof: LeaderProof,
        orphaned_proofs: Vec<Header>,
    ) -> Self {
        Self::build(
            parent,
            slot,
            content_size,
            content_id,
            Some(leader_proof),
            orphaned_proofs,
        )
    }

    /// Header of the first block of the chain, the only one without a
    /// leader proof.
    pub fn genesis(slot: Slot, content_size: u32, content_id: Hash) -> Self {
        Self::build(
            HeaderId::zero(),
            slot,
            content_size,
            content_id,
            None,
            Vec::new(),
        )
    }

    fn build(
        parent: HeaderId,
        slot: Slot,
        content_size: u32,
        content_id: Hash,
        leader_proof: Option<LeaderProof>,
        orphaned_proofs: Vec<Header>,
    ) -> Self {
        let nonce_contribution = leader_proof
            .as_ref()
            .map(LeaderProof::epoch_nonce_contribution)
            .unwrap_or_else(Hash::zero);
        let mut hasher = DomainHasher::new(tag::BLOCK_ID)
            .chain(&slot.to_be_bytes())
            .chain(parent.as_ref())
            .chain(&content_size.to_be_bytes())
            .chain(content_id.as_ref())
            .chain(nonce_contribution.as_ref())
            .chain(&(orphaned_proofs.len() as u32).to_be_bytes());
        for orphan in &orphaned_proofs {
            hasher = hasher.chain(orphan.id.as_ref());
        }
        Header {
            id: hasher.finalize(),
            slot,
            parent,
            content_size,
            content_id,
            leader_proof,
            orphaned_proofs,
        }
    }

    pub fn id(&self) -> HeaderId {
        self.id
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn parent(&self) -> HeaderId {
        self.parent
    }

    pub fn content_size(&self) -> u32 {
        self.content_size
    }

    pub fn content_id(&self) -> &Hash {
        &self.content_id
    }

    pub fn leader_proof(&self) -> Option<&LeaderProof> {
        self.leader_proof.as_ref()
    }

    pub fn orphaned_proofs(&self) -> &[Header] {
        &self.orphaned_proofs
    }

    /// short human readable description, for the logs
    pub fn description(&self) -> String {
        format!("{} (slot {})", self.id, self.slot)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}
