//! Builders and quickcheck generators for tests, here and in the crates
//! depending on this one (with the `property-test-api` feature).

use crate::{
    config::Config,
    header::Header,
    key::Hash,
    leadership::LeaderProof,
    ledger::LedgerState,
    note::{Note, SecretKey},
};
use chain_time::Slot;
use quickcheck::{Arbitrary, Gen};

impl Arbitrary for SecretKey {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let mut bytes = [0; 32];
        for byte in bytes.iter_mut() {
            *byte = u8::arbitrary(g);
        }
        SecretKey::from_bytes(bytes)
    }
}

impl Arbitrary for Note {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let mut note = Note::new(u64::arbitrary(g), SecretKey::arbitrary(g));
        // a few evolutions so the nonce is not always zero
        for _ in 0..u8::arbitrary(g) % 4 {
            note = note.evolve();
        }
        note
    }
}

/// Small parameters for tests: k = 1 and f = 1/2 give epochs of 20 slots,
/// the nonce snapshot 12 slots in and a density window of 6 slots. The
/// initial total stake is the stake of `notes`.
pub fn mk_config(notes: &[Note]) -> Config {
    Config {
        k: 1,
        active_slot_coeff: 0.5,
        ..Config::cryptarchia_v0_0_1(notes.iter().map(|note| note.value).sum())
    }
}

/// Genesis state at slot 0 with a zero nonce, `notes` are all eligible
pub fn mk_genesis_state(notes: &[Note]) -> LedgerState {
    let genesis = Header::genesis(Slot::genesis(), 0, Hash::hash_bytes(&[]));
    LedgerState::from_commitments(genesis, Hash::zero(), notes.iter().map(Note::commitment))
}

pub fn mk_block_with_content(parent: &Header, slot: u64, note: &Note, content: &[u8]) -> Header {
    let slot = Slot::from(slot);
    let proof = LeaderProof::new(note.clone(), slot, parent.id());
    Header::new(
        parent.id(),
        slot,
        content.len() as u32,
        Hash::hash_bytes(content),
        proof,
    )
}

/// Block led by `note` at `slot` on top of `parent`. The lottery is not
/// run, the block may or may not be valid.
pub fn mk_block(parent: &Header, slot: u64, note: &Note) -> Header {
    mk_block_with_content(parent, slot, note, &[0; 32])
}

/// Block led by `note` at `slot` on top of `parent`, importing the leader
/// proofs of `orphans`.
pub fn mk_block_with_orphans(parent: &Header, slot: u64, note: &Note, orphans: &[Header]) -> Header {
    let slot = Slot::from(slot);
    let content = [0; 32];
    Header::with_orphaned_proofs(
        parent.id(),
        slot,
        content.len() as u32,
        Hash::hash_bytes(&content),
        LeaderProof::new(note.clone(), slot, parent.id()),
        orphans.to_vec(),
    )
}

/// Chain of blocks on top of `parent`, all led by `note` evolving at every
/// block. Returns the blocks and the note to use for the next block.
pub fn mk_chain(parent: &Header, note: Note, slots: &[u64]) -> (Vec<Header>, Note) {
    let mut chain: Vec<Header> = Vec::with_capacity(slots.len());
    let mut note = note;
    for slot in slots {
        let block = mk_block(chain.last().unwrap_or(parent), *slot, &note);
        chain.push(block);
        note = note.evolve();
    }
    (chain, note)
}
