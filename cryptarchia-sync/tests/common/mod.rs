#![allow(dead_code)]

use chain_time::Slot;
use cryptarchia_consensus::{
    testing::{mk_config, mk_genesis_state},
    Follower, Header, HeaderId, Note, SecretKey,
};
use cryptarchia_sync::BlockSource;

pub fn notes(count: u64) -> Vec<Note> {
    (0..count).map(|i| Note::new(10, SecretKey::from(i))).collect()
}

pub fn follower(notes: &[Note]) -> Follower {
    Follower::new(mk_genesis_state(notes), mk_config(notes)).expect("valid test configuration")
}

pub fn follower_with(notes: &[Note], blocks: &[&Header]) -> Follower {
    let mut follower = follower(notes);
    for block in blocks {
        follower
            .on_block((*block).clone())
            .expect("blocks are valid and ordered");
    }
    follower
}

/// Make `follower` hold `block` without validating it, the tip is left
/// untouched.
pub fn insert_invalid_block(follower: &mut Follower, block: &Header) {
    let state = follower
        .state(&block.parent())
        .expect("parent is known")
        .apply(block)
        .expect("block extends its parent");
    follower.force_insert_state(state);
}

/// A peer which stops serving blocks by slot after a few of them
pub struct Truncated<'a> {
    pub inner: &'a Follower,
    pub limit: usize,
}

impl<'a> BlockSource for Truncated<'a> {
    fn tip(&self) -> Header {
        self.inner.tip().clone()
    }

    fn blocks_by_slot<'b>(&'b self, from: Slot) -> Box<dyn Iterator<Item = Header> + 'b> {
        Box::new(self.inner.blocks_by_slot(from).take(self.limit).cloned())
    }

    fn chain_backward<'b>(&'b self, from: HeaderId) -> Box<dyn Iterator<Item = Header> + 'b> {
        BlockSource::chain_backward(self.inner, from)
    }

    fn contains(&self, id: &HeaderId) -> bool {
        self.inner.contains(id)
    }
}
