use chain_time::Slot;
use cryptarchia_consensus::{Follower, Header, HeaderId};

/// Blocks as served by a peer
pub trait BlockSource {
    fn tip(&self) -> Header;

    /// the known blocks from `from` onward, in ascending slot order
    fn blocks_by_slot<'a>(&'a self, from: Slot) -> Box<dyn Iterator<Item = Header> + 'a>;

    /// the chain ending at `from`, walking back toward the genesis
    fn chain_backward<'a>(&'a self, from: HeaderId) -> Box<dyn Iterator<Item = Header> + 'a>;

    fn contains(&self, id: &HeaderId) -> bool;
}

impl BlockSource for Follower {
    fn tip(&self) -> Header {
        Follower::tip(self).clone()
    }

    fn blocks_by_slot<'a>(&'a self, from: Slot) -> Box<dyn Iterator<Item = Header> + 'a> {
        Box::new(Follower::blocks_by_slot(self, from).cloned())
    }

    fn chain_backward<'a>(&'a self, from: HeaderId) -> Box<dyn Iterator<Item = Header> + 'a> {
        Box::new(self.iter_chain(from).map(|state| state.block().clone()))
    }

    fn contains(&self, id: &HeaderId) -> bool {
        Follower::contains(self, id)
    }
}
