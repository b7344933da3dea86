//! Pulling blocks out of a set of peers.
//!
//! The fetcher is deliberately naive: peers are queried one after the
//! other, never in parallel.

use crate::source::BlockSource;
use chain_time::Slot;
use cryptarchia_consensus::{Header, HeaderId};
use std::collections::VecDeque;
use tracing::warn;

/// index of a peer in the list given to the [`BlockFetcher`]
pub type PeerId = usize;

pub struct BlockFetcher<'a> {
    peers: Vec<&'a dyn BlockSource>,
}

/// peers advertising the same tip
struct Group<'a> {
    tip: HeaderId,
    peers: Vec<(PeerId, &'a dyn BlockSource)>,
}

impl<'a> BlockFetcher<'a> {
    pub fn new(peers: &[&'a dyn BlockSource]) -> Self {
        BlockFetcher {
            peers: peers.to_vec(),
        }
    }

    pub fn peer(&self, peer_id: PeerId) -> Option<&'a dyn BlockSource> {
        self.peers.get(peer_id).copied()
    }

    /// Group the peers by tip, keeping only the peers whose tip is past
    /// `start`. Groups come in the order of their first peer.
    fn groups(&self, start: Slot) -> Vec<Group<'a>> {
        let mut groups: Vec<Group<'a>> = Vec::new();
        for (peer_id, peer) in self.peers.iter().enumerate() {
            let tip = peer.tip();
            if tip.slot() <= start {
                continue;
            }
            match groups.iter_mut().find(|group| group.tip == tip.id()) {
                Some(group) => group.peers.push((peer_id, *peer)),
                None => groups.push(Group {
                    tip: tip.id(),
                    peers: vec![(peer_id, *peer)],
                }),
            }
        }
        groups
    }

    /// Blocks from `start` onward, from one peer of each group of peers.
    ///
    /// Blocks of a group come in ascending slot order. A block may be
    /// yielded twice when a peer stops early and the next one takes over.
    pub fn fetch_blocks_from(&self, start: Slot) -> impl Iterator<Item = (Header, PeerId)> + 'a {
        self.groups(start).into_iter().flat_map(move |group| GroupFetch {
            tip: group.tip,
            from: start,
            peers: group.peers.into(),
            stream: None,
            reached_tip: false,
        })
    }

    /// The chain ending at `tip`, walking back toward the genesis.
    ///
    /// Asks `peer` only when given, otherwise every peer in turn, each one
    /// resuming where the previous one stopped.
    pub fn fetch_chain_backward(
        &self,
        tip: HeaderId,
        peer: Option<PeerId>,
    ) -> impl Iterator<Item = Header> + 'a {
        let peers: VecDeque<&'a dyn BlockSource> = match peer {
            Some(peer_id) => self.peer(peer_id).into_iter().collect(),
            None => self.peers.iter().copied().collect(),
        };
        ChainBackward {
            next: Some(tip),
            peers,
            stream: None,
        }
    }
}

struct GroupFetch<'a> {
    tip: HeaderId,
    from: Slot,
    peers: VecDeque<(PeerId, &'a dyn BlockSource)>,
    stream: Option<(PeerId, Box<dyn Iterator<Item = Header> + 'a>)>,
    reached_tip: bool,
}

impl<'a> Iterator for GroupFetch<'a> {
    type Item = (Header, PeerId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((peer_id, mut stream)) = self.stream.take() {
                match stream.next() {
                    Some(block) => {
                        // where the next peer resumes if this one stops
                        self.from = block.slot();
                        self.reached_tip |= block.id() == self.tip;
                        self.stream = Some((peer_id, stream));
                        return Some((block, peer_id));
                    }
                    None if self.reached_tip => return None,
                    None => {
                        warn!(peer = peer_id, tip = %self.tip, "peer stopped before its tip");
                    }
                }
            }
            let (peer_id, peer) = self.peers.pop_front()?;
            self.stream = Some((peer_id, peer.blocks_by_slot(self.from)));
        }
    }
}

struct ChainBackward<'a> {
    next: Option<HeaderId>,
    peers: VecDeque<&'a dyn BlockSource>,
    stream: Option<Box<dyn Iterator<Item = Header> + 'a>>,
}

impl<'a> Iterator for ChainBackward<'a> {
    type Item = Header;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.next?;
            if let Some(mut stream) = self.stream.take() {
                if let Some(block) = stream.next() {
                    self.next = if block.leader_proof().is_some() {
                        Some(block.parent())
                    } else {
                        // genesis, the whole chain was served
                        None
                    };
                    self.stream = Some(stream);
                    return Some(block);
                }
            }
            let peer = loop {
                let peer = self.peers.pop_front()?;
                if peer.contains(&id) {
                    break peer;
                }
            };
            self.stream = Some(peer.chain_backward(id));
        }
    }
}
