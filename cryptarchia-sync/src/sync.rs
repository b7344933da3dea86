use crate::{
    fetcher::{BlockFetcher, PeerId},
    source::BlockSource,
};
use cryptarchia_consensus::{Applied, Checkpoint, Error, Follower, Header, HeaderId};
use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("the fork ending at {tip} does not connect to the local block tree")]
    Disconnected { tip: HeaderId },
    #[error("block {block} of the fork was rejected")]
    InvalidBlock {
        block: HeaderId,
        source: Error,
        /// the rejected block and everything on top of it
        invalid_suffix: Vec<HeaderId>,
        /// blocks of the fork added before the rejected one
        applied: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// blocks received from the peers, duplicates included
    pub fetched: usize,
    /// blocks added to the local block tree
    pub applied: usize,
    pub rejected: usize,
}

/// Bring the local block tree up to date with the peers.
///
/// Blocks are pulled by slot from the local tip onward. Blocks of forks
/// missing locally are backfilled by walking the fork back. Rounds are
/// repeated, as the peers may have moved on in the meantime, until no peer
/// is ahead or a round adds nothing.
pub fn sync(local: &mut Follower, peers: &[&dyn BlockSource]) -> SyncStats {
    let fetcher = BlockFetcher::new(peers);
    let mut rejected: HashSet<HeaderId> = HashSet::new();
    let mut stats = SyncStats::default();

    loop {
        let start = local.tip().slot();
        let mut orphans: HashMap<HeaderId, (Header, PeerId)> = HashMap::new();
        let mut fetched = 0;
        let mut applied = 0;

        for (block, peer_id) in fetcher.fetch_blocks_from(start) {
            fetched += 1;
            let id = block.id();
            if rejected.contains(&id) || rejected.contains(&block.parent()) {
                rejected.insert(id);
                continue;
            }
            match local.on_block(block.clone()) {
                Ok(outcome) => {
                    orphans.remove(&id);
                    if outcome != Applied::AlreadyKnown {
                        applied += 1;
                    }
                }
                Err(error) if error.is_recoverable() => {
                    orphans.insert(id, (block, peer_id));
                }
                Err(error) => {
                    warn!(block = %id, peer = peer_id, %error, "rejected block");
                    rejected.insert(id);
                }
            }
        }
        stats.fetched += fetched;
        if fetched == 0 {
            break;
        }

        // the highest orphans first, their backfill likely covers the others
        let mut orphans: Vec<(Header, PeerId)> = orphans.into_iter().map(|(_, o)| o).collect();
        orphans.sort_by_key(|(block, _)| Reverse(block.slot()));
        for (orphan, peer_id) in orphans {
            let id = orphan.id();
            if local.contains(&id) || rejected.contains(&id) {
                continue;
            }
            match backfill_fork(local, &orphan, Some(peer_id), &fetcher) {
                Ok(count) => applied += count,
                Err(BackfillError::InvalidBlock {
                    block,
                    source,
                    invalid_suffix,
                    applied: count,
                }) => {
                    warn!(block = %block, peer = peer_id, error = %source, "rejected fork");
                    applied += count;
                    rejected.extend(invalid_suffix);
                }
                Err(error) => {
                    warn!(peer = peer_id, %error, "cannot backfill fork");
                }
            }
        }

        stats.applied += applied;
        debug!(fetched, applied, tip = %local.tip_id(), "sync round done");
        if applied == 0 {
            break;
        }
    }

    stats.rejected = rejected.len();
    info!(
        tip = %local.tip_id(),
        applied = stats.applied,
        rejected = stats.rejected,
        "sync done"
    );
    stats
}

/// Add a fork missing from the local block tree, oldest block first, so
/// fork choice runs on every block. Returns the number of blocks added.
pub fn backfill_fork(
    local: &mut Follower,
    tip: &Header,
    peer: Option<PeerId>,
    fetcher: &BlockFetcher<'_>,
) -> Result<usize, BackfillError> {
    let suffix = find_missing_part(local, fetcher.fetch_chain_backward(tip.id(), peer))
        .ok_or(BackfillError::Disconnected { tip: tip.id() })?;

    for (index, block) in suffix.iter().enumerate() {
        if let Err(source) = local.on_block(block.clone()) {
            return Err(BackfillError::InvalidBlock {
                block: block.id(),
                source,
                invalid_suffix: suffix[index..].iter().map(Header::id).collect(),
                applied: index,
            });
        }
    }
    Ok(suffix.len())
}

/// The blocks of `fork` (walking back from its tip) which are missing
/// locally, oldest first.
///
/// `None` when the walk never reaches a locally known block.
pub fn find_missing_part<I>(local: &Follower, fork: I) -> Option<Vec<Header>>
where
    I: IntoIterator<Item = Header>,
{
    let mut suffix = Vec::new();
    for block in fork {
        if local.contains(&block.id()) {
            suffix.reverse();
            return Some(suffix);
        }
        suffix.push(block);
    }
    None
}

/// Start over from a checkpoint obtained out of band, then sync forward
/// from it. Blocks below the checkpoint are never fetched, the epoch state
/// it carries stands in for them.
pub fn checkpoint_sync(
    local: &mut Follower,
    checkpoint: Checkpoint,
    peers: &[&dyn BlockSource],
) -> SyncStats {
    local.import_checkpoint(checkpoint);
    sync(local, peers)
}
