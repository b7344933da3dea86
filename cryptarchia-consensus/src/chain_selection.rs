//! Fork choice rules
//!
//! * [`maxvalid_mc`] is the Praos rule used once the node is online: the
//!   longest chain wins, as long as switching does not revert more than `k`
//!   blocks.
//! * [`maxvalid_bg`] is the Genesis rule used while bootstrapping: same as
//!   above for shallow forks, but a fork deeper than `k` is decided on the
//!   density of both chains right after the fork point.

use crate::{key::HeaderId, ledger::LedgerState, multiverse::Multiverse};
use std::collections::{BTreeSet, HashMap};

/// Where two chains meet, and what each has on top of their common ancestor
#[derive(Debug, Clone)]
pub struct CommonPrefix<'a> {
    pub ancestor: &'a LedgerState,
    /// blocks of the first chain after the ancestor, oldest first
    pub suffix_a: Vec<&'a LedgerState>,
    /// blocks of the second chain after the ancestor, oldest first
    pub suffix_b: Vec<&'a LedgerState>,
}

impl<'a> CommonPrefix<'a> {
    pub fn depth_a(&self) -> u64 {
        self.suffix_a.len() as u64
    }

    pub fn depth_b(&self) -> u64 {
        self.suffix_b.len() as u64
    }
}

/// Walk back both chains in lock step until they meet.
///
/// `None` if the chains share no known ancestor.
pub fn common_prefix_depth<'a>(
    multiverse: &'a Multiverse,
    a: HeaderId,
    b: HeaderId,
) -> Option<CommonPrefix<'a>> {
    let mut chain_a = multiverse.iter_chain(a);
    let mut chain_b = multiverse.iter_chain(b);
    let mut walked_a: Vec<&LedgerState> = Vec::new();
    let mut walked_b: Vec<&LedgerState> = Vec::new();
    let mut seen_a: HashMap<HeaderId, usize> = HashMap::new();
    let mut seen_b: HashMap<HeaderId, usize> = HashMap::new();

    let split = |walked: Vec<&'a LedgerState>, depth: usize| -> Vec<&'a LedgerState> {
        walked.into_iter().take(depth).rev().collect()
    };

    loop {
        let next_a = chain_a.next();
        if let Some(state) = next_a {
            let depth_a = walked_a.len();
            if let Some(&depth_b) = seen_b.get(&state.id()) {
                return Some(CommonPrefix {
                    ancestor: state,
                    suffix_a: split(walked_a, depth_a),
                    suffix_b: split(walked_b, depth_b),
                });
            }
            seen_a.insert(state.id(), depth_a);
            walked_a.push(state);
        }

        let next_b = chain_b.next();
        if let Some(state) = next_b {
            let depth_b = walked_b.len();
            if let Some(&depth_a) = seen_a.get(&state.id()) {
                return Some(CommonPrefix {
                    ancestor: state,
                    suffix_a: split(walked_a, depth_a),
                    suffix_b: split(walked_b, depth_b),
                });
            }
            seen_b.insert(state.id(), depth_b);
            walked_b.push(state);
        }

        if next_a.is_none() && next_b.is_none() {
            return None;
        }
    }
}

/// number of blocks of `suffix` in the `s` slots following the fork point
pub fn chain_density(suffix: &[&LedgerState], fork_point: &LedgerState, s: u64) -> usize {
    let window_end = fork_point.slot() + s;
    suffix.iter().filter(|state| state.slot() < window_end).count()
}

/// Praos fork choice: longest chain, ignoring forks deeper than `k`.
pub fn maxvalid_mc(
    multiverse: &Multiverse,
    local_chain: HeaderId,
    forks: &BTreeSet<HeaderId>,
    k: u64,
) -> HeaderId {
    let mut cmax = local_chain;
    for fork in forks {
        let prefix = match common_prefix_depth(multiverse, cmax, *fork) {
            Some(prefix) => prefix,
            None => continue,
        };
        if prefix.depth_a() <= k {
            if prefix.depth_a() < prefix.depth_b() {
                cmax = *fork;
            }
        } else {
            tracing::debug!(
                fork = %fork,
                depth = prefix.depth_a(),
                "fork deeper than k, not considered"
            );
        }
    }
    cmax
}

/// Genesis fork choice: longest chain for forks up to `k` deep, densest
/// chain in the `s` slots after the fork point for deeper forks.
pub fn maxvalid_bg(
    multiverse: &Multiverse,
    local_chain: HeaderId,
    forks: &BTreeSet<HeaderId>,
    k: u64,
    s: u64,
) -> HeaderId {
    let mut cmax = local_chain;
    for fork in forks {
        let prefix = match common_prefix_depth(multiverse, cmax, *fork) {
            Some(prefix) => prefix,
            None => continue,
        };
        if prefix.depth_a() <= k {
            if prefix.depth_a() < prefix.depth_b() {
                cmax = *fork;
            }
        } else {
            let cmax_density = chain_density(&prefix.suffix_a, prefix.ancestor, s);
            let fork_density = chain_density(&prefix.suffix_b, prefix.ancestor, s);
            tracing::debug!(
                fork = %fork,
                cmax_density,
                fork_density,
                "deep fork, comparing chain densities"
            );
            if cmax_density < fork_density {
                cmax = *fork;
            }
        }
    }
    cmax
}
