//! The follower tracks the tree of blocks received by the node.
//!
//! It validates every incoming header against the epoch state of its
//! branch, keeps the ledger state of every known block, selects the local
//! chain among the known tips and maintains the last immutable block (LIB).

use crate::{
    chain_selection::{common_prefix_depth, maxvalid_bg, maxvalid_mc},
    checkpoint::Checkpoint,
    config::{Config, ConfigError},
    epoch::{EpochState, EpochStateCache},
    error::{Error, LifecycleError},
    header::Header,
    key::HeaderId,
    leadership::LeaderProof,
    ledger::LedgerState,
    multiverse::{IterChain, Multiverse},
};
use chain_time::{Epoch, Slot};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Which fork choice rule is in force
///
/// A node starts bootstrapping, relying on chain density to resist long
/// range forks, and goes online once caught up. It never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Bootstrapping,
    Online,
}

/// Outcome of an accepted block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// the block was already known, nothing changed
    AlreadyKnown,
    /// the block extends the local chain
    Extended,
    /// the block extends or creates a fork, the local chain is unchanged
    Forked,
    /// fork choice switched the local chain away from `previous_tip`
    Reorganized { previous_tip: HeaderId },
}

#[derive(Debug, Clone)]
pub struct Follower {
    config: Config,
    states: Multiverse,
    /// tips of the known chains, other than the local chain
    forks: BTreeSet<HeaderId>,
    local_chain: HeaderId,
    lib: HeaderId,
    epoch_states: EpochStateCache,
    lifecycle: Lifecycle,
}

impl Follower {
    pub fn new(genesis: LedgerState, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = genesis.id();
        Ok(Follower {
            config,
            states: Multiverse::new(genesis),
            forks: BTreeSet::new(),
            local_chain: id,
            lib: id,
            epoch_states: EpochStateCache::default(),
            lifecycle: Lifecycle::Bootstrapping,
        })
    }

    /// Process a block received from the network or from our own leader.
    ///
    /// On error nothing is changed.
    pub fn on_block(&mut self, block: Header) -> Result<Applied, Error> {
        let id = block.id();
        if self.states.contains(&id) {
            debug!(block = %id, "block already known");
            return Ok(Applied::AlreadyKnown);
        }

        let state = self.validate_header(&block)?;
        self.states.insert(state);

        let parent = block.parent();
        let applied = if parent == self.local_chain {
            self.local_chain = id;
            Applied::Extended
        } else {
            // a fork tip being extended is superseded by its child
            self.forks.remove(&parent);
            self.forks.insert(id);
            let previous_tip = self.local_chain;
            let winner = self.fork_choice();
            if winner == previous_tip {
                debug!(block = %id, "block added to a fork");
                Applied::Forked
            } else {
                self.forks.remove(&winner);
                self.forks.insert(previous_tip);
                self.local_chain = winner;
                info!(from = %previous_tip, to = %winner, "switched to a fork");
                Applied::Reorganized { previous_tip }
            }
        };

        if self.lifecycle == Lifecycle::Online {
            self.update_lib();
        }
        Ok(applied)
    }

    /// Check that `block` may be added to the tree and build its ledger
    /// state, without adding it.
    ///
    /// The checks needing no epoch state run first. The orphaned proofs
    /// are then verified in order, each one spending its note before the
    /// next one and the block's own proof are looked at.
    pub fn validate_header(&mut self, block: &Header) -> Result<LedgerState, Error> {
        let id = block.id();
        let parent_id = block.parent();
        let parent = self.states.get(&parent_id).ok_or(Error::ParentNotFound {
            block: id,
            parent: parent_id,
        })?;

        if !self.states.is_ancestor(&self.lib, &parent_id) {
            return Err(Error::ImmutableFork {
                block: id,
                lib: self.lib,
            });
        }

        let proof = block
            .leader_proof()
            .ok_or(Error::InvalidLeaderProof(id))?;
        if proof.slot() != block.slot()
            || proof.parent() != &parent_id
            || parent.is_nullified(&proof.nullifier())
        {
            return Err(Error::InvalidLeaderProof(id));
        }

        let mut orphans = Vec::with_capacity(block.orphaned_proofs().len());
        for orphan in block.orphaned_proofs() {
            let orphan_id = orphan.id();
            if !self.states.contains(&orphan_id) {
                return Err(Error::MissingOrphanProof {
                    block: id,
                    orphan: orphan_id,
                });
            }
            let orphan_proof = orphan.leader_proof().ok_or(Error::InvalidOrphanProof {
                block: id,
                orphan: orphan_id,
            })?;
            orphans.push((orphan, orphan_proof));
        }

        let epoch = self.config.epoch(block.slot());
        let epoch_state = self
            .epoch_states
            .compute(&self.states, &self.config, epoch, parent_id);

        let mut state = parent.clone();
        for (orphan, orphan_proof) in orphans {
            if !is_eligible(orphan_proof, orphan.slot(), &orphan.parent(), &epoch_state, &state) {
                return Err(Error::InvalidOrphanProof {
                    block: id,
                    orphan: orphan.id(),
                });
            }
            state = state.import_leader_proof(orphan_proof);
        }
        if !is_eligible(proof, block.slot(), &parent_id, &epoch_state, &state) {
            return Err(Error::InvalidLeaderProof(id));
        }

        Ok(parent.apply(block)?)
    }

    /// Blocks of the other known branches whose leader proof was never
    /// imported on the chain ending at `tip`, oldest first per branch.
    ///
    /// A leader building on `tip` includes them so that their notes are
    /// spent there too.
    pub fn unimported_orphans(&self, tip: HeaderId) -> Vec<Header> {
        let mut nullifiers = match self.states.get(&tip) {
            Some(state) => state.nullifiers().clone(),
            None => return Vec::new(),
        };
        let branches = self
            .forks
            .iter()
            .copied()
            .chain(std::iter::once(self.local_chain))
            .filter(|branch| *branch != tip);

        let mut orphans = Vec::new();
        for branch in branches {
            let prefix = match common_prefix_depth(&self.states, branch, tip) {
                Some(prefix) => prefix,
                None => continue,
            };
            for state in prefix.suffix_a {
                let block = state.block();
                if let Some(proof) = block.leader_proof() {
                    let nullifier = proof.nullifier();
                    if !nullifiers.contains(&nullifier) {
                        nullifiers.insert_mut(nullifier);
                        orphans.push(block.clone());
                    }
                }
            }
        }
        orphans
    }

    /// The tip the fork choice rule of the current lifecycle prefers,
    /// among the local chain and the forks.
    pub fn fork_choice(&self) -> HeaderId {
        match self.lifecycle {
            Lifecycle::Bootstrapping => maxvalid_bg(
                &self.states,
                self.local_chain,
                &self.forks,
                self.config.k,
                self.config.s(),
            ),
            Lifecycle::Online => {
                maxvalid_mc(&self.states, self.local_chain, &self.forks, self.config.k)
            }
        }
    }

    /// Switch to the online fork choice rule and start advancing the LIB.
    pub fn to_online(&mut self) -> Result<(), LifecycleError> {
        if self.lifecycle == Lifecycle::Online {
            return Err(LifecycleError::AlreadyOnline);
        }
        self.lifecycle = Lifecycle::Online;
        info!(tip = %self.local_chain, "follower is online");
        self.update_lib();
        Ok(())
    }

    /// Move the LIB to `k` blocks behind the tip, and drop the forks which
    /// no longer descend from it.
    fn update_lib(&mut self) {
        let candidate = self.lib_candidate().id();
        if candidate == self.lib {
            return;
        }
        // the LIB never goes back nor sideways
        if !self.states.is_ancestor(&self.lib, &candidate) {
            debug!(lib = %self.lib, candidate = %candidate, "LIB candidate does not descend from the LIB");
            return;
        }
        self.lib = candidate;
        info!(lib = %candidate, "last immutable block advanced");

        self.prune_forks();

        let lib_slot = self.lib_state().slot();
        if let Some(epoch) = self.config.epoch(lib_slot).prev() {
            self.epoch_states.evict_before(epoch);
        }
    }

    fn prune_forks(&mut self) {
        let lib = self.lib;
        let pruned: Vec<HeaderId> = self
            .forks
            .iter()
            .filter(|fork| !self.states.is_ancestor(&lib, fork))
            .copied()
            .collect();
        if pruned.is_empty() {
            return;
        }

        // collect everything first, pruned forks may share blocks
        let mut stale = HashSet::new();
        for fork in &pruned {
            if let Some(prefix) = common_prefix_depth(&self.states, *fork, lib) {
                stale.extend(prefix.suffix_a.iter().map(|state| state.id()));
            }
        }
        for fork in &pruned {
            self.forks.remove(fork);
        }
        for id in &stale {
            self.states.remove(id);
        }
        debug!(forks = pruned.len(), blocks = stale.len(), "pruned forks behind the LIB");
    }

    /// Restart from a checkpoint obtained out of band, taking its state as
    /// the root of the chain. Every known block and fork is forgotten.
    pub fn import_checkpoint(&mut self, checkpoint: Checkpoint) {
        let (state, epoch_state, snapshots) = checkpoint.into_parts();
        let id = state.id();
        info!(checkpoint = %id, slot = %state.slot(), epoch = %epoch_state.epoch(), "importing checkpoint");
        self.states = Multiverse::with_history(state, snapshots);
        self.forks.clear();
        self.local_chain = id;
        self.lib = id;
        self.epoch_states.clear();
        self.epoch_states.set_anchor(epoch_state);
    }

    /// The state `k` blocks behind the tip (or the root)
    fn lib_candidate(&self) -> &LedgerState {
        self.states
            .ancestor_at_depth(self.local_chain, self.config.k)
            .unwrap_or_else(|| self.states.root())
    }

    /// The checkpoint a peer hands out for checkpoint sync, taken `k`
    /// blocks behind the tip.
    pub fn checkpoint(&mut self) -> Checkpoint {
        let state = self.lib_candidate().clone();
        self.build_checkpoint(state)
    }

    /// Checkpoint at a known block
    pub fn checkpoint_at(&mut self, id: &HeaderId) -> Option<Checkpoint> {
        let state = self.states.get(id)?.clone();
        Some(self.build_checkpoint(state))
    }

    fn build_checkpoint(&mut self, state: LedgerState) -> Checkpoint {
        let id = state.id();
        let epoch = self.config.epoch(state.slot());
        let epoch_state = self
            .epoch_states
            .compute(&self.states, &self.config, epoch, id);

        // the next epoch takes its snapshots in this one, maybe before `state`
        let start = self.config.era().epoch_start(epoch);
        let boundaries = [start, start + self.config.epoch_relative_nonce_slot()];
        let mut snapshots: Vec<LedgerState> = Vec::new();
        for boundary in boundaries.iter().filter(|b| **b <= state.slot()) {
            let snapshot = self.states.last_before(id, *boundary);
            if !snapshots.contains(snapshot) {
                snapshots.push(snapshot.clone());
            }
        }
        Checkpoint::new(state, epoch_state, snapshots)
    }

    /// Epoch state of `epoch` as seen from the chain ending at `tip`
    pub fn compute_epoch_state(&mut self, epoch: Epoch, tip: HeaderId) -> EpochState {
        self.epoch_states
            .compute(&self.states, &self.config, epoch, tip)
    }

    /// Every known block from `from` onward, in ascending slot order,
    /// the root included.
    pub fn blocks_by_slot(&self, from: Slot) -> impl Iterator<Item = &Header> + '_ {
        self.states.blocks_by_slot(from)
    }

    /// iterate the states from `tip` back to the root
    pub fn iter_chain(&self, tip: HeaderId) -> IterChain<'_> {
        self.states.iter_chain(tip)
    }

    pub fn tip(&self) -> &Header {
        self.tip_state().block()
    }

    pub fn tip_id(&self) -> HeaderId {
        self.local_chain
    }

    pub fn tip_state(&self) -> &LedgerState {
        // the local chain is always a known block
        self.states
            .get(&self.local_chain)
            .unwrap_or_else(|| self.states.root())
    }

    pub fn lib(&self) -> HeaderId {
        self.lib
    }

    pub fn lib_state(&self) -> &LedgerState {
        self.states
            .get(&self.lib)
            .unwrap_or_else(|| self.states.root())
    }

    pub fn forks(&self) -> &BTreeSet<HeaderId> {
        &self.forks
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &LedgerState {
        self.states.root()
    }

    pub fn state(&self, id: &HeaderId) -> Option<&LedgerState> {
        self.states.get(id)
    }

    pub fn block(&self, id: &HeaderId) -> Option<&Header> {
        self.states.get(id).map(LedgerState::block)
    }

    pub fn contains(&self, id: &HeaderId) -> bool {
        self.states.contains(id)
    }

    /// number of blocks in the tree, the root included
    pub fn block_count(&self) -> usize {
        self.states.len()
    }
}

/// The note of `proof` is either part of the stake distribution of the
/// epoch, or the evolution of a note which already led on the branch of
/// `state`. Either way `state` must not have spent it.
fn is_eligible(
    proof: &LeaderProof,
    slot: Slot,
    parent: &HeaderId,
    epoch_state: &EpochState,
    state: &LedgerState,
) -> bool {
    proof.verify(
        slot,
        parent,
        epoch_state.stake_distribution_snapshot().commitments(),
        state.nullifiers(),
    ) || proof.verify(slot, parent, state.lead_commitments(), state.nullifiers())
}

#[cfg(any(test, feature = "property-test-api"))]
impl Follower {
    /// Overwrite the ledger state of a block, skipping every validation.
    ///
    /// Used to mint notes in a past state, or to make a node serve blocks
    /// it never validated.
    pub fn force_insert_state(&mut self, state: LedgerState) {
        self.states.insert(state);
        self.epoch_states.clear();
    }

    pub(crate) fn cached_epoch_states(&self) -> usize {
        self.epoch_states.len()
    }
}
