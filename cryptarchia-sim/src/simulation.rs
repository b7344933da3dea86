//! A network of stake holders, each running a leader and a follower, fed
//! slot by slot. Every proposed block reaches every node within its slot,
//! in a random order.

use crate::settings::Settings;
use chain_time::Slot;
use cryptarchia_consensus::{
    Config, Follower, Hash, Header, HeaderId, Leader, LedgerState, Lifecycle, Note,
};
use cryptarchia_sync::BootstrapPolicy;
use rand::{seq::SliceRandom, RngCore};
use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
use std::fmt;
use tracing::{debug, info, span, Level};

const BLOCK_CONTENT_SIZE: usize = 32;

pub struct Node {
    /// the note as registered in the genesis
    note: Note,
    follower: Follower,
    policy: BootstrapPolicy,
    produced: u64,
}

/// State of a node at the end of the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: usize,
    pub tip: HeaderId,
    pub tip_slot: Slot,
    pub height: u64,
    pub lib: HeaderId,
    pub forks: usize,
    pub produced: u64,
    pub total_active_stake: u64,
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: tip {} (slot {}, height {}), lib {}, {} forks, {} blocks produced, inferred stake {}",
            self.node,
            self.tip,
            self.tip_slot,
            self.height,
            self.lib,
            self.forks,
            self.produced,
            self.total_active_stake
        )
    }
}

/// The first evolution of `note` not yet spent on the branch of `state`.
///
/// A leader switching branch after a reorganisation has to use the note
/// matching that branch, not the last one it evolved.
fn unspent_evolution(note: &Note, state: &LedgerState) -> Note {
    let mut note = note.clone();
    while state.is_nullified(&note.nullifier()) {
        note = note.evolve();
    }
    note
}

/// The proofs a block on top of `tip` should import, and the state of
/// `tip` once they are: the notes they spend are spent there too.
fn with_orphans(follower: &Follower, tip: HeaderId) -> (Vec<Header>, LedgerState) {
    let orphans = follower.unimported_orphans(tip);
    let state = follower.state(&tip).unwrap_or_else(|| follower.root()).clone();
    let state = orphans
        .iter()
        .filter_map(Header::leader_proof)
        .fold(state, |state, proof| state.import_leader_proof(proof));
    (orphans, state)
}

pub struct Simulation {
    config: Config,
    nodes: Vec<Node>,
    rng: ChaChaRng,
}

impl Simulation {
    pub fn new(settings: &Settings) -> Result<Self, cryptarchia_consensus::ConfigError> {
        let config = settings.consensus.clone();
        let genesis_header = Header::genesis(Slot::genesis(), 0, Hash::hash_bytes(b"genesis"));
        let genesis = LedgerState::from_commitments(
            genesis_header,
            Hash::zero(),
            settings.notes.iter().map(Note::commitment),
        );
        let started = config.time_frame().slot_to_systemtime(Slot::genesis());

        let nodes = settings
            .notes
            .iter()
            .map(|note| {
                Ok(Node {
                    note: note.clone(),
                    follower: Follower::new(genesis.clone(), config.clone())?,
                    policy: BootstrapPolicy::new(settings.bootstrap_period, started),
                    produced: 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Simulation {
            config,
            nodes,
            rng: ChaChaRng::seed_from_u64(settings.seed),
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Follower> {
        self.nodes.iter().map(|node| &node.follower)
    }

    /// Run the lottery of `slot` on every node and deliver the blocks.
    /// Returns the number of blocks proposed.
    pub fn run_slot(&mut self, slot: Slot) -> usize {
        let span = span!(Level::DEBUG, "slot", slot = %slot);
        let _enter = span.enter();

        let epoch = self.config.epoch(slot);
        let mut proposals = Vec::new();
        for node in self.nodes.iter_mut() {
            let parent = node.follower.tip_id();
            let (orphans, branch) = with_orphans(&node.follower, parent);
            let note = unspent_evolution(&node.note, &branch);
            let epoch_state = node.follower.compute_epoch_state(epoch, parent);
            let leader = Leader::new(note, self.config.clone());
            if let Some(proof) = leader.try_prove_slot_leader(&epoch_state, slot, parent) {
                let mut content = [0; BLOCK_CONTENT_SIZE];
                self.rng.fill_bytes(&mut content);
                if !orphans.is_empty() {
                    debug!(orphans = orphans.len(), "importing orphaned proofs");
                }
                let block = Header::with_orphaned_proofs(
                    parent,
                    slot,
                    BLOCK_CONTENT_SIZE as u32,
                    Hash::hash_bytes(&content),
                    proof,
                    orphans,
                );
                node.produced += 1;
                proposals.push(block);
            }
        }

        let now = self.config.time_frame().slot_to_systemtime(slot);
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let mut delivery = proposals.clone();
            delivery.shuffle(&mut self.rng);
            for block in delivery {
                let id = block.id();
                match node.follower.on_block(block) {
                    Ok(applied) => debug!(node = index, block = %id, ?applied, "block delivered"),
                    Err(error) => debug!(node = index, block = %id, %error, "block refused"),
                }
            }
            node.policy.apply(&mut node.follower, now);
        }
        proposals.len()
    }

    /// Run `slots` slots from slot 1 on, then switch the remaining
    /// bootstrapping nodes online.
    pub fn run(&mut self, slots: u64) -> Vec<NodeReport> {
        let mut proposed = 0;
        for slot in 1..=slots {
            proposed += self.run_slot(Slot::from(slot));
        }
        info!(slots, proposed, "simulation done");

        for node in self.nodes.iter_mut() {
            if node.follower.lifecycle() == Lifecycle::Online {
                continue;
            }
            if let Err(error) = node.follower.to_online() {
                debug!(%error, "node already online");
            }
        }
        let reports = self.report();
        for report in &reports {
            info!(
                node = report.node,
                tip = %report.tip,
                lib = %report.lib,
                forks = report.forks,
                total_active_stake = report.total_active_stake,
                "final state"
            );
        }
        reports
    }

    pub fn report(&mut self) -> Vec<NodeReport> {
        let config = &self.config;
        self.nodes
            .iter_mut()
            .enumerate()
            .map(|(index, node)| {
                let tip = node.follower.tip_state().clone();
                let epoch = config.epoch(tip.slot());
                let epoch_state = node.follower.compute_epoch_state(epoch, tip.id());
                NodeReport {
                    node: index,
                    tip: tip.id(),
                    tip_slot: tip.slot(),
                    height: tip.leader_count(),
                    lib: node.follower.lib(),
                    forks: node.follower.forks().len(),
                    produced: node.produced,
                    total_active_stake: epoch_state.total_active_stake(),
                }
            })
            .collect()
    }
}
