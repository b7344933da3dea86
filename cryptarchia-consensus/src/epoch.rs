//! Epoch state: the stake distribution and the nonce a slot lottery is run
//! against, along with the inferred total active stake.
//!
//! For epoch `e > 0`:
//!
//! * the stake distribution snapshot is the state of the last block before
//!   the start of epoch `e - 1`;
//! * the nonce snapshot is the state of the last block before
//!   `epoch_relative_nonce_slot` slots into epoch `e - 1`;
//! * the total active stake is inferred from the number of blocks produced
//!   between the two snapshots, correcting the estimate of epoch `e - 1`.
//!
//! Epoch 0 takes both snapshots at the root of the chain and uses the
//! configured initial total active stake.

use crate::{
    config::Config,
    key::{Hash, HeaderId},
    ledger::LedgerState,
    multiverse::Multiverse,
};
use chain_time::Epoch;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochState {
    epoch: Epoch,
    stake_distribution_snapshot: LedgerState,
    nonce_snapshot: LedgerState,
    inferred_total_active_stake: u64,
}

impl EpochState {
    fn genesis(root: &LedgerState, config: &Config) -> Self {
        EpochState {
            epoch: Epoch(0),
            stake_distribution_snapshot: root.clone(),
            nonce_snapshot: root.clone(),
            inferred_total_active_stake: config.initial_total_active_stake,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn stake_distribution_snapshot(&self) -> &LedgerState {
        &self.stake_distribution_snapshot
    }

    pub fn nonce_snapshot(&self) -> &LedgerState {
        &self.nonce_snapshot
    }

    /// nonce seeding the slot lottery of the epoch
    pub fn nonce(&self) -> &Hash {
        self.nonce_snapshot.nonce()
    }

    pub fn total_active_stake(&self) -> u64 {
        self.inferred_total_active_stake
    }
}

/// Proportional controller nudging the total stake estimate toward the value
/// reproducing the block production rate observed between the snapshots.
pub fn infer_total_active_stake(
    previous: u64,
    stake_distribution_snapshot: &LedgerState,
    nonce_snapshot: &LedgerState,
    config: &Config,
) -> u64 {
    let observed_blocks = nonce_snapshot
        .leader_count()
        .saturating_sub(stake_distribution_snapshot.leader_count());
    let mean_rate = observed_blocks as f64 / config.epoch_relative_nonce_slot() as f64;
    let expected_rate = (1.0 / (1.0 - config.active_slot_coeff)).ln();
    let error = expected_rate - mean_rate;
    let h = config.total_active_stake_learning_rate * previous as f64 / expected_rate;
    // float to integer casts saturate, a negative estimate becomes zero
    (previous as f64 - h * error) as u64
}

/// Memoized epoch states, keyed by epoch and nonce snapshot.
///
/// The anchor is the epoch state a checkpoint was imported with. It stands
/// in for every epoch up to its own, and is never evicted.
#[derive(Debug, Clone, Default)]
pub(crate) struct EpochStateCache {
    entries: HashMap<(Epoch, HeaderId), EpochState>,
    anchor: Option<EpochState>,
}

impl EpochStateCache {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.anchor = None;
    }

    pub(crate) fn set_anchor(&mut self, anchor: EpochState) {
        self.anchor = Some(anchor);
    }

    /// drop the states of the epochs before `epoch`
    pub(crate) fn evict_before(&mut self, epoch: Epoch) {
        self.entries.retain(|(e, _), _| *e >= epoch)
    }

    /// Epoch state of `epoch` as seen from the chain ending at `tip`.
    ///
    /// Two epochs after the one of the tip, both snapshots are the tip
    /// itself: only the estimate still moves, and it does so without a
    /// lookup until it stops changing.
    pub(crate) fn compute(
        &mut self,
        multiverse: &Multiverse,
        config: &Config,
        epoch: Epoch,
        tip: HeaderId,
    ) -> EpochState {
        let tip = if multiverse.contains(&tip) {
            tip
        } else {
            multiverse.root_id()
        };
        let tip_slot = multiverse.get(&tip).map_or(multiverse.root().slot(), LedgerState::slot);
        let quiet = Epoch(config.epoch(tip_slot).0.saturating_add(2));
        if epoch <= quiet {
            return self.compute_memoized(multiverse, config, epoch, tip);
        }

        let base = self.compute_memoized(multiverse, config, quiet, tip);
        let mut inferred = base.inferred_total_active_stake;
        for _ in quiet.0..epoch.0 {
            let next = infer_total_active_stake(
                inferred,
                &base.stake_distribution_snapshot,
                &base.nonce_snapshot,
                config,
            );
            if next == inferred {
                break;
            }
            inferred = next;
        }
        EpochState {
            epoch,
            inferred_total_active_stake: inferred,
            ..base
        }
    }

    /// Each epoch depends on the estimate of the previous one: walk the
    /// epochs down to the first memoized one (the anchor, or epoch 0), then
    /// compute forward.
    fn compute_memoized(
        &mut self,
        multiverse: &Multiverse,
        config: &Config,
        epoch: Epoch,
        tip: HeaderId,
    ) -> EpochState {
        let era = config.era();
        let mut pending = Vec::new();
        let mut current = epoch;

        let mut state = loop {
            if let Some(anchor) = self.anchor.as_ref().filter(|a| current <= a.epoch) {
                break EpochState {
                    epoch: current,
                    ..anchor.clone()
                };
            }
            let prev = match current.prev() {
                None => break EpochState::genesis(multiverse.root(), config),
                Some(prev) => prev,
            };
            let prev_start = era.epoch_start(prev);
            let stake = multiverse.last_before(tip, prev_start);
            let nonce = multiverse.last_before(tip, prev_start + config.epoch_relative_nonce_slot());
            if let Some(known) = self.entries.get(&(current, nonce.id())) {
                break known.clone();
            }
            pending.push((current, stake, nonce));
            current = prev;
        };

        while let Some((epoch, stake, nonce)) = pending.pop() {
            let inferred = infer_total_active_stake(
                state.inferred_total_active_stake,
                stake,
                nonce,
                config,
            );
            state = EpochState {
                epoch,
                stake_distribution_snapshot: stake.clone(),
                nonce_snapshot: nonce.clone(),
                inferred_total_active_stake: inferred,
            };
            self.entries.insert((epoch, nonce.id()), state.clone());
        }
        state
    }
}
