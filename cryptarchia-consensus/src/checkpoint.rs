//! Trusted starting point for a follower that does not replay the chain
//! from genesis.
//!
//! A ledger state alone is not enough to follow the chain past it: the
//! epoch states of the following epochs depend on the stake and nonce
//! snapshots taken before it, and on the total stake estimate carried from
//! epoch to epoch. A [`Checkpoint`] carries both along with the state.

use crate::{epoch::EpochState, key::HeaderId, ledger::LedgerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    state: LedgerState,
    epoch_state: EpochState,
    snapshots: Vec<LedgerState>,
}

impl Checkpoint {
    /// `epoch_state` is the epoch state of the epoch of `state`, as seen
    /// from `state`. `snapshots` are the states before `state` that the
    /// next epoch state will be taken from.
    pub fn new(state: LedgerState, epoch_state: EpochState, snapshots: Vec<LedgerState>) -> Self {
        Checkpoint {
            state,
            epoch_state,
            snapshots,
        }
    }

    pub fn id(&self) -> HeaderId {
        self.state.id()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn epoch_state(&self) -> &EpochState {
        &self.epoch_state
    }

    pub fn snapshots(&self) -> &[LedgerState] {
        &self.snapshots
    }

    pub(crate) fn into_parts(self) -> (LedgerState, EpochState, Vec<LedgerState>) {
        (self.state, self.epoch_state, self.snapshots)
    }
}
