//! Slot leadership: deciding whether a note may extend the chain in a
//! given slot and producing the matching proof.

mod lottery;
mod proof;

pub use lottery::{phi, ticket, Threshold};
pub use proof::LeaderProof;

use crate::{config::Config, epoch::EpochState, key::HeaderId, note::Note};
use chain_time::Slot;

/// A stake holder taking part in the slot lottery with a single note
#[derive(Debug, Clone)]
pub struct Leader {
    note: Note,
    config: Config,
}

impl Leader {
    pub fn new(note: Note, config: Config) -> Self {
        Leader { note, config }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    /// Replace the note by its evolution, to be called once a proof made
    /// with the current note has been used in a block.
    pub fn evolve(&mut self) {
        self.note = self.note.evolve();
    }

    /// relative stake of the note compared to the total active stake
    /// inferred for the epoch
    pub fn relative_stake(&self, epoch_state: &EpochState) -> f64 {
        self.note.value as f64 / epoch_state.total_active_stake() as f64
    }

    /// Run the lottery of `slot` for our note.
    ///
    /// Not being selected is the common case and gives `None`.
    pub fn try_prove_slot_leader(
        &self,
        epoch_state: &EpochState,
        slot: Slot,
        parent: HeaderId,
    ) -> Option<LeaderProof> {
        let ticket = ticket(epoch_state.nonce(), slot, &self.note);
        let relative_stake = self.relative_stake(epoch_state);
        if lottery::is_winning(&ticket, self.config.active_slot_coeff, relative_stake) {
            tracing::debug!(%slot, %parent, "won the slot lottery");
            Some(LeaderProof::new(self.note.clone(), slot, parent))
        } else {
            None
        }
    }
}
