/// This contains the slot lottery and its link to the stake distribution
use crate::{
    key::{tag, DomainHasher, Hash},
    note::Note,
};
use chain_time::Slot;

/// Probability for a note holding `relative_stake` of the total active
/// stake to lead a given slot.
///
/// `phi(f, α) = 1 - (1 - f)^α`
pub fn phi(active_slot_coeff: f64, relative_stake: f64) -> f64 {
    1.0 - (1.0 - active_slot_coeff).powf(relative_stake)
}

/// Threshold between 0.0 and 1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Project a 256 bits big endian number in `[0, 1]`.
    ///
    /// Only the highest 64 bits are considered, the remaining ones cannot
    /// move the result by more than the precision of an `f64`.
    pub fn from_u256(v: &[u8; 32]) -> Self {
        let mut high = [0; 8];
        high.copy_from_slice(&v[..8]);
        Threshold(u64::from_be_bytes(high) as f64 / 18446744073709551616.0)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

/// Lottery ticket of a note for the given slot, seeded with the epoch nonce
pub fn ticket(epoch_nonce: &Hash, slot: Slot, note: &Note) -> Hash {
    DomainHasher::new(tag::LEAD)
        .chain(epoch_nonce.as_ref())
        .chain(&slot.to_be_bytes())
        .chain(note.commitment().as_hash().as_ref())
        .chain(note.secret_key.as_bytes())
        .finalize()
}

/// true if the ticket falls under the stake weighted threshold
pub(crate) fn is_winning(ticket: &Hash, active_slot_coeff: f64, relative_stake: f64) -> bool {
    Threshold::from_u256(ticket.as_bytes()).as_f64() < phi(active_slot_coeff, relative_stake)
}
