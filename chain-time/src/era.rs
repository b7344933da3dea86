//! Split the slots of a timeframe in epochs

use crate::timeframe::Slot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Epoch number
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Epoch(pub u64);

/// Slot Offset *in* a given epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EpochSlotOffset(pub(crate) u64);

/// Epoch position: this is an epoch and a slot offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EpochPosition {
    pub(crate) epoch: Epoch,
    pub(crate) slot: EpochSlotOffset,
}

impl Epoch {
    /// the previous epoch, `None` for the first epoch
    pub fn prev(self) -> Option<Epoch> {
        self.0.checked_sub(1).map(Epoch)
    }

    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

impl From<u64> for Epoch {
    fn from(e: u64) -> Self {
        Epoch(e)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Describe the era of the chain: every epoch have a constant number of slots,
/// the first epoch starting at the genesis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEra {
    slots_per_epoch: u64,
}

impl TimeEra {
    /// `slots_per_epoch` must not be zero, the consensus configuration
    /// guarantees it when deriving the epoch length.
    pub fn new(slots_per_epoch: u64) -> Self {
        debug_assert!(slots_per_epoch > 0);
        TimeEra { slots_per_epoch }
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    /// return the epoch/inner-epoch-slot associated.
    pub(crate) fn from_slot_to_era(&self, slot: Slot) -> EpochPosition {
        let slot: u64 = slot.into();
        EpochPosition {
            epoch: Epoch(slot / self.slots_per_epoch),
            slot: EpochSlotOffset(slot % self.slots_per_epoch),
        }
    }

    /// Convert an epoch position into a flat slot
    pub(crate) fn from_era_to_slot(&self, pos: EpochPosition) -> Slot {
        debug_assert!(pos.slot.0 < self.slots_per_epoch);
        Slot::from(pos.epoch.0 * self.slots_per_epoch + pos.slot.0)
    }

    /// first slot of the given epoch
    pub fn epoch_start(&self, epoch: Epoch) -> Slot {
        self.from_era_to_slot(EpochPosition {
            epoch,
            slot: EpochSlotOffset(0),
        })
    }
}
