use crate::{
    era::{Epoch, TimeEra},
    timeline::Timeline,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::Add,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// Absolute slot number, counted from the chain start
///
/// Slots are totally ordered: a slot with a higher number always happens
/// after a slot with a lower number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub(crate) u64);

impl From<u64> for Slot {
    fn from(s: u64) -> Slot {
        Slot(s)
    }
}

impl From<Slot> for u64 {
    fn from(s: Slot) -> u64 {
        s.0
    }
}

impl Add<u64> for Slot {
    type Output = Slot;

    fn add(self, rhs: u64) -> Slot {
        Slot(self.0 + rhs)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Slot {
    pub const fn genesis() -> Self {
        Slot(0)
    }

    /// slot containing the given unix timestamp (in seconds) on the given
    /// time frame, `None` if the timestamp precedes the chain start
    pub fn from_unix_timestamp(frame: &TimeFrame, timestamp_secs: u64) -> Option<Self> {
        frame.slot_at(&(UNIX_EPOCH + Duration::from_secs(timestamp_secs)))
    }

    pub fn epoch(self, era: &TimeEra) -> Epoch {
        era.from_slot_to_era(self).epoch
    }

    /// fixed width encoding used in every hash committing to a slot
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

/// Duration of a slot
///
/// For now we only supports duration down to the seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SlotDuration(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotDurationError {
    #[error("a slot cannot last zero seconds")]
    Zero,
}

impl SlotDuration {
    pub fn from_secs(seconds: u64) -> Result<Self, SlotDurationError> {
        if seconds == 0 {
            Err(SlotDurationError::Zero)
        } else {
            Ok(SlotDuration(seconds))
        }
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn to_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

/// one second per slot
impl Default for SlotDuration {
    fn default() -> Self {
        SlotDuration(1)
    }
}

impl std::convert::TryFrom<u64> for SlotDuration {
    type Error = SlotDurationError;

    fn try_from(seconds: u64) -> Result<Self, Self::Error> {
        SlotDuration::from_secs(seconds)
    }
}

impl From<SlotDuration> for u64 {
    fn from(d: SlotDuration) -> u64 {
        d.0
    }
}

/// Time frame which is a timeline that is configured to be split in discrete slots
///
/// ```text
///
/// 0        1        2        3        4        5
/// x--------x--------x--------x--------x--------x  frame ticking at per_slot
///
/// ^
/// |
/// timeline (chain start)
/// ```
#[derive(Debug, Clone)]
pub struct TimeFrame {
    timeline: Timeline,
    slot_duration: SlotDuration,
}

impl TimeFrame {
    pub fn new(timeline: Timeline, per_slot: SlotDuration) -> Self {
        TimeFrame {
            timeline,
            slot_duration: per_slot,
        }
    }

    /// Get the slot associated with the given system time.
    ///
    /// It returns None if the system time is before the time frame starting point.
    pub fn slot_at(&self, at: &SystemTime) -> Option<Slot> {
        self.timeline
            .differential(at)
            .map(|offset| Slot(offset.as_secs() / self.slot_duration.0))
    }

    /// Get the system time at which the given slot begins
    pub fn slot_to_systemtime(&self, slot: Slot) -> SystemTime {
        self.timeline.start() + Duration::from_secs(slot.0 * self.slot_duration.0)
    }

    pub fn slot_duration(&self) -> SlotDuration {
        self.slot_duration
    }
}
