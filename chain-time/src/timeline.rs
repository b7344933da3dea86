use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Represent a timeline with a specific start point rooted on earth time.
///
/// For the consensus this is the chain start time, every slot is counted
/// from this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline(pub(crate) SystemTime);

/// Represent an offset in time units in the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOffset(pub(crate) Duration);

impl Timeline {
    /// Create a timeline starting at the given unix timestamp, in seconds
    pub fn from_unix_secs(seconds: u64) -> Self {
        Timeline(UNIX_EPOCH + Duration::from_secs(seconds))
    }

    /// Return the duration since the creation of the timeline
    ///
    /// If the time is earlier than the start of this timeline,
    /// then None is returned.
    pub fn differential(&self, t: &SystemTime) -> Option<TimeOffset> {
        t.duration_since(self.0).ok().map(TimeOffset)
    }

    pub fn start(&self) -> SystemTime {
        self.0
    }
}

impl TimeOffset {
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}
