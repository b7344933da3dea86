pub mod era;
pub mod timeframe;
pub mod timeline;

#[cfg(any(test, feature = "property-test-api"))]
pub mod testing;

pub use era::{Epoch, TimeEra};
pub use timeframe::{Slot, SlotDuration, SlotDurationError, TimeFrame};
pub use timeline::Timeline;
