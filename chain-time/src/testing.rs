use crate::{Epoch, Slot, TimeEra};
use quickcheck::{Arbitrary, Gen};

impl Arbitrary for TimeEra {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        TimeEra::new(u64::from(u16::arbitrary(g)) + 1)
    }
}

impl Arbitrary for Slot {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        // keep clear of overflows when computing the next epoch boundary
        Slot(u64::from(u32::arbitrary(g)))
    }
}

impl Arbitrary for Epoch {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Epoch(u64::from(u16::arbitrary(g)))
    }
}
