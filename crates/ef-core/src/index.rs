use core::fmt;
use serde::{Deserialize, Serialize};

/// Age group index into the population cube and all age-resolved parameters.
///
/// A thin newtype over `usize` so age indices cannot be mixed up with flat
/// compartment offsets or node indices.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgeGroup(pub usize);

impl AgeGroup {
    /// Recover the raw 0-based index.
    pub fn get(self) -> usize {
        self.0
    }

    /// Iterate over all age groups `0..count`.
    pub fn range(count: usize) -> impl Iterator<Item = AgeGroup> {
        (0..count).map(AgeGroup)
    }
}

impl fmt::Debug for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgeGroup({})", self.0)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
