use super::Lattice;

/// A counter that only moves forward.
///
/// Merging keeps the larger of both values:
///
/// ```
/// use causal_rpc_api::lattice::{Lattice, MaxLattice};
///
/// let mut counter = MaxLattice::new(4u64);
/// assert!(counter.merge_element(&6));
/// assert!(!counter.merge_element(&5));
/// assert_eq!(counter.get(), 6);
///
/// assert_eq!(counter.advance(), 7);
/// ```
///
/// There is no way to decrease or overwrite the value.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default,
    serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MaxLattice<T> {
    element: T,
}

impl<T: Ord + Copy> MaxLattice<T> {
    /// Constructs a new counter starting at `element`.
    pub fn new(element: T) -> Self {
        Self { element }
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.element
    }
}

impl MaxLattice<u64> {
    /// Moves the counter forward by one and returns the new value.
    ///
    /// Saturates at `u64::MAX`.
    pub fn advance(&mut self) -> u64 {
        self.element = self.element.saturating_add(1);
        self.element
    }
}

impl<T: Ord + Copy> Lattice for MaxLattice<T> {
    type Element = T;

    fn reveal(&self) -> &T {
        &self.element
    }

    fn merge_element(&mut self, element: &T) -> bool {
        if self.element < *element {
            self.element = *element;
            true
        } else {
            false
        }
    }
}
