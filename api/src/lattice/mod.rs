//! The join semilattices that a [`VectorClock`][crate::clock::VectorClock] is assembled from.
//!
//! - **[`MaxLattice`]:** A single counter. Merging keeps the larger value, and the only way to
//!     change it locally is [`advance`][MaxLattice::advance].
//! - **[`MapLattice`]:** An ordered map of lattice values. Merging unions the key sets
//!     and merges the values of shared keys.
//!
//! A vector clock is `MapLattice<NodeId, MaxLattice<u64>>`, which makes its merge the
//! pointwise maximum.

pub use self::{map::MapLattice, max::MaxLattice};

mod map;
mod max;

/// A [_join semilattice_](https://en.wikipedia.org/wiki/Semilattice).
///
/// The merge operator `⊔` must be
/// [commutative](https://en.wikipedia.org/wiki/Commutative),
/// [associative](https://en.wikipedia.org/wiki/Associative_property), and
/// [idempotent](https://en.wikipedia.org/wiki/Idempotence), so replicas that see the same
/// set of updates converge no matter how often or in which order updates arrive.
///
/// **All implementations must fulfill all the join semilattice properties.**
pub trait Lattice {
    /// The type that is stored in this lattice.
    type Element;

    /// Returns the current value stored in the lattice.
    fn reveal(&self) -> &Self::Element;

    /// Replaces the value with `self ⊔ element`.
    ///
    /// Returns `true` if the value grew, i.e. `element` contained something `self` did not
    /// know about yet.
    fn merge_element(&mut self, element: &Self::Element) -> bool;

    /// Replaces the value with `self ⊔ other`, see [`merge_element`][Self::merge_element].
    fn merge(&mut self, other: &Self) -> bool {
        self.merge_element(other.reveal())
    }
}
