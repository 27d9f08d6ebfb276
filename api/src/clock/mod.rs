//! Vector clocks and the snapshots that nodes exchange.
//!
//! A [vector clock](https://en.wikipedia.org/wiki/Vector_clock) maps every node a party has
//! heard of to a logical counter. The ordering is a partial one:
//!
//! - `a ≤ b` iff `∀ node: a[node] ≤ b[node]`
//! - `a` happens-before `b` iff `a ≤ b` and `a ≠ b`
//! - `a` and `b` are concurrent iff neither `a ≤ b` nor `b ≤ a`
//!
//! Nodes that are missing from a clock count as `0`, so clocks with different key sets are
//! always comparable. See [`causality::compare`].

pub use self::{
    causality::{compare, CausalityRelation},
    snapshot::{deserialize_lenient, ClockSnapshot, MalformedSnapshot},
};
use crate::lattice::{Lattice, MapLattice, MaxLattice};
use std::{collections::BTreeMap, fmt, sync::Arc};

pub mod causality;
mod snapshot;

/// Opaque identifier that a node picks for itself at startup.
///
/// Identifiers are not coordinated between nodes. Two physical nodes that pick the same id
/// are indistinguishable to every clock, which corrupts the causality information.
///
/// Wraps an [`Arc`] because ids are cloned into every clock entry and log line.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeId(Arc<String>);

impl std::ops::Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(Arc::new(id))
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::from(id.to_owned())
    }
}

/// A per-node map of logical counters.
///
/// The clock is a [`MapLattice`] of [`MaxLattice`] counters, so [`Lattice::merge`] is the
/// pointwise maximum and can never lower an entry. The only other mutation is
/// [`increment`][Self::increment], which advances a single entry by exactly one.
///
/// ```
/// use causal_rpc_api::clock::{CausalityRelation, NodeId, VectorClock};
///
/// let client = NodeId::from("c");
/// let server = NodeId::from("s");
///
/// let mut client_clock = VectorClock::seeded(&client);
/// client_clock.increment(&client);
/// let sent = client_clock.snapshot();
///
/// let mut server_clock = VectorClock::new();
/// server_clock.merge_snapshot(&sent);
/// server_clock.increment(&server);
///
/// assert_eq!(sent.compare(&server_clock.snapshot()), CausalityRelation::HappensBefore);
/// ```
///
/// Equality follows the same implicit-zero rule as the ordering: `{a: 1}` equals
/// `{a: 1, b: 0}`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    entries: MapLattice<NodeId, MaxLattice<u64>>,
}

impl VectorClock {
    /// Creates an empty clock, i.e. all counters are implicitly zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that already lists the given node with a counter of zero.
    pub fn seeded(own: &NodeId) -> Self {
        let mut clock = Self::new();
        clock.entries.entry_or_bottom(own.clone());
        clock
    }

    /// Returns the counter of the given node, `0` if the node is unknown.
    pub fn get(&self, node: &str) -> u64 {
        self.entries
            .get(node)
            .map(MaxLattice::get)
            .unwrap_or(0)
    }

    /// Advances the counter of `node` by one and returns the new value.
    pub fn increment(&mut self, node: &NodeId) -> u64 {
        self.entries.entry_or_bottom(node.clone()).advance()
    }

    /// Folds the given snapshot into this clock (pointwise maximum).
    ///
    /// Returns `true` if an entry was added or raised.
    pub fn merge_snapshot(&mut self, snapshot: &ClockSnapshot) -> bool {
        self.merge(snapshot.as_clock())
    }

    /// Returns an immutable copy of the current state.
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot::new(self.clone())
    }

    /// Classifies `self` relative to `other`, see [`causality::compare`].
    pub fn compare(&self, other: &VectorClock) -> CausalityRelation {
        compare(self, other)
    }

    /// Iterates over the known `(node, counter)` pairs in node order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u64)> + '_ {
        self.entries
            .reveal()
            .iter()
            .map(|(node, counter)| (node, counter.get()))
    }

    /// Returns the ids of all nodes this clock has an entry for.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.entries.keys()
    }

    /// Returns the number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the clock has no explicit entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Lattice for VectorClock {
    type Element = BTreeMap<NodeId, MaxLattice<u64>>;

    fn reveal(&self) -> &Self::Element {
        self.entries.reveal()
    }

    fn merge_element(&mut self, element: &Self::Element) -> bool {
        self.entries.merge_element(element)
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == CausalityRelation::Equal
    }
}

impl Eq for VectorClock {}

impl PartialOrd for VectorClock {
    /// Returns `None` for concurrent clocks.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        match self.compare(other) {
            CausalityRelation::HappensBefore => Some(Ordering::Less),
            CausalityRelation::HappensAfter => Some(Ordering::Greater),
            CausalityRelation::Equal => Some(Ordering::Equal),
            CausalityRelation::Concurrent => None,
        }
    }
}

impl<N: Into<NodeId>> FromIterator<(N, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (N, u64)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(node, counter)| (node.into(), MaxLattice::new(counter)))
                .collect(),
        }
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (node, counter)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", node, counter)?;
        }
        f.write_str("}")
    }
}
