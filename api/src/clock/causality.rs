//! Classification of two clocks under the vector clock partial order.

use super::VectorClock;
use std::fmt;

/// How one clock relates to another.
///
/// Always derived from two clocks and never stored. The serialized names are the ones used
/// in causality reports (`happens-before`, `happens-after`, `concurrent`, `equal`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CausalityRelation {
    /// Every counter of the left clock is `≤` the right one and at least one is `<`.
    HappensBefore,
    /// Every counter of the left clock is `≥` the right one and at least one is `>`.
    HappensAfter,
    /// Each clock has at least one counter that is larger than in the other.
    Concurrent,
    /// All counters are equal.
    Equal,
}

impl CausalityRelation {
    /// Returns the relation obtained by swapping the two operands.
    pub fn inverse(self) -> Self {
        match self {
            Self::HappensBefore => Self::HappensAfter,
            Self::HappensAfter => Self::HappensBefore,
            other => other,
        }
    }

    /// The kebab-case name of the relation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HappensBefore => "happens-before",
            Self::HappensAfter => "happens-after",
            Self::Concurrent => "concurrent",
            Self::Equal => "equal",
        }
    }
}

impl fmt::Display for CausalityRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies `a` relative to `b`.
///
/// Keys missing from either clock are read as `0`, so clocks held by nodes that know a
/// different set of peers still compare. The function only reads its arguments.
///
/// ```
/// use causal_rpc_api::clock::{compare, CausalityRelation, VectorClock};
///
/// let a: VectorClock = [("a", 2)].into_iter().collect();
/// let b: VectorClock = [("a", 2), ("b", 1)].into_iter().collect();
/// assert_eq!(compare(&a, &b), CausalityRelation::HappensBefore);
/// ```
pub fn compare(a: &VectorClock, b: &VectorClock) -> CausalityRelation {
    let mut a_greater = false;
    let mut b_greater = false;

    for node in a.nodes().chain(b.nodes()) {
        let (left, right) = (a.get(node), b.get(node));
        if left > right {
            a_greater = true;
        } else if right > left {
            b_greater = true;
        }
        if a_greater && b_greater {
            return CausalityRelation::Concurrent;
        }
    }

    match (a_greater, b_greater) {
        (false, false) => CausalityRelation::Equal,
        (false, true) => CausalityRelation::HappensBefore,
        (true, false) => CausalityRelation::HappensAfter,
        (true, true) => CausalityRelation::Concurrent,
    }
}
