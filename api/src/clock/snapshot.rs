use super::{CausalityRelation, NodeId, VectorClock};
use std::{error::Error, fmt};

/// An immutable copy of a [`VectorClock`], as carried by a single request or response.
///
/// Snapshots are created with [`VectorClock::snapshot`] at send time and consumed by the
/// receiver's merge. They serialize as a plain JSON object of node ids to counters.
///
/// Decoding a snapshot from an untrusted message goes through [`ClockSnapshot::from_value`]
/// or [`deserialize_lenient`], which validate the payload explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ClockSnapshot {
    clock: VectorClock,
}

impl ClockSnapshot {
    pub(super) fn new(clock: VectorClock) -> Self {
        Self { clock }
    }

    /// Validates a decoded JSON value.
    ///
    /// The value must be an object whose values are all non-negative integers. Anything else
    /// is rejected as a whole; there is no partial acceptance of individual entries.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, MalformedSnapshot> {
        let object = value.as_object().ok_or_else(|| MalformedSnapshot {
            reason: format!("expected an object, got `{}`", value),
        })?;

        let mut entries = Vec::with_capacity(object.len());
        for (node, counter) in object {
            let counter = counter.as_u64().ok_or_else(|| MalformedSnapshot {
                reason: format!(
                    "counter for node `{}` is not a non-negative integer: `{}`",
                    node, counter
                ),
            })?;
            entries.push((NodeId::from(node.as_str()), counter));
        }

        Ok(Self {
            clock: entries.into_iter().collect(),
        })
    }

    /// Returns the counter of the given node, `0` if the node is unknown.
    pub fn get(&self, node: &str) -> u64 {
        self.clock.get(node)
    }

    /// Classifies `self` relative to `other`.
    pub fn compare(&self, other: &ClockSnapshot) -> CausalityRelation {
        self.clock.compare(&other.clock)
    }

    /// Read-only access to the captured clock.
    pub fn as_clock(&self) -> &VectorClock {
        &self.clock
    }
}

impl<N: Into<NodeId>> FromIterator<(N, u64)> for ClockSnapshot {
    fn from_iter<I: IntoIterator<Item = (N, u64)>>(iter: I) -> Self {
        Self {
            clock: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ClockSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.clock, f)
    }
}

/// A clock payload that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSnapshot {
    reason: String,
}

impl fmt::Display for MalformedSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed clock snapshot: {}", self.reason)
    }
}

impl Error for MalformedSnapshot {}

/// Serde `deserialize_with` helper for optional clock fields in messages.
///
/// Never fails: a missing or `null` field yields `None`, and so does a malformed payload
/// (after logging a warning). Use it together with `#[serde(default)]`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<ClockSnapshot>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: serde_json::Value = serde::Deserialize::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match ClockSnapshot::from_value(&value) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(err) => {
            log::warn!("ignoring clock payload: {}", err);
            Ok(None)
        }
    }
}
