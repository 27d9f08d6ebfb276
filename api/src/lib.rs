//! Shared types for `causal-rpc` nodes: the [`lattice`] building blocks, the
//! [`clock`] types that travel with every call, and the [`RpcError`] codes that a
//! server reports back to its callers.

#![warn(missing_docs)]

use std::{error::Error, fmt::Display};

pub mod clock;
pub mod lattice;

pub use clock::{compare, CausalityRelation, ClockSnapshot, NodeId, VectorClock};

/// Business-level errors that a server reports in a response.
///
/// These never stop clock propagation: a response carrying an error still carries the
/// server's clock snapshot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RpcError {
    /// The request frame could not be decoded.
    InvalidMessage,
    /// The request did not name a supported method.
    UnknownMethod,
    /// At least one of the `x` and `y` operands is missing.
    MissingOperands,
    /// An operand is neither a number nor a string holding a number.
    NonNumericOperands,
    /// The operation produced a value that JSON cannot represent (infinite or NaN).
    NonFiniteResult,
}

impl Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMessage => write!(f, "Invalid JSON"),
            Self::UnknownMethod => write!(f, "Not found"),
            Self::MissingOperands => write!(f, "Missing 'x' or 'y' in request body"),
            Self::NonNumericOperands => write!(f, "'x' and 'y' must be numbers"),
            Self::NonFiniteResult => write!(f, "Result is not a finite number"),
        }
    }
}

impl Error for RpcError {}
