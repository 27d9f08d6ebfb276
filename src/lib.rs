#![warn(missing_docs)]

//! Causality tracking for a small RPC client and server, based on vector clocks.
//!
//! Every node keeps a [`VectorClock`][clock::VectorClock] that maps node ids to event
//! counters. Each call carries the caller's clock snapshot, the server merges it before
//! handling the call and sends its own snapshot back, so both sides can tell whether two
//! events are causally ordered or concurrent.
//!
//! ## Usage Example
//!
//! Open two terminal windows and run the following commands in them (one per terminal window):
//!
//! 1. `cargo run --bin server -- example-config.yml` to start the
//!    [server node](nodes::ServerNode).
//! 2. `cargo run --bin client -- example-config.yml` to start an interactive
//!    [client node](nodes::ClientNode).
//!
//! The client executable will show an `rpc>` prompt, in which you can use commands such as
//! `add 2 3` or `clock`. See [`run_interactive`][nodes::client::run_interactive] for the full
//! list. Alternatively, `cargo run --bin demo` runs a complete scenario with an in-process
//! server and two clients.

pub use causal_rpc_api::{clock, lattice, RpcError};

pub mod config;
pub mod messages;
pub mod nodes;
pub mod operations;
pub mod protocol;
