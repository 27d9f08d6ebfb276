//! Types for parsing configuration files.
//!
//! The top level config type is [`Config`]. An example file:
//!
//! ```yaml
//! server:
//!   node-id: server
//!   listen: 127.0.0.1:8082
//! client:
//!   node-id: client1
//!   server: 127.0.0.1:8082
//!   timeout-ms: 2000
//! ```

use crate::clock::NodeId;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// The top level config type.
///
/// This type can be read and written to config files using the [`serde::Serialize`] and
/// [`serde::Deserialize`] implementations.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings of the server node.
    pub server: ServerConfig,
    /// Settings of client nodes.
    pub client: ClientConfig,
}

/// Specifies how the server node identifies itself and where it listens.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// The id the server uses in vector clocks. Generated if missing.
    #[serde(default)]
    pub node_id: Option<String>,
    /// The socket address to accept connections on.
    pub listen: SocketAddr,
}

impl ServerConfig {
    /// Returns the configured node id or a fresh `server-<uuid>` id.
    pub fn node_id(&self) -> NodeId {
        resolve_node_id(self.node_id.as_deref(), "server")
    }
}

/// Specifies how a client node identifies itself and which server it calls.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// The id the client uses in vector clocks. Generated if missing.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Address of the server node.
    pub server: SocketAddr,
    /// How long a single call may take before it is abandoned.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ClientConfig {
    /// Returns the configured node id or a fresh `client-<uuid>` id.
    pub fn node_id(&self) -> NodeId {
        resolve_node_id(self.node_id.as_deref(), "client")
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    2000
}

fn resolve_node_id(configured: Option<&str>, role: &str) -> NodeId {
    match configured {
        Some(id) => NodeId::from(id),
        None => NodeId::from(format!("{}-{}", role, uuid::Uuid::new_v4())),
    }
}
