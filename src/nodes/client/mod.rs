//! Client nodes that call a server and keep their clock in sync with it.

pub use self::interactive::run_interactive;
use super::{receive_tcp_message, send_tcp_message};
use crate::{
    clock::{ClockSnapshot, NodeId},
    config::ClientConfig,
    messages::{CallRequest, CausalityReport, TcpMessage},
    operations::Method,
    protocol::{CallCompletion, NodeClock},
    RpcError,
};
use eyre::{bail, Context, ContextCompat};
use serde_json::Number;
use std::{
    error::Error,
    fmt,
    net::SocketAddr,
    time::{Duration, Instant},
};
use tokio::net::TcpStream;

mod interactive;

/// Issues calls to a single server node.
///
/// Calls may run concurrently; they share the node's [`NodeClock`].
#[derive(Debug)]
pub struct ClientNode {
    clock: NodeClock,
    server: SocketAddr,
    /// Upper bound for one call attempt, including connection setup.
    timeout: Duration,
}

impl ClientNode {
    /// Creates a new client node with a clock seeded as `{node_id: 0}`.
    pub fn new(node_id: NodeId, server: SocketAddr, timeout: Duration) -> Self {
        Self {
            clock: NodeClock::new(node_id),
            server,
            timeout,
        }
    }

    /// Creates a client node from the `client` section of a config file.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.node_id(), config.server, config.timeout())
    }

    /// The id of this node.
    pub fn node_id(&self) -> &NodeId {
        self.clock.node_id()
    }

    /// Returns the current state of the node's clock.
    pub fn clock(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }

    /// Calls `add(x, y)` on the server.
    pub async fn add(&self, x: f64, y: f64) -> Result<CallOutcome, CallError> {
        self.call(Method::Add, x, y).await
    }

    /// Calls `multiply(x, y)` on the server.
    pub async fn multiply(&self, x: f64, y: f64) -> Result<CallOutcome, CallError> {
        self.call(Method::Multiply, x, y).await
    }

    /// Performs one remote call.
    ///
    /// The own clock entry is incremented before anything is sent. If the call times out or
    /// the transport fails, that increment stays and no other clock change happens. On a
    /// response, its clock snapshot is merged, also when the server rejected the call.
    pub async fn call(&self, method: Method, x: f64, y: f64) -> Result<CallOutcome, CallError> {
        let pending = self.clock.begin_call();
        let request = CallRequest::new(method, x, y, pending.sent().clone());

        let reply = tokio::time::timeout(
            self.timeout,
            exchange(self.server, &TcpMessage::Request(request)),
        )
        .await;

        let response = match reply {
            Err(_elapsed) => {
                log::warn!("[{}] {} call timed out", self.node_id(), method);
                pending.abandon();
                return Err(CallError::Timeout(self.timeout));
            }
            Ok(Err(err)) => {
                log::warn!("[{}] {} call failed: {:#}", self.node_id(), method, err);
                pending.abandon();
                return Err(CallError::Transport(err));
            }
            Ok(Ok(TcpMessage::Response(response))) => response,
            Ok(Ok(other)) => {
                pending.abandon();
                return Err(CallError::Transport(eyre::eyre!(
                    "expected Response, got {:?}",
                    other
                )));
            }
        };

        let completion = pending.complete(response.clock.as_ref());
        if let Some(report) = &response.causality {
            log_report(self.node_id(), report);
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(CallError::Application { error, completion }),
            (Some(result), None) => Ok(CallOutcome {
                result,
                completion,
                report: response.causality,
            }),
            (None, None) => Err(CallError::Transport(eyre::eyre!(
                "response has neither result nor error"
            ))),
        }
    }

    /// Sends a `Ping` and returns the round trip time. Does not touch the clock.
    pub async fn ping(&self) -> eyre::Result<Duration> {
        let payload = uuid::Uuid::new_v4().as_bytes().to_vec();
        let start = Instant::now();
        let reply = tokio::time::timeout(
            self.timeout,
            exchange(
                self.server,
                &TcpMessage::Ping {
                    payload: payload.clone(),
                },
            ),
        )
        .await
        .context("ping timed out")??;

        match reply {
            TcpMessage::Pong { payload: echoed } if echoed == payload => Ok(start.elapsed()),
            TcpMessage::Pong { .. } => bail!("pong payload does not match ping"),
            other => bail!("expected Pong, got {:?}", other),
        }
    }
}

/// Sends one message on a fresh connection and waits for the reply.
async fn exchange(server: SocketAddr, message: &TcpMessage) -> eyre::Result<TcpMessage> {
    let stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("failed to connect to {}", server))?;
    stream
        .set_nodelay(true)
        .context("failed to set nodelay for tcpstream")?;
    let (mut receiver, mut sender) = stream.into_split();

    send_tcp_message(message, &mut sender).await?;
    receive_tcp_message(&mut receiver)
        .await?
        .context("connection closed")
}

fn log_report(node_id: &NodeId, report: &CausalityReport) {
    let show = |clock: &Option<ClockSnapshot>| {
        clock
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "N/A".to_owned())
    };
    log::info!(
        "[{}] Causality: {}, client clock: {}, server clock: {}",
        node_id,
        report
            .relationship
            .map(|r| r.as_str())
            .unwrap_or("no client clock"),
        show(&report.client_clock),
        show(&report.server_clock),
    );
}

/// A successfully completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// The value returned by the server.
    pub result: Number,
    /// What happened to the local clock.
    pub completion: CallCompletion,
    /// The server's view of the call, if it sent one.
    pub report: Option<CausalityReport>,
}

/// A call that did not produce a result.
#[derive(Debug)]
pub enum CallError {
    /// No response arrived within the configured bound.
    Timeout(Duration),
    /// The connection failed or the response could not be read.
    Transport(eyre::Report),
    /// The server answered, but rejected the call. Its clock was merged.
    Application {
        /// The reason given by the server.
        error: RpcError,
        /// What happened to the local clock.
        completion: CallCompletion,
    },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Timeout(after) => write!(f, "Request timed out after {:?}", after),
            CallError::Transport(_) => f.write_str("Request failed"),
            CallError::Application { .. } => f.write_str("Request rejected by server"),
        }
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CallError::Timeout(_) => None,
            CallError::Transport(err) => Some(&**err),
            CallError::Application { error, .. } => Some(error),
        }
    }
}
