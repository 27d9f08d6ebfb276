//! The server node that executes calls and propagates clocks back to callers.

use super::{decode_message, receive_tcp_frame, send_tcp_message};
use crate::{
    clock::NodeId,
    config::ServerConfig,
    messages::{CallRequest, CallResponse, CausalityReport, TcpMessage},
    operations::{self, Method},
    protocol::NodeClock,
    RpcError,
};
use eyre::{bail, Context};
use futures::{future::FusedFuture, FutureExt};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::net::{TcpListener, TcpStream};

/// Starts a server node based on the given config and blocks until `Ctrl-C`.
pub fn run(config: &ServerConfig) -> eyre::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    runtime.block_on(async {
        let node = ServerNode::bind(config.node_id(), config.listen).await?;
        let shutdown = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for ctrl-c, running until killed: {}", err);
                futures::future::pending::<()>().await;
            }
        };
        node.run(shutdown.fuse()).await
    })
}

/// Accepts TCP connections and answers [`CallRequest`]s.
///
/// There is one [`NodeClock`] per server, shared by all connection tasks.
pub struct ServerNode {
    clock: Arc<NodeClock>,
    listener: TcpListener,
}

impl ServerNode {
    /// Binds the listening socket. Use port `0` to pick a free port.
    pub async fn bind(node_id: NodeId, listen: SocketAddr) -> eyre::Result<Self> {
        let listener = TcpListener::bind(listen)
            .await
            .with_context(|| format!("failed to bind tcp listener to {}", listen))?;
        log::info!(
            "Server node {} listening on {}",
            node_id,
            listener.local_addr()?
        );
        Ok(Self {
            clock: Arc::new(NodeClock::new(node_id)),
            listener,
        })
    }

    /// The address the node accepts connections on.
    pub fn local_addr(&self) -> eyre::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to get local address")
    }

    /// The clock of this node.
    pub fn clock(&self) -> Arc<NodeClock> {
        self.clock.clone()
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Every connection is served by its own task. Errors on a single connection are logged
    /// and do not stop the node.
    pub async fn run(self, shutdown: impl Future<Output = ()> + FusedFuture) -> eyre::Result<()> {
        futures::pin_mut!(shutdown);
        loop {
            futures::select! {
                accepted = self.listener.accept().fuse() => {
                    let (stream, peer) = accepted.context("failed to accept connection")?;
                    log::debug!("accepted connection from {}", peer);
                    let clock = self.clock.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, &clock).await {
                            log::error!("connection to {} failed: {:?}", peer, err);
                        }
                    });
                }
                () = shutdown => {
                    log::info!("Server node {} shutting down", self.clock.node_id());
                    break;
                }
            }
        }
        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, clock: &NodeClock) -> eyre::Result<()> {
    stream
        .set_nodelay(true)
        .context("failed to set nodelay for tcpstream")?;
    let (mut rx, mut tx) = stream.into_split();

    while let Some(frame) = receive_tcp_frame(&mut rx).await? {
        let reply = match decode_message(&frame) {
            Ok(TcpMessage::Request(request)) => TcpMessage::Response(handle_request(clock, request)),
            Ok(TcpMessage::Ping { payload }) => TcpMessage::Pong { payload },
            Ok(other) => bail!("unexpected tcp message {:?}", other),
            Err(err) => {
                log::warn!("{:?}", err);
                TcpMessage::Response(CallResponse::failure(
                    RpcError::InvalidMessage,
                    clock.snapshot(),
                    None,
                ))
            }
        };
        send_tcp_message(&reply, &mut tx).await?;
    }
    Ok(())
}

/// Runs the responder side of the protocol for one request.
///
/// The clock is merged and incremented before the method runs, also for requests that fail
/// validation, and the resulting snapshot goes into the response.
pub fn handle_request(clock: &NodeClock, request: CallRequest) -> CallResponse {
    let received = clock.receive_request(request.clock.as_ref());
    let report = CausalityReport::new(received.outgoing.clone(), received.incoming);

    let result = request
        .method
        .parse::<Method>()
        .and_then(|method| operations::evaluate(method, request.x.as_ref(), request.y.as_ref()));

    match result {
        Ok(result) => {
            log::debug!("{}({:?}, {:?}) = {}", request.method, request.x, request.y, result);
            CallResponse::success(result, received.outgoing, report)
        }
        Err(err) => {
            log::info!("rejecting `{}` call: {}", request.method, err);
            CallResponse::failure(err, received.outgoing, Some(report))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{CausalityRelation, ClockSnapshot};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Number};

    fn snapshot(entries: &[(&str, u64)]) -> ClockSnapshot {
        entries.iter().map(|&(n, c)| (n, c)).collect()
    }

    fn request(raw: serde_json::Value) -> CallRequest {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn add_merges_then_increments() {
        let clock = NodeClock::new("s".into());
        let response = handle_request(
            &clock,
            request(json!({"method": "add", "x": 2, "y": 3, "clock": {"c": 1}})),
        );
        assert_eq!(response.result, Some(Number::from(5)));
        assert_eq!(response.error, None);
        assert_eq!(response.clock, Some(snapshot(&[("c", 1), ("s", 1)])));
        let report = response.causality.unwrap();
        assert_eq!(report.client_clock, Some(snapshot(&[("c", 1)])));
        assert_eq!(report.relationship, Some(CausalityRelation::HappensAfter));
    }

    #[test]
    fn failed_validation_still_propagates_clock() {
        let clock = NodeClock::new("s".into());
        let response = handle_request(
            &clock,
            request(json!({"method": "multiply", "x": "four", "clock": {"c": 2}})),
        );
        assert_eq!(response.result, None);
        assert_eq!(response.error, Some(RpcError::MissingOperands));
        assert_eq!(response.clock, Some(snapshot(&[("c", 2), ("s", 1)])));

        let response = handle_request(&clock, request(json!({"method": "divide", "x": 1, "y": 2})));
        assert_eq!(response.error, Some(RpcError::UnknownMethod));
        assert_eq!(response.clock, Some(snapshot(&[("c", 2), ("s", 2)])));
    }

    #[test]
    fn malformed_clock_degrades_to_empty() {
        let clock = NodeClock::new("s".into());
        let response = handle_request(
            &clock,
            request(json!({"method": "add", "x": 1, "y": 1, "clock": {"c": -3}})),
        );
        assert_eq!(response.result, Some(Number::from(2)));
        assert_eq!(response.clock, Some(snapshot(&[("s", 1)])));
        let report = response.causality.unwrap();
        assert_eq!(report.client_clock, None);
        assert_eq!(report.relationship, None);
    }
}
