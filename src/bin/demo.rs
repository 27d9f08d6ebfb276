//! Walks through two scripted scenarios and prints how the clocks relate.

use argh::FromArgs;
use causal_rpc::{
    clock::NodeId,
    nodes::{ClientNode, ServerNode},
    protocol::NodeClock,
};
use eyre::Context;
use futures::FutureExt;
use std::{net::SocketAddr, time::Duration};

#[derive(FromArgs)]
/// Vector clock causality demonstration
struct Args {
    /// per-call timeout in milliseconds
    #[argh(option, default = "2000")]
    timeout_ms: u64,
}

fn main() -> eyre::Result<()> {
    if let Err(err) = set_up_logger() {
        eprintln!(
            "{:?}",
            eyre::Error::new(err).wrap_err("failed to set up logger")
        );
    }

    let args: Args = argh::from_env();
    let timeout = Duration::from_millis(args.timeout_ms);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;
    runtime.block_on(rpc_simulation(timeout))?;

    concurrent_events();
    Ok(())
}

async fn rpc_simulation(timeout: Duration) -> eyre::Result<()> {
    println!("=== Vector Clock RPC Simulation ===");

    let server = ServerNode::bind(NodeId::from("server"), "127.0.0.1:0".parse()?).await?;
    let addr: SocketAddr = server.local_addr()?;
    let server_clock = server.clock();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run(shutdown_rx.map(|_| ()).fuse()));

    let client_a = ClientNode::new("clientA".into(), addr, timeout);
    let client_b = ClientNode::new("clientB".into(), addr, timeout);

    println!("Initial clocks:");
    println!("  Server: {}", server_clock.snapshot());
    println!("  Client A: {}", client_a.clock());
    println!("  Client B: {}", client_b.clock());

    println!("\n--- Client A calls add(2, 3) ---");
    let outcome = client_a.add(2.0, 3.0).await?;
    println!("Client A clock before request: {}", outcome.completion.sent);
    println!("Server clock after receiving A's request: {}", server_clock.snapshot());
    println!("Client A clock after response: {}", outcome.completion.clock_after);
    println!("Result: add(2, 3) = {}", outcome.result);

    println!("\n--- Client B calls multiply(4, 5) ---");
    let outcome = client_b.multiply(4.0, 5.0).await?;
    println!("Client B clock before request: {}", outcome.completion.sent);
    println!("Server clock after receiving B's request: {}", server_clock.snapshot());
    println!("Client B clock after response: {}", outcome.completion.clock_after);
    println!("Result: multiply(4, 5) = {}", outcome.result);

    println!("\n--- Causality Analysis ---");
    let (a, b, s) = (client_a.clock(), client_b.clock(), server_clock.snapshot());
    println!("Client A final clock: {}", a);
    println!("Client B final clock: {}", b);
    println!("Server final clock: {}", s);
    println!("\nClock relationships:");
    println!("  Client A vs Client B: {}", a.compare(&b));
    println!("  Client A vs Server: {}", a.compare(&s));
    println!("  Client B vs Server: {}", b.compare(&s));

    println!("\n--- Demonstrating Happens-Before ---");
    println!("Client A makes another request...");
    let outcome = client_a.add(1.0, 1.0).await?;
    println!("Client A clock: {}", outcome.completion.sent);
    println!("Server clock: {}", server_clock.snapshot());
    println!("Client A clock after update: {}", outcome.completion.clock_after);
    println!(
        "Final A vs B relationship: {}",
        client_a.clock().compare(&client_b.clock())
    );

    // the receiver only resolves once, a failed send means the server already stopped
    let _ = shutdown_tx.send(());
    server_task.await.context("server task panicked")?
}

fn concurrent_events() {
    println!("\n=== Concurrent Events Demonstration ===");

    let client_x = NodeClock::new("clientX".into());
    let client_y = NodeClock::new("clientY".into());
    let relation = |x: &NodeClock, y: &NodeClock| x.snapshot().compare(&y.snapshot());

    println!("Initial clocks:");
    println!("  Client X: {}", client_x.snapshot());
    println!("  Client Y: {}", client_y.snapshot());
    println!("  Relationship: {}", relation(&client_x, &client_y));

    println!("\nBoth clients make independent operations...");
    client_x.increment();
    client_y.increment();
    println!("After independent operations:");
    println!("  Client X: {}", client_x.snapshot());
    println!("  Client Y: {}", client_y.snapshot());
    println!("  Relationship: {}", relation(&client_x, &client_y));

    println!("\nClient X shares its clock with Client Y...");
    client_y.merge(&client_x.snapshot());
    println!("After information exchange:");
    println!("  Client X: {}", client_x.snapshot());
    println!("  Client Y: {}", client_y.snapshot());
    println!("  Relationship: {}", relation(&client_x, &client_y));
}

fn set_up_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(fern::log_file("demo.log")?)
        .apply()?;
    Ok(())
}
