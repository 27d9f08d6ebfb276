use causal_rpc::{
    clock::NodeId,
    config::ClientConfig,
    nodes::{client, ServerNode},
};
use eyre::Context;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use std::{io::Cursor, net::SocketAddr, sync::mpsc, thread};

/// Starts a server in a background thread with its own runtime and returns its address.
fn spawn_server(node_id: &'static str) -> SocketAddr {
    let (addr_tx, addr_rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime
            .block_on(async {
                let server = ServerNode::bind(NodeId::from(node_id), "127.0.0.1:0".parse()?)
                    .await?;
                addr_tx.send(server.local_addr()?)?;
                server.run(futures::future::pending().fuse()).await
            })
            .context("Server task failed")
            .unwrap()
    });
    addr_rx.recv().unwrap()
}

fn client_config(server: SocketAddr) -> ClientConfig {
    ClientConfig {
        node_id: Some("client1".into()),
        server,
        timeout_ms: 5000,
    }
}

#[test]
fn add_multiply_clock() {
    let _ = set_up_logger();
    let config = client_config(spawn_server("s"));

    let input = "\
        CLOCK\n\
        add 2 3\n\
        MULTIPLY 4 5\n\
        add 0.5 0.25\n\
        PING\n\
        clock\n\
    ";
    let mut stdin = input.as_bytes();
    let mut stdout = Cursor::new(Vec::new());
    let mut stderr = Cursor::new(Vec::new());

    client::run_interactive(&config, &mut stdin, &mut stdout, &mut stderr, true).unwrap();
    assert_eq!(String::from_utf8(stderr.into_inner()).unwrap(), "");
    assert_eq!(
        String::from_utf8(stdout.into_inner())
            .unwrap()
            .lines()
            .collect::<Vec<_>>(),
        "rpc> {client1: 0}\n\
        rpc> 5\n\
        clock: {client1: 1, s: 1}\n\
        rpc> 20\n\
        clock: {client1: 2, s: 2}\n\
        rpc> 0.75\n\
        clock: {client1: 3, s: 3}\n\
        rpc> pong\n\
        rpc> {client1: 3, s: 3}\n\
        rpc> "
            .lines()
            .collect::<Vec<_>>()
    );
}

#[test]
fn invalid_commands_are_reported() {
    let _ = set_up_logger();
    let config = client_config(spawn_server("s"));

    let input = "\
        divide 1 2\n\
        add 1\n\
        multiply 1e308 10\n\
        CLOCK\n\
        quit\n\
        add 1 1\n\
    ";
    let mut stdin = input.as_bytes();
    let mut stdout = Cursor::new(Vec::new());
    let mut stderr = Cursor::new(Vec::new());

    client::run_interactive(&config, &mut stdin, &mut stdout, &mut stderr, false).unwrap();
    assert_eq!(
        String::from_utf8(stderr.into_inner())
            .unwrap()
            .lines()
            .collect::<Vec<_>>(),
        vec![
            "Error: unknown command `divide`.",
            "",
            "Valid commands are ADD, MULTIPLY, PING, and CLOCK.",
            "Error: add requires two operands, missing `y`",
            "Error: Request rejected by server: Result is not a finite number",
        ]
    );
    // the rejected call still merged the server clock; `quit` stops before the last line
    assert_eq!(
        String::from_utf8(stdout.into_inner())
            .unwrap()
            .lines()
            .collect::<Vec<_>>(),
        vec!["rpc> rpc> rpc> rpc> {client1: 1, s: 1}", "rpc> "]
    );
}

#[test]
fn fail_fast_stops_on_first_error() {
    let config = client_config(spawn_server("s"));

    let mut stdin = "add x 1\nadd 1 1\n".as_bytes();
    let mut stdout = Cursor::new(Vec::new());
    let mut stderr = Cursor::new(Vec::new());

    let result = client::run_interactive(&config, &mut stdin, &mut stdout, &mut stderr, true);
    assert!(result.is_err());
    assert_eq!(
        String::from_utf8(stdout.into_inner()).unwrap(),
        "rpc> ".to_owned()
    );
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
        .apply()?;
    Ok(())
}
