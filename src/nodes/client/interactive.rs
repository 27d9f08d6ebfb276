use super::ClientNode;
use crate::{config::ClientConfig, operations::Method};
use eyre::{anyhow, bail, Context};
use std::io::{BufRead, BufReader, Read, Write};

/// Starts a client node in interactive mode with the supplied config.
///
/// The given `stdin` handle is used for reading user input. This can be a handle to
/// [`std::io::Stdin`] to read from the console or an `&[u8]` slice to run a predefined set
/// of commands (e.g. for testing). The `stdout` handle is used for writing results and
/// `stderr` is used for logging errors.
///
/// Supported commands:
///
/// - **`ADD <x> <y>`** and **`MULTIPLY <x> <y>`** call the server and print the result
///   followed by the local clock after the call.
/// - **`PING`** checks that the server is reachable. Leaves the clock untouched.
/// - **`CLOCK`** prints the local clock.
///
/// All commands can also be written in lowercase. Invalid commands and failed calls only log
/// an error to `stderr`, unless `fail_fast` is set. Then this function exits with an `Err`
/// instead, which is useful for testing.
pub fn run_interactive(
    config: &ClientConfig,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    fail_fast: bool,
) -> eyre::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;
    let client = ClientNode::from_config(config);
    log::info!(
        "[{}] interactive client calling {}",
        client.node_id(),
        config.server
    );

    let print_prompt = |stdout: &mut dyn Write| {
        write!(stdout, "rpc> ").context("failed to write to stdout")?;
        stdout.flush().context("failed to flush stdout")?;
        eyre::Result::<(), eyre::Error>::Ok(())
    };

    print_prompt(stdout)?;

    for line in BufReader::new(stdin).lines() {
        let input = line.context("failed to read line from stdin")?;
        match input.trim() {
            "quit" | "exit" | "q" => break,
            "" => {}
            input => {
                let result = runtime.block_on(handle_command(&client, input, stdout));
                if let Err(err) = result {
                    writeln!(stderr, "Error: {:#}", err)?;
                    if fail_fast {
                        bail!(err);
                    }
                }
            }
        }
        print_prompt(stdout)?;
    }
    Ok(())
}

async fn handle_command(
    client: &ClientNode,
    input: &str,
    stdout: &mut dyn Write,
) -> eyre::Result<()> {
    const HELP: &str = "\n\nValid commands are ADD, MULTIPLY, PING, and CLOCK.";

    let mut split = input.split_whitespace();
    let command = split
        .next()
        .ok_or_else(|| anyhow!("no command entered.{}", HELP))?;
    match command {
        "ADD" | "add" | "MULTIPLY" | "multiply" => {
            let method: Method = command.parse()?;
            let mut operand = |name: &str| -> eyre::Result<f64> {
                let raw = split
                    .next()
                    .ok_or_else(|| anyhow!("{} requires two operands, missing `{}`", method, name))?;
                raw.parse()
                    .with_context(|| format!("`{}` is not a number", raw))
            };
            let x = operand("x")?;
            let y = operand("y")?;
            if split.next().is_some() {
                bail!("{} takes exactly two operands", method);
            }

            let outcome = client.call(method, x, y).await?;
            writeln!(stdout, "{}", outcome.result)?;
            writeln!(stdout, "clock: {}", outcome.completion.clock_after)?;
        }
        "PING" | "ping" => {
            let rtt = client.ping().await?;
            log::info!("[{}] ping round trip took {:?}", client.node_id(), rtt);
            writeln!(stdout, "pong")?;
        }
        "CLOCK" | "clock" => {
            writeln!(stdout, "{}", client.clock())?;
        }
        other => bail!("unknown command `{}`.{}", other, HELP),
    }
    Ok(())
}
