#![forbid(unsafe_code)]

//! `juggler` — interactive manager for concurrent netcat listener sessions.
//!
//! Runs the operator REPL: each input line maps onto one registry
//! operation. The loop terminates on `stop` or Ctrl-C/SIGTERM, and both
//! paths run `stop_all` before exit so no listener process leaks.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use juggler::command::Command;
use juggler::session::SessionRegistry;
use juggler::{AppError, GlobalConfig, Result};

const BANNER: &[&str] = &[
    r".------..------..------..------..------..------..------.",
    r"|J.--. ||U.--. ||G.--. ||G.--. ||L.--. ||E.--. ||R.--. |",
    r"| :(): || (\/) || :/\: || :/\: || :/\: || (\/) || :(): |",
    r"| ()() || :\/: || :\/: || :\/: || (__) || :\/: || ()() |",
    r"| '--'J|| '--'U|| '--'G|| '--'G|| '--'L|| '--'E|| '--'R|",
    r"`------'`------'`------'`------'`------'`------'`------'",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "juggler",
    about = "Interactive manager for concurrent netcat listener sessions",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = match args.config {
        Some(path) => GlobalConfig::load(&path)?,
        None => GlobalConfig::default(),
    };
    let mut registry = SessionRegistry::new(Arc::new(config));

    for line in BANNER {
        println!("{}", line.red());
    }
    println!("{}", "\nBy DownwithmyDaemons".red());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        surface_pending(&registry).await;

        if let Some(port) = registry.selected() {
            println!("{}", format!("\n[Port {port}]").red());
        }
        print!("{}", "Enter command: ".green());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            () = &mut shutdown => {
                println!();
                info!("interrupt received, stopping all listeners");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "failed to read operator input");
                    break;
                }
            },
        };

        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(Command::Stop) => break,
            Ok(Command::Help) => print_help(),
            Ok(command) => dispatch(command, &mut registry).await,
            Err(err) => println!("{}", err.to_string().red()),
        }
    }

    registry.stop_all().await;
    Ok(())
}

/// Execute one parsed operator command against the registry.
///
/// Every failure is reported and skipped; the registry stays usable.
async fn dispatch(command: Command, registry: &mut SessionRegistry) {
    match command {
        Command::Add(port) => match registry.add(port).await {
            Ok(()) => println!("Listener started on port {port}."),
            Err(err) => println!("{}", err.to_string().red()),
        },
        Command::Remove(port) => match registry.remove(port).await {
            Ok(()) => println!("Listener on port {port} removed."),
            Err(err) => println!("{}", err.to_string().red()),
        },
        Command::List => {
            let ports = registry.list();
            if ports.is_empty() {
                println!("No active connections.");
            } else {
                let ports = ports
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("Active connections: {ports}");
            }
        }
        Command::Select(port) => match registry.select(port) {
            Ok(()) => println!("Selected connection on port {port}."),
            Err(err) => println!("{}", err.to_string().red()),
        },
        Command::Send(text) => {
            let selected = registry.selected();
            match registry.send_command(&text).await {
                // send_command only succeeds with a selection in place.
                Ok(response) => {
                    if let Some(port) = selected {
                        println!("Sent to port {port}:\n{text}");
                        if response.is_empty() {
                            println!("(no response within the window; it will show up later if the peer answers)");
                        } else {
                            println!("Received from port {port}:\n{response}");
                        }
                    }
                }
                Err(AppError::NoSelection) => {
                    println!(
                        "{}",
                        "No connection selected. Use 'select <port>' to select a connection.".red()
                    );
                }
                Err(err) => println!("{}", err.to_string().red()),
            }
        }
        // Handled by the caller before dispatch.
        Command::Stop | Command::Help => {}
    }
}

/// Print whatever the selected session has produced since the last prompt.
async fn surface_pending(registry: &SessionRegistry) {
    if let Some((port, diags)) = registry.drain_selected_stderr().await {
        for line in diags {
            eprintln!("{}", format!("[port {port}] {line}").yellow());
        }
    }
    if let Some((port, output)) = registry.drain_selected().await {
        println!("\nReceived from port {port}:\n{output}");
    }
}

fn print_help() {
    let help = [
        "\nAvailable commands:",
        "1. add <port> - Add a new netcat listener on the specified port.",
        "2. remove <port> - Remove the netcat listener on the specified port.",
        "3. list - List all active connections.",
        "4. select <port> - Select a connection to interact with.",
        "5. send <command> - Send a command to the selected connection.",
        "6. stop - Stop all connections and exit.",
        "7. help - Display this help message.",
    ];
    for line in help {
        println!("{}", line.yellow());
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    // Quiet by default: the REPL owns stdout, diagnostics go to stderr and
    // are opted into via RUST_LOG.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
