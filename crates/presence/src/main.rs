//! presenced: the presence registry server.
//!
//! Serves the heartbeat API, sweeps stale registrations in the background,
//! and reads operator commands from stdin.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use presence_registry::access_log::spawn_writer;
use presence_registry::registry::{ClientStore, ReaperConfig, run_reaper, start_server};
use presence_registry::shell::run_shell;
use tokio::sync::watch;
use tracing::info;

/// Command-line arguments for the server binary.
#[derive(Debug)]
struct Args {
    /// HTTP listen port
    port: u16,
    /// Seconds a registration may go unrenewed before eviction
    ttl_secs: u64,
    /// Seconds between reaper sweeps
    sweep_interval_secs: u64,
    /// Path of the request log
    access_log: PathBuf,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            port: 8000,
            ttl_secs: 120,
            sweep_interval_secs: 30,
            access_log: PathBuf::from("access.log"),
        }
    }
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut argv = std::env::args().skip(1);

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--port" => {
                if let Some(port) = argv.next() {
                    if let Ok(p) = port.parse() {
                        args.port = p;
                    }
                }
            }
            "--ttl" => {
                if let Some(ttl) = argv.next() {
                    if let Ok(t) = ttl.parse() {
                        args.ttl_secs = t;
                    }
                }
            }
            "--sweep-interval" => {
                if let Some(interval) = argv.next() {
                    if let Ok(i) = interval.parse() {
                        args.sweep_interval_secs = i;
                    }
                }
            }
            "--access-log" => {
                if let Some(path) = argv.next() {
                    args.access_log = PathBuf::from(path);
                }
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
    }

    args
}

fn print_help() {
    println!(
        r#"
presenced - liveness-tracking presence registry

Clients fetch an identity from /get-id and keep it alive via
/keep-alive/<identity>; registrations that stop renewing are evicted.

USAGE:
    presenced [OPTIONS]

OPTIONS:
    --port <PORT>            HTTP listen port [default: 8000]
    --ttl <SECS>             Seconds without renewal before eviction [default: 120]
    --sweep-interval <SECS>  Seconds between eviction sweeps [default: 30]
    --access-log <PATH>      Request log path [default: access.log]
    -h, --help               Print this help message

OPERATOR COMMANDS (on stdin):
    clients list             List live registrations
    client <identity> remove Drop one registration

EXAMPLES:
    # Run with the reference timings
    presenced

    # Faster eviction for local experiments
    presenced --port 8080 --ttl 10 --sweep-interval 2
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    tracing_subscriber::fmt::init();

    let store = Arc::new(ClientStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (access_log, log_writer) = spawn_writer(args.access_log.clone());

    let reaper = tokio::spawn(run_reaper(
        Arc::clone(&store),
        ReaperConfig {
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            staleness_threshold: Duration::from_secs(args.ttl_secs),
        },
        shutdown_rx.clone(),
    ));
    let shell = tokio::spawn(run_shell(Arc::clone(&store), shutdown_rx.clone()));

    let bind_addr: SocketAddr = ([0, 0, 0, 0], args.port).into();
    let (addr, server) = start_server(store, access_log, bind_addr, shutdown_rx)?;
    info!(%addr, ttl_secs = args.ttl_secs, "presence registry listening");
    let server = tokio::spawn(server);

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    server.await?;
    reaper.await?;
    shell.await?;
    log_writer.await?;

    Ok(())
}
