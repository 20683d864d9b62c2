//! presence-agent: registers with a presence server and keeps the
//! registration alive until the process exits.

use anyhow::Result;
use clap::Parser;
use presence_registry::agent::{
    AgentConfig, DEFAULT_RENEW_INTERVAL_SECS, DEFAULT_SERVER, HeartbeatAgent,
};

#[derive(Parser)]
#[command(name = "presence-agent")]
#[command(about = "Heartbeat agent for the presence registry")]
#[command(version)]
struct Cli {
    /// Base URL of the presence server
    #[arg(long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Seconds between keep-alive calls (must be positive)
    #[arg(long, default_value_t = DEFAULT_RENEW_INTERVAL_SECS)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let agent = HeartbeatAgent::new(AgentConfig {
        server: cli.server,
        renew_interval_secs: cli.interval,
    })?;
    agent.run().await?;

    Ok(())
}
