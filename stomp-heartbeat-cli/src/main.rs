//! CLI entry point for stomp-heartbeat

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stomp_heartbeat_core::config::{Config, ConfigLoader};
use stomp_heartbeat_core::heartbeat::{duration_millis, negotiate, HeartbeatPlan, Negotiation};
use stomp_heartbeat_core::logging::init_logging;
use stomp_heartbeat_core::wire::DEFAULT_WIRE_QUEUE;
use stomp_heartbeat_core::{Negotiator, WireWriter};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "stomp-heartbeat")]
#[command(about = "Negotiate and exercise STOMP heart-beats")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate a client and server heart-beat header pair
    Negotiate {
        /// Client heart-beat header (defaults to the configured value)
        #[arg(long)]
        client: Option<String>,
        /// Server heart-beat header, omit for a server that sent none
        #[arg(long)]
        server: Option<String>,
    },
    /// Run both monitors against an in-memory peer
    Simulate {
        /// Server heart-beat header
        #[arg(long)]
        server: String,
        /// Client heart-beat header (defaults to the configured value)
        #[arg(long)]
        client: Option<String>,
        /// How long to run
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Peer never sends anything back
        #[arg(long)]
        silent_peer: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader
        .load()
        .with_context(|| format!("loading config from {}", config_loader.config_dir().display()))?;

    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Negotiate { client, server } => {
            let client = client.unwrap_or_else(|| config.heartbeat.client_heart_beat.clone());
            run_negotiate(&client, server.as_deref())?;
        }
        Commands::Simulate {
            server,
            client,
            seconds,
            silent_peer,
        } => {
            let client = client.unwrap_or_else(|| config.heartbeat.client_heart_beat.clone());
            run_simulate(&config, &client, &server, seconds, silent_peer).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn millis(interval: Option<Duration>) -> Option<u64> {
    interval.map(duration_millis)
}

fn plan_json(plan: &HeartbeatPlan) -> serde_json::Value {
    serde_json::json!({
        "outcome": "enabled",
        "client": plan.client.to_string(),
        "server": plan.server.to_string(),
        "send_interval_ms": millis(plan.send_interval),
        "receive_interval_ms": millis(plan.receive_interval),
    })
}

fn run_negotiate(client: &str, server: Option<&str>) -> Result<()> {
    let outcome = match negotiate(Some(client), server)? {
        Negotiation::Disabled => serde_json::json!({ "outcome": "disabled" }),
        Negotiation::Enabled(plan) => plan_json(&plan),
    };
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_simulate(
    config: &Config,
    client: &str,
    server: &str,
    seconds: u64,
    silent_peer: bool,
) -> Result<()> {
    let (client_io, peer_io) = tokio::io::duplex(4096);
    let (mut client_read, client_write) = tokio::io::split(client_io);
    let (mut peer_read, mut peer_write) = tokio::io::split(peer_io);

    let connection = CancellationToken::new();
    let (writer, writer_task) = WireWriter::spawn(client_write, DEFAULT_WIRE_QUEUE);

    let Some(heartbeat) = Negotiator::from_config(&config.heartbeat)?.start(
        Some(client),
        Some(server),
        Arc::new(writer),
        connection.clone(),
    )?
    else {
        println!("{}", serde_json::json!({ "outcome": "disabled" }));
        return Ok(());
    };
    info!(client, server, seconds, silent_peer, "Simulation started");

    let state = heartbeat.state();
    let reader_shutdown = connection.clone();
    let reader = tokio::spawn(async move {
        let mut buf = [0u8; 256];
        loop {
            tokio::select! {
                _ = reader_shutdown.cancelled() => break,
                read = client_read.read(&mut buf) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => state.mark_received(),
                },
            }
        }
    });

    // The peer drains our heart-beats and answers at half the checked interval
    let mut answer_ticker = heartbeat
        .plan()
        .receive_interval
        .map(|interval| interval / 2)
        .filter(|period| !silent_peer && !period.is_zero())
        .map(tokio::time::interval);
    let peer_shutdown = connection.clone();
    let peer = tokio::spawn(async move {
        let mut buf = [0u8; 256];
        loop {
            let answer = async {
                match answer_ticker.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = peer_shutdown.cancelled() => break,
                read = peer_read.read(&mut buf) => {
                    if matches!(read, Ok(0) | Err(_)) {
                        break;
                    }
                }
                _ = answer => {
                    if peer_write.write_all(b"\n").await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(seconds)).await;
    if heartbeat.send_failed() || heartbeat.receive_failed() {
        warn!("Simulated connection looks unhealthy");
    }

    connection.cancel();
    let state = heartbeat.join().await;
    for task in [reader, peer, writer_task] {
        task.await.context("simulation task panicked")?;
    }

    println!("{}", serde_json::to_string_pretty(&state.status())?);
    Ok(())
}
