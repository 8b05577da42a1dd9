//! RJE Station - Operator Console
//!
//! Connects to a protocol engine, relays host output to timestamped spool
//! files and accepts card decks from the operator.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (localhost:2553, ./spool)
//! rje-station
//!
//! # With config file
//! rje-station /etc/rje/station.toml
//!
//! # Override the engine endpoint
//! rje-station --host mvs.example.org --port 3780
//!
//! # Verbose logging (stderr)
//! RUST_LOG=debug rje-station
//! ```
//!
//! # Commands
//!
//! - `load_cards <path>` / `lc <path>`: submit a deck on the configured reader
//! - `exit` / `quit`: close open spool files and leave

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rje_station_core::{
    load_config, load_required_config, ConfigOverrides, OperatorCommand, OperatorNotice,
    RemoteEngine, Station, StationConfig,
};

const PROMPT: &str = "Operator> ";

/// RJE Station - remote job entry operator console
#[derive(Parser, Debug)]
#[command(name = "rje-station")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (must exist when given)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Protocol engine host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Protocol engine port
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Directory receiving spool files
    #[arg(short = 's', long, value_name = "DIR")]
    spool_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "RJE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout belongs to the operator.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("rje_station={level},rje_station_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration and apply command-line overrides
fn resolve_config(args: &Args) -> Result<StationConfig> {
    let mut config = match args.config {
        Some(ref path) => load_required_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_config().context("Failed to load configuration")?,
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(ref host) = args.host {
        overrides = overrides.with_host(host.clone());
    }
    if let Some(port) = args.port {
        overrides = overrides.with_port(port);
    }
    if let Some(ref dir) = args.spool_dir {
        overrides = overrides.with_spool_dir(dir.clone());
    }
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Read operator lines on a dedicated thread
///
/// Dropping the sender at end of input tells the station the console is gone.
fn spawn_console_reader(tx: mpsc::Sender<OperatorCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("operator-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(OperatorCommand::parse(&line)).is_err() {
                    break;
                }
            }
            debug!("Operator console input ended");
        })
        .context("Failed to start console reader")?;
    Ok(())
}

/// Render notices on stdout, prompting once the host is connected
async fn print_notices(mut notices: mpsc::Receiver<OperatorNotice>) -> std::io::Result<()> {
    let mut out = tokio::io::stdout();
    let mut prompting = false;

    while let Some(notice) = notices.recv().await {
        match notice {
            OperatorNotice::Connected { .. } => prompting = true,
            OperatorNotice::Exiting => prompting = false,
            _ => {}
        }

        let mut text = format!("{notice}\n");
        if prompting {
            text.push_str(PROMPT);
        }
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}

/// Completes on Ctrl+C; never completes if the handler cannot be installed
async fn interrupted() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(
        host = %config.host,
        port = config.port,
        spool_dir = ?config.spool_dir,
        source = %config.source(),
        "RJE station starting"
    );

    tokio::fs::create_dir_all(&config.spool_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create spool directory {}",
                config.spool_dir.display()
            )
        })?;

    let (notice_tx, notice_rx) = mpsc::channel(config.event_capacity);
    let printer = tokio::spawn(print_notices(notice_rx));
    let _ = notice_tx.send(OperatorNotice::Starting).await;

    let (engine, events) =
        RemoteEngine::connect(&config.host, config.port, config.event_capacity)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to protocol engine at {}:{}",
                    config.host, config.port
                )
            })?;

    let (command_tx, commands) = mpsc::channel(config.event_capacity);
    spawn_console_reader(command_tx)?;

    let mut station = Station::new(&config, Arc::new(engine), notice_tx.clone())?;
    let outcome = station.run_until(events, commands, interrupted()).await;
    drop(station);

    let _ = notice_tx.send(OperatorNotice::Exiting).await;
    drop(notice_tx);
    match printer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Console output failed"),
        Err(e) => warn!(error = %e, "Console printer task failed"),
    }

    let reason = outcome.context("Station stopped on a fatal error")?;
    info!(reason = ?reason, "RJE station stopped");
    Ok(())
}
