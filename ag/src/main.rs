//! Calcagent - arithmetic worker agent
//!
//! CLI entry point for running a worker pool against an orchestrator.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use calcagent::cli::{Cli, Command};
use calcagent::config::AgentConfig;
use calcagent::pool::WorkerPool;
use calcagent::source::create_source;
use calcagent::worker::WorkerConfig;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calcagent")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("ag.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    // Load configuration
    let mut config = AgentConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env().context("Failed to apply environment overrides")?;

    // Dispatch command
    match cli.command {
        Some(Command::Run {
            workers,
            transport,
            url,
            rpc_addr,
        }) => {
            if let Some(workers) = workers {
                config.computing_power = workers;
            }
            if let Some(transport) = transport {
                config.transport = transport;
            }
            if let Some(url) = url {
                config.http_url = url;
            }
            if let Some(rpc_addr) = rpc_addr {
                config.rpc_addr = rpc_addr;
            }
            cmd_run(&config).await
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Run the worker pool until SIGINT/SIGTERM
async fn cmd_run(config: &AgentConfig) -> Result<()> {
    config.validate()?;

    info!(
        "Calcagent starting: transport={}, workers={}, http-url={}, rpc-addr={}",
        config.transport, config.computing_power, config.http_url, config.rpc_addr
    );

    let pool = WorkerPool::new(config.computing_power, WorkerConfig::from(config), |_| create_source(config))
        .context("Failed to create task sources")?;
    println!(
        "Calcagent running {} workers over {} (Ctrl+C to stop)",
        pool.len(),
        config.transport
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let pool_handle = tokio::spawn(pool.run(stop_rx));

    // Set up signal handlers
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        // On non-Unix, just wait for Ctrl+C
        tokio::signal::ctrl_c().await?;
    }

    info!("Calcagent shutting down...");
    let _ = stop_tx.send(true);

    let stats = pool_handle.await.context("Worker pool panicked")?;
    println!(
        "Completed {} tasks, failed {}, dropped {}",
        stats.tasks_completed, stats.tasks_failed, stats.submissions_dropped
    );
    Ok(())
}
