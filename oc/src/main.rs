//! Orchestrator - distributed arithmetic expression coordinator
//!
//! CLI entry point for running the service and talking to it.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use orchestrator::cli::{Cli, Command, OutputFormat};
use orchestrator::config::Config;
use orchestrator::domain::{Expression, ExpressionStatus};
use orchestrator::server::Server;
use orchestrator::transport::ApiClient;

/// Delay between polls of `submit --wait`
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orchestrator")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("oc.log")).context("Failed to create log file")?;

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
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env().context("Failed to apply environment overrides")?;

    info!(
        "Orchestrator loaded config: http={}, rpc={}, queue-capacity={}",
        config.server.http_addr, config.server.rpc_addr, config.coordinator.queue_capacity
    );

    // Dispatch command
    match cli.command {
        Some(Command::Serve) => cmd_serve(&config).await,
        Some(Command::Submit {
            expression,
            wait,
            format,
        }) => {
            let client = api_client(&config, cli.url, cli.token)?;
            cmd_submit(&client, &expression, wait, format).await
        }
        Some(Command::Get { id, format }) => {
            let client = api_client(&config, cli.url, cli.token)?;
            cmd_get(&client, &id, format).await
        }
        Some(Command::List { format }) => {
            let client = api_client(&config, cli.url, cli.token)?;
            cmd_list(&client, format).await
        }
        Some(Command::Metrics { format }) => {
            let client = api_client(&config, cli.url, cli.token)?;
            cmd_metrics(&client, format).await
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Build an API client from CLI flags falling back to `client.*` config
fn api_client(config: &Config, url: Option<String>, token: Option<String>) -> Result<ApiClient> {
    let url = url.unwrap_or_else(|| config.client.url.clone());
    let mut client = ApiClient::new(&url).context(format!("Failed to create client for {}", url))?;
    if let Some(token) = token.or_else(|| config.client.token.clone()) {
        client = client.with_token(token);
    }
    Ok(client)
}

fn colored_status(status: ExpressionStatus) -> String {
    let text = status.to_string();
    match status {
        ExpressionStatus::Pending => text.yellow().to_string(),
        ExpressionStatus::Processing => text.cyan().to_string(),
        ExpressionStatus::Completed => text.green().to_string(),
        ExpressionStatus::Failed => text.red().to_string(),
    }
}

fn print_expression(expression: &Expression) {
    println!("{} {}", "Expression".bold(), expression.id);
    println!("  Text:   {}", expression.expression);
    println!("  Status: {}", colored_status(expression.status));
    if let Some(result) = expression.result {
        println!("  Result: {}", result);
    }
    if let Some(error) = &expression.error {
        println!("  Error:  {}", error.red());
    }
}

/// Run the service until SIGINT/SIGTERM
async fn cmd_serve(config: &Config) -> Result<()> {
    info!("Orchestrator starting...");

    let server = Server::bind(config).await?;
    println!(
        "Orchestrator listening: http={} rpc={}",
        server.http_addr()?,
        server.rpc_addr()?
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_handle = tokio::spawn(server.run(shutdown_rx));

    info!("Orchestrator running. Press Ctrl+C to stop.");

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

    info!("Orchestrator shutting down...");
    let _ = shutdown_tx.send(true);

    server_handle.await.context("Server task panicked")??;
    Ok(())
}

/// Submit an expression, optionally waiting for its outcome
async fn cmd_submit(client: &ApiClient, expression: &str, wait: bool, format: OutputFormat) -> Result<()> {
    let id = client.submit(expression).await.context("Failed to submit expression")?;

    if !wait {
        match format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "id": id })),
            OutputFormat::Text => println!("{} Submitted: {}", "✓".green(), id.cyan()),
        }
        return Ok(());
    }

    let expression = loop {
        let expression = client.get_expression(&id).await.context("Failed to poll expression")?;
        if expression.is_terminal() {
            break expression;
        }
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&expression)?),
        OutputFormat::Text => print_expression(&expression),
    }
    Ok(())
}

/// Show one expression
async fn cmd_get(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let expression = client.get_expression(id).await.context("Failed to fetch expression")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&expression)?),
        OutputFormat::Text => print_expression(&expression),
    }
    Ok(())
}

/// List the caller's expressions
async fn cmd_list(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let expressions = client.list_expressions().await.context("Failed to list expressions")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&expressions)?),
        OutputFormat::Text => {
            if expressions.is_empty() {
                println!("No expressions found.");
                return Ok(());
            }
            for expression in &expressions {
                let outcome = match (expression.result, &expression.error) {
                    (Some(result), _) => result.to_string(),
                    (None, Some(error)) => error.clone(),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "{}  {:<10}  {:<24}  {}",
                    expression.id,
                    colored_status(expression.status),
                    expression.expression,
                    outcome
                );
            }
        }
    }
    Ok(())
}

/// Show coordinator counters
async fn cmd_metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let metrics = client.metrics().await.context("Failed to fetch metrics")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        OutputFormat::Text => {
            println!("Orchestrator Metrics");
            println!("--------------------");
            println!(
                "Queue: {}/{} (peak {})",
                metrics.tasks_queued, metrics.queue_capacity, metrics.queue_peak_depth
            );
            println!("Tasks issued: {}", metrics.tasks_issued);
            println!("  Unresolved: {}", metrics.tasks_unresolved);
            println!("  Resolved:   {}", metrics.tasks_resolved);
            println!("  Failed:     {}", metrics.tasks_failed);
            println!("  Expired:    {}", metrics.tasks_expired);
            println!("  Pruned:     {}", metrics.tasks_pruned);
            println!();
            println!("Expressions submitted: {}", metrics.expressions_submitted);
            println!("  Completed: {}", metrics.expressions_completed);
            println!("  Failed:    {}", metrics.expressions_failed);
            println!("  Rejected:  {}", metrics.submissions_rejected);
        }
    }
    Ok(())
}
