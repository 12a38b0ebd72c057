//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Orchestrator - distributed arithmetic expression coordinator
#[derive(Parser)]
#[command(
    name = "oc",
    about = "Decomposes arithmetic expressions into tasks and reconciles worker results",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/orchestrator/logs/oc.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Orchestrator base URL for client commands
    #[arg(long, global = true, help = "Orchestrator base URL (overrides client.url)")]
    pub url: Option<String>,

    /// Bearer token for client commands
    #[arg(long, global = true, help = "Bearer token (overrides client.token)")]
    pub token: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the orchestrator (HTTP + RPC + stale-task sweep) in the foreground
    Serve,

    /// Submit an expression for evaluation
    Submit {
        /// Expression text, e.g. "2 + 3"
        #[arg(value_name = "EXPR")]
        expression: String,

        /// Poll until the expression is completed or failed
        #[arg(short, long)]
        wait: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one expression
    Get {
        /// Expression id
        id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List expressions owned by the caller
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show coordinator metrics
    Metrics {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for client commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orchestrator")
        .join("logs")
        .join("oc.log")
}
