//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Transport;

/// Calcagent - arithmetic worker agent
#[derive(Parser)]
#[command(
    name = "ag",
    about = "Pulls arithmetic tasks from the orchestrator, computes them and submits results",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/calcagent/logs/ag.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the worker pool until SIGINT/SIGTERM
    Run {
        /// Number of workers (overrides computing-power)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Transport to the orchestrator (http or rpc)
        #[arg(short, long)]
        transport: Option<Transport>,

        /// Orchestrator base URL (overrides http-url)
        #[arg(long)]
        url: Option<String>,

        /// Orchestrator RPC address (overrides rpc-addr)
        #[arg(long)]
        rpc_addr: Option<String>,
    },
}
