//! esgridd — the esgrid operator binary.
//!
//! Works directly on the scheduler's state store:
//! - Framework identity (show / set)
//! - Node directory of the running search nodes
//! - Dry-run offer evaluation against a task list
//!
//! # Usage
//!
//! ```text
//! esgridd --config /etc/esgrid/esgrid.toml identity show
//! esgridd evaluate --offer offer.json --tasks tasks.json
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use esgrid_core::SchedulerConfig;
use tracing::debug;

#[derive(Parser)]
#[command(name = "esgridd", about = "esgrid operator CLI for scheduler state")]
struct Cli {
    /// Scheduler config file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the state data directory from the config.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or change the persisted framework id.
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// List the client addresses of the running search nodes.
    Nodes {
        /// Pick one node the way a query would be routed.
        #[arg(long)]
        select: bool,

        /// Route to this `host:port` instead of a random node.
        #[arg(long, requires = "select")]
        host: Option<String>,
    },

    /// Evaluate an offer against a task list without touching any state.
    Evaluate {
        /// Offer as JSON.
        #[arg(long)]
        offer: PathBuf,

        /// Current tasks as a JSON array. Empty cluster when omitted.
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Print the stored framework id.
    Show,
    /// Store a framework id.
    Set { id: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,esgridd=debug,esgrid_scheduler=debug,esgrid_state=debug",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)?,
        None => SchedulerConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.state.data_dir = data_dir;
    }
    debug!(framework = %config.framework.name, data_dir = ?config.state.data_dir, "config loaded");

    let output = match cli.command {
        Command::Identity { action } => match action {
            IdentityAction::Show => commands::identity_show(&config)?,
            IdentityAction::Set { id } => commands::identity_set(&config, &id)?,
        },
        Command::Nodes { select, host } => {
            if select {
                commands::nodes_select(&config, host.as_deref())?
            } else {
                commands::nodes_list(&config)?
            }
        }
        Command::Evaluate { offer, tasks } => {
            commands::evaluate(config, &offer, tasks.as_deref())?
        }
    };
    println!("{output}");
    Ok(())
}
