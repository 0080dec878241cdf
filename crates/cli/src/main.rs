//! delaysqs CLI
//!
//! Schedule payloads for delayed delivery over Amazon SQS and run the poll
//! loop that delivers them.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use delaysqs_aws::SqsQueue;
use delaysqs_delayer::Delayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::commands::poll::StdoutDelivery;
use crate::config::FileConfig;

/// delaysqs: deliver payloads at arbitrary future times over SQS.
#[derive(Parser, Debug)]
#[command(name = "delaysqs", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "delaysqs.toml", global = true)]
    config: PathBuf,

    /// Queue URL (overrides the config file).
    #[arg(long, env = "DELAYSQS_QUEUE_URL", global = true)]
    queue_url: Option<String>,

    /// AWS region (overrides the config file).
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule a payload for delivery.
    Enqueue(commands::enqueue::EnqueueArgs),
    /// Deliver due payloads to stdout until interrupted.
    Poll,
    /// Check that the queue is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = FileConfig::load(&cli.config)?.with_overrides(cli.queue_url, cli.region);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(file.log_level.as_deref().unwrap_or("info"))
    });
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    let queue = SqsQueue::new(file.queue).await?;
    if let Command::Health = cli.command {
        return commands::health::run(&queue).await;
    }

    let delayer = Delayer::builder()
        .queue(Arc::new(queue))
        .delivery_handler(StdoutDelivery)
        .config(file.delayer)
        .build()?;

    match cli.command {
        Command::Enqueue(args) => commands::enqueue::run(&delayer, &args).await,
        Command::Poll => commands::poll::run(&delayer).await,
        Command::Health => Ok(()),
    }
}
