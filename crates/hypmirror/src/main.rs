use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hypmirror::config::DEFAULT_CONFIG_PATH;
use hypmirror::{AppConfig, CatalogueSource, HypClient, Orchestrator, StatusPublisher, Task};
use hypmirror_storage::StorageBackend;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "hypmirror", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    /// Path of the JSON config file.
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single sync and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;

    let storage = StorageBackend::from_config(&config.storage).context("initialising storage")?;

    let mut tasks = Vec::with_capacity(config.tasks.len());
    for task in &config.tasks {
        let launcher = task.launcher.launcher()?;
        let client = HypClient::new(launcher, task.launcher.options())?;
        let (channel, sub_channel) = client.channel();
        tracing::info!(%launcher, id = client.launcher_id(), channel, sub_channel, "launcher configured");
        let task = Task::resolve(client, task)
            .await
            .with_context(|| format!("listing games of {launcher}"))?;
        tasks.push(task);
    }

    let publisher = StatusPublisher::new(config.status_file.clone());
    let mut orchestrator = Orchestrator::new(tasks, storage, publisher);

    if cli.once {
        orchestrator.tick().await?;
        return Ok(());
    }

    let interval = Duration::from_secs(config.interval_secs.max(1));
    tokio::select! {
        () = orchestrator.run(interval) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
