use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use depot_lifecycle::ExpirySweeperBuilder;
use depot_server::config::DepotConfig;
use depot_server::factory;

/// File lifecycle service: storage backends plus the periodic expiry sweeper.
#[derive(Parser, Debug)]
#[command(name = "depot-server", about = "File lifecycle service for depot")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "depot.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Connect the backends and run the expiry sweeper until shutdown (default).
    Run,
    /// Run a single expiry sweep, print the report as JSON, then exit.
    Sweep,
    /// Run database migrations for the configured metadata backend, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config: DepotConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    let telemetry_guard = depot_server::telemetry::init(&config.telemetry);

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Sweep => run_sweep(&config).await,
        Commands::Migrate => run_migrate(&config).await,
    };

    telemetry_guard.shutdown();
    result
}

async fn run(config: &DepotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let lifecycle = factory::build_lifecycle(config).await?;

    let sweeper = if config.sweeper.enabled {
        let (mut sweeper, shutdown_tx) = ExpirySweeperBuilder::new()
            .config(config.sweeper.to_sweeper_config())
            .lifecycle(lifecycle)
            .build()?;
        let handle = tokio::spawn(async move { sweeper.run().await });
        Some((handle, shutdown_tx))
    } else {
        info!("expiry sweeper disabled");
        None
    };

    info!("depot running, waiting for shutdown signal");
    shutdown_signal().await;

    if let Some((handle, shutdown_tx)) = sweeper {
        let _ = shutdown_tx.send(()).await;
        let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
        match tokio::time::timeout(shutdown_timeout, handle).await {
            Ok(Ok(())) => info!("expiry sweeper stopped"),
            Ok(Err(e)) => warn!(error = %e, "expiry sweeper task failed"),
            Err(_) => warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "sweeper did not stop within shutdown timeout"
            ),
        }
    }

    info!("depot shut down");
    Ok(())
}

async fn run_sweep(config: &DepotConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.metadata.backend == "memory" {
        warn!("metadata backend is in-memory, a one-shot sweep will find nothing");
    }
    let lifecycle = factory::build_lifecycle(config).await?;
    let report = lifecycle.sweep_expired().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_migrate(config: &DepotConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(backend = %config.metadata.backend, "running metadata backend migrations...");
    let _store = factory::create_metadata_store(&config.metadata).await?;
    info!(backend = %config.metadata.backend, "metadata backend migrations complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
