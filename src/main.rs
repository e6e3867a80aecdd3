//! Webpage Availability Monitor Binary

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uptime_monitor::{build_server, AvailabilityTracker, Config, FailureLogStore, Monitor};

#[derive(Debug, Parser)]
#[command(name = "uptime_monitor", version, about = "Availability monitor for a single HTTP endpoint")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", env = "MONITOR_CONFIG")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    initialize_tracing();

    let args = Args::parse();

    info!("Starting uptime monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match Config::load(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Failed to load configuration from {}: {}",
                args.config.display(),
                e
            );
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Monitor configuration - Target: {}, Interval: {}s, Timeout: {}s, Expected status: {}",
        config.target_url,
        config.check_interval_seconds,
        config.timeout_seconds,
        config.expected_status_code
    );

    let availability = Arc::new(AvailabilityTracker::new());
    let failure_log = Arc::new(
        FailureLogStore::open(config.max_resident_failures, &config.failure_log_path).await,
    );

    let listen_addr = config.listen_addr.clone();
    let monitor = match Monitor::new(config, availability, failure_log) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            error!("Failed to create monitor: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor_task = tokio::spawn({
        let monitor = Arc::clone(&monitor);
        async move { monitor.run(shutdown_rx).await }
    });

    let server = build_server(Arc::clone(&monitor), &listen_addr)?;
    info!("Listening on {}", listen_addr);

    // Serves until SIGINT or SIGTERM stops the server.
    let result = server.await;

    info!("Exposition server stopped, draining monitor");
    let _ = shutdown_tx.send(());
    if let Err(e) = monitor_task.await {
        error!("Monitor task failed: {}", e);
    }

    info!("Shutdown complete");
    result
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
