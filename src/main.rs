//! NodeWatch - Service Liveness Monitor
//!
//! Watches service registrations in etcd and reports node status changes
//! to a registered peer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nodewatch::api::HttpServer;
use nodewatch::config::NodeWatchConfig;
use nodewatch::monitor::Monitor;
use nodewatch::watch::EtcdWatcher;

/// NodeWatch - Service Liveness Monitor
#[derive(Parser)]
#[command(name = "nodewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nodewatch.toml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching and serve the API
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "nodewatch.toml")]
        output: PathBuf,

        /// etcd endpoint to watch
        #[arg(long, default_value = "http://127.0.0.1:2379")]
        etcd: String,
    },

    /// Validate configuration file
    Validate,

    /// Query the nodes of a service from a running monitor
    Query {
        /// Service name
        service: String,

        /// Monitor address (host:port)
        #[arg(short, long, default_value = "localhost:7171")]
        address: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Start => run_start(cli.config).await,
        Commands::Init { output, etcd } => run_init(output, etcd),
        Commands::Validate => run_validate(cli.config),
        Commands::Query { service, address } => run_query(service, address).await,
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Start the monitor
async fn run_start(config_path: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Starting NodeWatch...");

    let config = NodeWatchConfig::from_file(&config_path)
        .with_context(|| format!("failed to load configuration from {:?}", config_path))?;
    tracing::info!(
        "Loaded configuration: watching {} on {} endpoint(s)",
        config.etcd.prefix,
        config.etcd.endpoints.len()
    );

    let monitor = Arc::new(Monitor::from_config(&config)?);

    let mut watcher = EtcdWatcher::connect(&config).await?;

    let watch_monitor = Arc::clone(&monitor);
    let mut watch_task = tokio::spawn(async move { watch_monitor.watch(&mut watcher).await });

    let server = HttpServer::new(config.api.clone(), Arc::clone(&monitor));

    tokio::select! {
        result = &mut watch_task => {
            match result {
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("watch stream lost")),
                Ok(Ok(())) => Err(anyhow::anyhow!("watch loop ended")),
                Err(e) => Err(anyhow::Error::new(e).context("watch task panicked")),
            }
        }
        result = server.start() => {
            watch_task.abort();
            result.context("HTTP API failed")
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            watch_task.abort();
            Ok(())
        }
    }
}

/// Write a default configuration file
fn run_init(output: PathBuf, etcd: String) -> anyhow::Result<()> {
    let config_content = format!(r#"# NodeWatch Configuration
# Generated configuration file

[etcd]
endpoints = ["{etcd}"]
# endpoints = ["http://192.168.0.2:4001", "http://192.168.0.3:4001"]
prefix = "/service"
request_timeout_ms = 1000
connect_retry_ms = 1000

[api]
bind_address = "0.0.0.0:7171"
cors_enabled = false

[reporter]
path = "/api/v1.0/monitor"
timeout_ms = 5000
"#);

    std::fs::write(&output, config_content)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: nodewatch start --config {}", output.display());

    Ok(())
}

/// Validate a configuration file
fn run_validate(config_path: PathBuf) -> anyhow::Result<()> {
    match NodeWatchConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  etcd endpoints: {}", config.etcd.endpoints.join(", "));
            println!("  Watched prefix: {}", config.etcd.prefix);
            println!("  API address: {}", config.api.bind_address);
            println!("  Report path: {}", config.reporter.path);
            println!("  Report timeout: {:?}", config.report_timeout());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e.into())
        }
    }
}

/// Query a running monitor
async fn run_query(service: String, address: String) -> anyhow::Result<()> {
    let url = format!("http://{}/v1.0/service/{}", address, service);

    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?;
    let body: serde_json::Value = response.json().await.context("invalid response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
