//! reg server binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use reg_core::config::AppConfig;
use reg_server::{AppState, Registry, create_router, crawler};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// reg - an OCI registry frontend over an object-storage bucket
#[derive(Parser, Debug)]
#[command(name = "reg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "REG_CONFIG", default_value = "reg.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the registry server
    Serve {
        /// Bucket name
        #[arg(short, long)]
        bucket: String,

        /// Rebuild the metadata index from the bucket before serving
        #[arg(long)]
        bootstrap: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("reg v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { bucket, bootstrap } => serve(&cli.config, bucket, bootstrap).await,
    }
}

/// Load configuration from an optional TOML file merged with `REG_`
/// environment variables.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(config_path).exists() {
        tracing::info!(config_path, "loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    }
    figment
        .merge(Env::prefixed("REG_").split("__"))
        .extract()
        .context("failed to load configuration")
}

async fn serve(config_path: &str, bucket: String, bootstrap: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.storage.bucket = bucket;
    config
        .storage
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid storage configuration: {e}"))?;

    let storage = reg_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!(bucket = %config.storage.bucket, "storage backend initialized");

    let metadata = reg_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata index")?;
    tracing::info!(path = %config.metadata.path.display(), "metadata index initialized");

    let registry = Arc::new(Registry::new(storage, metadata.clone()));

    if bootstrap {
        tracing::info!("bootstrapping index from bucket");
        let stats = crawler::bootstrap(registry.clone())
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap failed: {e}"))?;
        tracing::info!(
            found = stats.found,
            skipped = stats.skipped,
            processed = stats.processed,
            "bootstrap complete"
        );
    }

    let state = AppState::new(config.clone(), registry);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The index is the only stateful local resource; flush it before exit.
    metadata.close().await;
    tracing::info!("index closed, exiting");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("received interrupt, shutting down");
}
