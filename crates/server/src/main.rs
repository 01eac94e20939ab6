//! Restash server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use restash_core::config::AppConfig;
use restash_server::auth::hash_password;
use restash_server::{AppState, CredentialFile, CredentialStore, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Restash - a REST server for backup repositories
#[derive(Parser, Debug)]
#[command(name = "restashd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "RESTASH_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,

    /// Read a password from stdin, print its Argon2 hash and exit
    #[arg(long)]
    hash_password: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    if args.hash_password {
        let mut password = String::new();
        std::io::stdin()
            .read_line(&mut password)
            .context("failed to read password from stdin")?;
        let hash = hash_password(password.trim_end_matches(['\r', '\n']))
            .context("failed to hash password")?;
        println!("{hash}");
        return Ok(());
    }

    // Configuration is loaded before tracing so that debug mode can raise the
    // default filter; load errors are reported by anyhow on exit.
    let config = load_config(&args.config)?;

    let default_filter = if config.server.debug {
        "debug"
    } else {
        "info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Restash v{}", env!("CARGO_PKG_VERSION"));

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    if config.server.append_only {
        tracing::info!("Append-only mode: only lock files may be deleted");
    }

    // Register Prometheus metrics
    if config.server.metrics_enabled {
        restash_server::metrics::register_metrics();
        tracing::info!("Prometheus metrics registered");
    }

    // Initialize storage backend
    let storage = restash_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    // Verify storage connectivity before accepting requests.
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend connectivity verified");

    // Load credentials
    let credentials: Option<Arc<dyn CredentialStore>> = if config.auth.enabled {
        let creds = CredentialFile::from_config(&config.auth)
            .await
            .context("failed to load credentials")?;
        tracing::info!(users = creds.len(), "Basic authentication enabled");
        Some(Arc::new(creds))
    } else {
        tracing::warn!("Authentication disabled, every request is accepted");
        None
    };

    // Create application state
    let state = AppState::new(config.clone(), storage, credentials);

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from an optional TOML file layered under
/// `RESTASH_`-prefixed environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        figment = figment.merge(Toml::file(path));
    }

    // RESTASH_CONFIG only names the file
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("RESTASH_") && key != "RESTASH_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: restashd --config /path/to/config.toml\n  \
             2. Environment variables: RESTASH_STORAGE__TYPE=filesystem \
             RESTASH_STORAGE__PATH=/srv/restic restashd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set RESTASH_CONFIG env var to specify a default config file path."
        );
    }

    figment
        .merge(Env::prefixed("RESTASH_").split("__"))
        .extract()
        .context("failed to load configuration")
}
