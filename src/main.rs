//! Blog API server.
//!
//! ```text
//!     Client ──▶ request id / trace / metrics
//!            ──▶ panic containment ──▶ security headers ──▶ CORS
//!            ──▶ rate limit ──▶ authenticate ──▶ route gate ──▶ handler
//!                                                              │
//!                              TokenAuthority / ConcurrencyGuard ◀┘
//!                                              │
//!                                          SQLite store
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use blog_backend::config::{load_config, validate_config, AppConfig, ConfigError};
use blog_backend::http::HttpServer;
use blog_backend::lifecycle::{build_state, spawn_signal_handler, Shutdown};
use blog_backend::mailer::LogMailer;
use blog_backend::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "blog-backend", version, about = "Blog JSON API server")]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "BLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability, config.environment);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "blog-backend starting"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .context("parsing metrics address")?;
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("binding {}", config.listener.bind_address))?;

    let state = build_state(config, Arc::new(LogMailer))
        .await
        .context("opening database")?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    HttpServer::new(state).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
