//! apexdata-server: telemetry API for the race dashboard

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apexdata::{TelemetryConfig, TelemetryService};

#[derive(Debug, Parser)]
#[command(
    name = "apexdata-server",
    version,
    about = "Serve normalized F1 session telemetry over HTTP"
)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Serve stored session documents from this directory instead of the live provider
    #[arg(long, value_name = "DIR")]
    fixtures: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<TelemetryConfig> {
    let mut config = match &args.config {
        Some(path) => TelemetryConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let mut config = TelemetryConfig::default();
            config.apply_env();
            config
        }
    };

    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(dir) = &args.fixtures {
        config.upstream.fixture_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apexdata=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let service = TelemetryService::from_config(&config)?;

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    apexdata::server::serve(listener, service, &config.server, shutdown).await?;
    info!("Server stopped");
    Ok(())
}
