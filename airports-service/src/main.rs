use clap::Parser;
use ingest::admin::AdminService;
use ingest::service::{IngestService, ServiceError};
use metrics_exporter_statsd::StatsdBuilder;
use shared::http::run_http_service;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::sqlite::SqliteStore;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(about = "Bulk airport ingestion service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Error, Debug)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("could not open database: {0}")]
    Store(#[from] store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not install metrics recorder: {0}")]
    Metrics(String),

    #[error("service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("service task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("could not install signal handler: {0}")]
    Signal(std::io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(&cli.config).await {
        tracing::error!(error = %err, "service terminated");
        std::process::exit(1);
    }
}

async fn run(config_path: &Path) -> Result<(), ServerError> {
    let config = Config::from_file(config_path)?;

    // error reporting and metrics are optional sections
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    if let Some(metrics_config) = &config.metrics {
        install_metrics_recorder(metrics_config)?;
    }

    if let Some(parent) = config.database.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    tracing::info!(path = %config.database.path.display(), "database ready");

    let api_listener = config.listener.clone();
    let api_service = IngestService::new(store.clone());
    let mut api_task = tokio::spawn(async move {
        run_http_service(&api_listener.host, api_listener.port, api_service).await
    });

    let admin_listener = config.admin_listener.clone();
    let admin_service = AdminService::new(store);
    let mut admin_task = tokio::spawn(async move {
        run_http_service(&admin_listener.host, admin_listener.port, admin_service).await
    });

    let result = tokio::select! {
        res = &mut api_task => res?.map_err(ServerError::Service),
        res = &mut admin_task => res?.map_err(ServerError::Service),
        sig = shutdown_signal() => {
            sig?;
            tracing::info!("shutdown signal received");
            Ok(())
        }
    };

    api_task.abort();
    admin_task.abort();
    tracing::info!("completed");
    result
}

async fn shutdown_signal() -> Result<(), ServerError> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(ServerError::Signal)?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

fn install_metrics_recorder(config: &config::MetricsConfig) -> Result<(), ServerError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("airports"))
        .map_err(|err| ServerError::Metrics(err.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|err| ServerError::Metrics(err.to_string()))?;
    shared::metrics_defs::describe_all(ingest::metrics_defs::ALL_METRICS);
    Ok(())
}
