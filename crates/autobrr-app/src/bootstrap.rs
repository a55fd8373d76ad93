use std::sync::Arc;

use autobrr_config::AppConfig;
use autobrr_events::EventBus;
use autobrr_indexer::Registry;
use autobrr_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::adapters::{FileRepository, HttpMetadataFetcher, LoggingDispatcher};
use crate::error::{AppError, AppResult};
use crate::sessions::build_session_configs;

/// Dependencies required to bootstrap the application, gathered up front so
/// the boot sequence itself (`run_app_with`) stays a straight line.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: AppConfig,
    registry: Arc<Registry>,
    repository: Arc<FileRepository>,
    events: EventBus,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("app_config.from_env", err))?;
        let logging = LoggingConfig {
            level: config.log_level.as_str(),
            format: LogFormat::infer(),
            build_sha: autobrr_telemetry::build_sha(),
        };

        let registry = Registry::load(Some(&config.config_path))
            .map_err(|err| AppError::indexer("registry.load", err))?;

        let filters_path = std::env::var("FILTERS_PATH")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| config.config_path.join("filters.json"));
        let repository =
            FileRepository::load(&filters_path).map_err(|err| AppError::repository("file_repository.load", err))?;

        let events = EventBus::new();
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;

        Ok(Self {
            logging,
            config,
            registry: Arc::new(registry),
            repository: Arc::new(repository),
            events,
            metrics,
        })
    }
}

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    autobrr_telemetry::init_logging(&dependencies.logging).map_err(|err| AppError::telemetry("logging.init", err))?;
    let _context = GlobalContextGuard::new("irc-pipeline");

    info!("autobrr core bootstrap starting");

    let BootstrapDependencies {
        logging: _,
        config: _,
        registry,
        repository,
        events,
        metrics,
    } = dependencies;

    let session_configs = build_session_configs(&registry.snapshot())?;
    info!(sessions = session_configs.len(), "deduplicated indexer networks into IRC sessions");

    let pipeline = autobrr_pipeline::spawn(
        Arc::clone(&registry),
        repository,
        Arc::new(LoggingDispatcher),
        Arc::new(HttpMetadataFetcher::new()),
        events.clone(),
        metrics.clone(),
        autobrr_pipeline::PipelineConfig::default(),
    );

    let sessions: Vec<_> = session_configs
        .into_iter()
        .map(|config| {
            let network = config.network.clone();
            (network, autobrr_irc::spawn(config, pipeline.sender(), events.clone(), metrics.clone()))
        })
        .collect();

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining IRC sessions and the pipeline");

    for (network, handle) in sessions {
        handle.shutdown();
        handle.join().await;
        info!(network = %network, "IRC session stopped");
    }
    pipeline.shutdown().await;

    info!("autobrr core shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    if let Err(source) = tokio::signal::ctrl_c().await {
        warn!(error = %source, "failed to install Ctrl+C handler, shutting down immediately");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_app_with_drains_sessionless_pipeline_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(Some(dir.path())).unwrap();
        let repository = FileRepository::load(&dir.path().join("filters.json")).unwrap();
        let events = EventBus::new();
        let metrics = Metrics::new().unwrap();

        let pipeline = autobrr_pipeline::spawn(
            Arc::new(registry),
            Arc::new(repository),
            Arc::new(LoggingDispatcher),
            Arc::new(HttpMetadataFetcher::new()),
            events,
            metrics,
            autobrr_pipeline::PipelineConfig {
                workers: 1,
                ..autobrr_pipeline::PipelineConfig::default()
            },
        );
        pipeline.shutdown().await;
    }
}
