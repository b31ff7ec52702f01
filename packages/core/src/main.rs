use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::{watch, RwLock};

use hazard_monitor::alerts::{LogNotifier, NotificationDispatcher, Notifier, PushbulletNotifier};
use hazard_monitor::api::{self, ApiState};
use hazard_monitor::cli::Cli;
use hazard_monitor::config::Config;
use hazard_monitor::coordinator::MonitorCoordinator;
use hazard_monitor::error::AppError;
use hazard_monitor::logging::init_logging;
use hazard_monitor::metrics::AppMetrics;
use hazard_monitor::scheduler::run_ingestion;
use hazard_monitor::source::{DeviceReadingSource, LineReadingSource, ReadingSource};
use hazard_monitor::store::DEFAULT_CAPACITY;

/// How long shutdown waits for queued notifications to go out.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()
        .map(|config| config.with_cli(&cli))
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::info!("Service started with config: {:?}", config);

    if let Err(err) = run(config).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let coordinator = MonitorCoordinator::new(config.monitor_config()?, DEFAULT_CAPACITY)?;
    tracing::info!("Monitoring channels: {:?}", coordinator.channels());
    let metrics = Arc::new(AppMetrics::new()?);

    let notifier: Arc<dyn Notifier + Send + Sync> = match &config.pushbullet {
        Some(pushbullet) => Arc::new(PushbulletNotifier::new(
            pushbullet.api_url.clone(),
            pushbullet.access_token.clone(),
        )),
        None => {
            tracing::warn!("PUSHBULLET_TOKEN not set; alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let (dispatcher, delivery_worker) =
        NotificationDispatcher::spawn(notifier, config.delivery.clone(), metrics.clone());
    let coordinator = Arc::new(RwLock::new(coordinator.with_dispatcher(dispatcher)));

    let source: Box<dyn ReadingSource + Send> = if config.device == "-" {
        Box::new(LineReadingSource::stdin())
    } else {
        Box::new(DeviceReadingSource::new(&config.device))
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingestion = tokio::spawn(run_ingestion(
        source,
        coordinator.clone(),
        metrics.clone(),
        config.source_retry,
        shutdown_rx.clone(),
    ));

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        let _ = shutdown_tx.send(true);
    });

    let app = api::router(ApiState {
        coordinator: coordinator.clone(),
        metrics,
    });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("API listening on {}", config.bind_addr);

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    if let Err(err) = ingestion.await {
        tracing::error!("Ingestion task failed: {}", err);
    }

    // Dropping the last dispatcher handle lets the worker drain and exit.
    drop(coordinator.write().await.detach_dispatcher());
    if tokio::time::timeout(DRAIN_TIMEOUT, delivery_worker).await.is_err() {
        tracing::warn!("Pending notifications not delivered within {:?}", DRAIN_TIMEOUT);
    }

    tracing::info!("Service stopped");
    Ok(())
}
