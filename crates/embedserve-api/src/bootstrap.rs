//! Application bootstrap and service initialization
//!
//! Binds the listener first so `/health` and `/stats` can report the
//! `Uninitialized` state while the model downloads, then loads the model and
//! flips the shared state to `Ready`.

use crate::{AppState, routes};
use embedserve_config::{ApplicationConfig, EmbeddingConfig, TelemetryConfig};
use embedserve_embeddings::{
    Backend, BackendAvailability, EmbeddingModel, EmbeddingService, select_device,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Bootstrap result type
pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Select a device, load the model onto it and run the warm-up encode
///
/// # Errors
///
/// Returns error if the device name is unknown, or the model fails to load
/// or warm up
pub async fn setup_embedding_service(
    config: &EmbeddingConfig,
) -> BootstrapResult<Arc<EmbeddingService>> {
    let preferred = config
        .performance
        .gpu_device
        .as_deref()
        .map(str::parse::<Backend>)
        .transpose()?;

    let selected = select_device(config.performance.use_gpu, preferred);
    let backend = selected.backend;
    let availability = BackendAvailability::probe();

    let model = EmbeddingModel::load(config, selected).await?;
    let service = Arc::new(EmbeddingService::new(
        Arc::new(model),
        availability,
        &config.performance,
    ));

    info!("Warming up embedding model...");
    service.warm_up().await?;

    info!("Model loaded successfully on {backend}");
    info!(
        "Model embedding dimensions: {}",
        service.embedding_dimension()
    );

    Ok(service)
}

/// Install the Prometheus recorder and its scrape endpoint
///
/// # Errors
///
/// Returns error if the recorder is already installed or the port can't be bound
pub fn install_metrics(config: &TelemetryConfig) -> BootstrapResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("Prometheus metrics available at http://{addr}/metrics");
    Ok(())
}

async fn shutdown_signal(abort: oneshot::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
        }
        _ = abort => {}
    }
}

/// Serve the API until shutdown
///
/// # Errors
///
/// Returns error if the listener can't be bound, the model fails to load
/// (the server is shut down first), or the server itself fails
pub async fn run(config: ApplicationConfig) -> BootstrapResult<()> {
    info!("Starting {}", config.telemetry.service_name);

    if config.telemetry.enable_metrics {
        install_metrics(&config.telemetry)?;
    }

    let state = AppState::new();
    let app = routes::create_router(state.clone(), &config.api);

    let addr = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Available at http://{addr}");
    info!("Health check: http://{addr}/health");
    info!("Stats: http://{addr}/stats");

    let (abort_tx, abort_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(abort_rx))
            .await
    });

    serve_while_loading(
        server,
        abort_tx,
        &state,
        setup_embedding_service(&config.embedding),
    )
    .await?;
    info!("Server stopped");
    Ok(())
}

/// Drive the model load alongside the running server
///
/// A successful load flips `state` to ready and then waits for the server.
/// A failed load shuts the server down and returns the load error. If the
/// server stops first (shutdown signal during a slow download) the load is
/// dropped and this returns immediately.
async fn serve_while_loading<L>(
    mut server: JoinHandle<std::io::Result<()>>,
    abort_tx: oneshot::Sender<()>,
    state: &AppState,
    load: L,
) -> BootstrapResult<()>
where
    L: Future<Output = BootstrapResult<Arc<EmbeddingService>>>,
{
    tokio::select! {
        biased;
        loaded = load => match loaded {
            Ok(service) => {
                state.mark_ready(service);
                info!("Model ready, accepting embedding requests");
            }
            Err(e) => {
                error!("Failed to initialize model: {e}");
                // The receiver is gone only if the server already stopped
                let _ = abort_tx.send(());
                match server.await {
                    Ok(Ok(())) => {}
                    Ok(Err(serve_err)) => warn!("Server failed while shutting down: {serve_err}"),
                    Err(join_err) => warn!("Server task ended abnormally: {join_err}"),
                }
                return Err(e);
            }
        },
        stopped = &mut server => {
            info!("Server stopped before the model finished loading");
            stopped??;
            return Ok(());
        }
    }

    server.await??;
    drop(abort_tx);
    Ok(())
}
