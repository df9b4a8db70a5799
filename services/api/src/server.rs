use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_batch_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use patent_grader::config::AppConfig;
use patent_grader::error::AppError;
use patent_grader::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = build_service(&config)?;
    let shutdown = service.shutdown_token();

    let app = with_batch_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        workers = config.pipeline.workers,
        judge = config.pipeline.judge_enabled,
        "patent grader ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown, readiness_flag))
        .await?;
    Ok(())
}

/// Waits for Ctrl-C, then stops accepting work and cancels running batches.
async fn shutdown_signal(batches: CancellationToken, readiness: Arc<AtomicBool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "shutdown signal unavailable");
        std::future::pending::<()>().await;
    }

    readiness.store(false, Ordering::Release);
    info!("shutdown requested, cancelling running batches");
    batches.cancel();
}
