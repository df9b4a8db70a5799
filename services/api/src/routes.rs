use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use patent_grader::workflows::patents::{
    patent_batch_router, BatchRepository, PatentEvaluationService,
};
use serde_json::json;

use crate::infra::AppState;

/// Batch endpoints plus the operational probes.
pub(crate) fn with_batch_routes<R>(service: Arc<PatentEvaluationService<R>>) -> Router
where
    R: BatchRepository + 'static,
{
    patent_batch_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_service;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use patent_grader::config::AppConfig;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let mut config = AppConfig::load().expect("default configuration loads");
        config.pipeline.judge_enabled = true;
        let service = build_service(&config).expect("bundled fixtures load");
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_batch_routes(service).layer(Extension(state))
    }

    async fn status_of(router: Router, request: Request<Body>) -> StatusCode {
        router
            .oneshot(request)
            .await
            .expect("router responds")
            .status()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    #[tokio::test]
    async fn probes_report_health_and_readiness() {
        assert_eq!(status_of(app(true), get("/health")).await, StatusCode::OK);
        assert_eq!(status_of(app(true), get("/ready")).await, StatusCode::OK);
        assert_eq!(
            status_of(app(false), get("/ready")).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(true), get("/metrics")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn batch_submission_runs_against_bundled_fixtures() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/patents/batches")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "query": "solid-state battery", "countries": ["US", "KR", "JP"] })
                    .to_string(),
            ))
            .expect("request builds");

        let response = app(true).oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["report"]["tally"]["total"], json!(8));
        assert_eq!(body["report"]["gap_analysis"]["baseline"], json!("KR"));
    }
}
