use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::repository::{BatchId, BatchRepository, RepositoryError};
use super::service::{BatchSubmission, EvaluationServiceError, PatentEvaluationService};

const DEFAULT_LISTING_LIMIT: usize = 20;

/// Router builder exposing batch submission and retrieval endpoints.
pub fn patent_batch_router<R>(service: Arc<PatentEvaluationService<R>>) -> Router
where
    R: BatchRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/patents/batches",
            post(submit_handler::<R>).get(list_handler::<R>),
        )
        .route(
            "/api/v1/patents/batches/:batch_id",
            get(report_handler::<R>),
        )
        .route(
            "/api/v1/patents/batches/:batch_id/records",
            get(records_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<PatentEvaluationService<R>>>,
    axum::Json(submission): axum::Json<BatchSubmission>,
) -> Response
where
    R: BatchRepository + 'static,
{
    match service.run_batch(submission).await {
        Ok(batch) => {
            let payload = json!({
                "batch_id": batch.id,
                "report": batch.report,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingParams {
    limit: Option<usize>,
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<PatentEvaluationService<R>>>,
    Query(params): Query<ListingParams>,
) -> Response
where
    R: BatchRepository + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_LISTING_LIMIT);
    match service.recent(limit) {
        Ok(batches) => {
            let views: Vec<_> = batches.iter().map(|batch| batch.summary_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<PatentEvaluationService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: BatchRepository + 'static,
{
    match service.get(&BatchId(batch_id)) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn records_handler<R>(
    State(service): State<Arc<PatentEvaluationService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: BatchRepository + 'static,
{
    match service.get(&BatchId(batch_id)) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.outcome.records)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: EvaluationServiceError) -> Response {
    let status = match &error {
        EvaluationServiceError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EvaluationServiceError::Batch(_) => StatusCode::BAD_REQUEST,
        EvaluationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        EvaluationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        EvaluationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
