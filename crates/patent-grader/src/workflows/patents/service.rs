use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::domain::CountryCode;
use super::pipeline::{BatchError, BatchRequest, PipelineOrchestrator};
use super::report::BatchReport;
use super::repository::{BatchId, BatchRepository, RepositoryError, StoredBatch};

/// Fallbacks applied when a submission leaves fields empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDefaults {
    pub countries: Vec<CountryCode>,
    pub top_n_per_country: usize,
    pub baseline: CountryCode,
}

/// Incoming batch request as accepted over HTTP or from the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSubmission {
    pub query: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub top_n_per_country: Option<usize>,
    #[serde(default)]
    pub baseline: Option<String>,
}

/// Service composing the orchestrator, report builder, and repository.
pub struct PatentEvaluationService<R> {
    orchestrator: Arc<PipelineOrchestrator>,
    repository: Arc<R>,
    defaults: BatchDefaults,
    shutdown: CancellationToken,
}

static BATCH_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_batch_id() -> BatchId {
    let id = BATCH_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BatchId(format!("batch-{id:06}"))
}

impl<R> PatentEvaluationService<R>
where
    R: BatchRepository + 'static,
{
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        repository: Arc<R>,
        defaults: BatchDefaults,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            defaults,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancels every running batch; completed records are kept.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run a batch to completion (or cancellation) and persist it with its report.
    pub async fn run_batch(
        &self,
        submission: BatchSubmission,
    ) -> Result<StoredBatch, EvaluationServiceError> {
        let query = submission.query.trim().to_string();
        if query.is_empty() {
            return Err(EvaluationServiceError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let countries = if submission.countries.is_empty() {
            self.defaults.countries.clone()
        } else {
            submission.countries.iter().map(CountryCode::new).collect()
        };
        if countries.is_empty() {
            return Err(EvaluationServiceError::InvalidRequest(
                "at least one country is required".to_string(),
            ));
        }

        let top_n_per_country = submission
            .top_n_per_country
            .unwrap_or(self.defaults.top_n_per_country);
        if top_n_per_country == 0 {
            return Err(EvaluationServiceError::InvalidRequest(
                "top_n_per_country must be positive".to_string(),
            ));
        }

        let baseline = submission
            .baseline
            .as_deref()
            .map(CountryCode::new)
            .unwrap_or_else(|| self.defaults.baseline.clone());

        let request = BatchRequest {
            query,
            countries,
            top_n_per_country,
        };

        let outcome = self
            .orchestrator
            .run_batch(&request, self.shutdown.child_token())
            .await?;
        let report = BatchReport::from_outcome(&outcome, &baseline);

        let batch = StoredBatch {
            id: next_batch_id(),
            outcome,
            report,
            stored_at: Utc::now(),
        };

        let stored = self.repository.insert(batch)?;
        info!(batch = %stored.id, records = stored.report.tally.total, "batch stored");
        Ok(stored)
    }

    pub fn get(&self, id: &BatchId) -> Result<StoredBatch, EvaluationServiceError> {
        let batch = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(batch)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<StoredBatch>, EvaluationServiceError> {
        Ok(self.repository.recent(limit)?)
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
