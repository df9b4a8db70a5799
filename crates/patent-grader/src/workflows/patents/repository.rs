use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pipeline::BatchOutcome;
use super::report::BatchReport;

/// Identifier assigned to a stored batch run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finished batch together with its report, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBatch {
    pub id: BatchId,
    pub outcome: BatchOutcome,
    pub report: BatchReport,
    pub stored_at: DateTime<Utc>,
}

impl StoredBatch {
    pub fn summary_view(&self) -> BatchSummaryView {
        BatchSummaryView {
            batch_id: self.id.clone(),
            query: self.outcome.query.clone(),
            cancelled: self.outcome.cancelled,
            records: self.report.tally.total,
            done: self.report.tally.done,
            failed: self.report.tally.failed,
            cancelled_records: self.report.tally.cancelled,
            stored_at: self.stored_at,
        }
    }
}

/// Storage abstraction so the service can be exercised without a database.
pub trait BatchRepository: Send + Sync {
    fn insert(&self, batch: StoredBatch) -> Result<StoredBatch, RepositoryError>;
    fn fetch(&self, id: &BatchId) -> Result<Option<StoredBatch>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<StoredBatch>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("batch already exists")]
    Conflict,
    #[error("batch not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compact listing entry for stored batches.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummaryView {
    pub batch_id: BatchId,
    pub query: String,
    pub cancelled: bool,
    pub records: usize,
    pub done: usize,
    pub failed: usize,
    pub cancelled_records: usize,
    pub stored_at: DateTime<Utc>,
}
