use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflows::patents::domain::{Patent, PatentId};
use crate::workflows::patents::market::MarketResult;
use crate::workflows::patents::originality::OriginalityResult;
use crate::workflows::patents::suitability::SuitabilityResult;

/// Progress marker, strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    Classified,
    OriginalityScored,
    MarketScored,
    Evaluated,
    Done,
}

impl PipelineStage {
    pub const fn label(self) -> &'static str {
        match self {
            PipelineStage::Pending => "pending",
            PipelineStage::Classified => "classified",
            PipelineStage::OriginalityScored => "originality_scored",
            PipelineStage::MarketScored => "market_scored",
            PipelineStage::Evaluated => "evaluated",
            PipelineStage::Done => "done",
        }
    }
}

/// Unit of work that can fail and own an error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Classification,
    Originality,
    Market,
    Suitability,
}

impl StageName {
    pub const fn label(self) -> &'static str {
        match self {
            StageName::Classification => "classification",
            StageName::Originality => "originality",
            StageName::Market => "market",
            StageName::Suitability => "suitability",
        }
    }

    /// Stage that would have run next after `stage` was reached.
    pub(crate) fn following(stage: PipelineStage) -> Self {
        match stage {
            PipelineStage::Pending => StageName::Classification,
            PipelineStage::Classified => StageName::Originality,
            PipelineStage::OriginalityScored => StageName::Market,
            PipelineStage::MarketScored | PipelineStage::Evaluated | PipelineStage::Done => {
                StageName::Suitability
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// A collaborator was unreachable or answered outside its contract.
    Provider(String),
    /// The batch was cancelled before this stage finished.
    Cancelled,
    /// The worker running the pipeline stopped unexpectedly.
    Aborted(String),
}

impl FailureReason {
    pub fn describe(&self) -> String {
        match self {
            FailureReason::Provider(message) => format!("provider failure: {message}"),
            FailureReason::Cancelled => "cancelled before completion".to_string(),
            FailureReason::Aborted(message) => format!("aborted: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub reason: FailureReason,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Running,
    Done,
    Failed { stage: StageName },
    Cancelled { stage: StageName },
}

impl RecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecordStatus::Running => "running",
            RecordStatus::Done => "done",
            RecordStatus::Failed { .. } => "failed",
            RecordStatus::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RecordStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub stage: PipelineStage,
    pub at: DateTime<Utc>,
}

/// Per-patent record. Owned by one pipeline until finalized, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRecord {
    pub patent: Patent,
    pub stage: PipelineStage,
    pub status: RecordStatus,
    pub originality: Option<OriginalityResult>,
    pub market: Option<MarketResult>,
    pub suitability: Option<SuitabilityResult>,
    pub failures: BTreeMap<StageName, StageFailure>,
    pub transitions: Vec<StageTransition>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRecord {
    pub(crate) fn start(patent: Patent) -> Self {
        let now = Utc::now();
        Self {
            patent,
            stage: PipelineStage::Pending,
            status: RecordStatus::Running,
            originality: None,
            market: None,
            suitability: None,
            failures: BTreeMap::new(),
            transitions: vec![StageTransition {
                stage: PipelineStage::Pending,
                at: now,
            }],
            started_at: now,
            finished_at: None,
        }
    }

    pub fn patent_id(&self) -> &PatentId {
        &self.patent.id
    }

    pub(crate) fn advance(&mut self, stage: PipelineStage, at: DateTime<Utc>) {
        debug_assert!(stage > self.stage, "stages only move forward");
        self.stage = stage;
        self.transitions.push(StageTransition { stage, at });
    }

    pub(crate) fn fail(&mut self, stage: StageName, reason: FailureReason) {
        let at = Utc::now();
        self.failures.insert(stage, StageFailure { reason, at });
        self.status = RecordStatus::Failed { stage };
        self.finished_at = Some(at);
    }

    pub(crate) fn cancel(&mut self) {
        let at = Utc::now();
        let stage = StageName::following(self.stage);
        self.failures.insert(
            stage,
            StageFailure {
                reason: FailureReason::Cancelled,
                at,
            },
        );
        self.status = RecordStatus::Cancelled { stage };
        self.finished_at = Some(at);
    }

    pub(crate) fn complete(&mut self) {
        let at = Utc::now();
        self.advance(PipelineStage::Done, at);
        self.status = RecordStatus::Done;
        self.finished_at = Some(at);
    }

    pub fn is_done(&self) -> bool {
        self.status == RecordStatus::Done
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RecordStatus::Failed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, RecordStatus::Cancelled { .. })
    }
}
