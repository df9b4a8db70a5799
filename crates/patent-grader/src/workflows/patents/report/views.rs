use serde::Serialize;

use crate::workflows::patents::domain::{CountryCode, Grade, PatentId};
use crate::workflows::patents::pipeline::{PipelineRecord, RecordStatus, StageName};

/// Flat, reporting-friendly projection of one pipeline record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub patent_id: PatentId,
    pub title: String,
    pub country: CountryCode,
    pub status: &'static str,
    pub stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub originality: Option<f64>,
    pub insufficient_data: bool,
    pub market: Option<f64>,
    pub low_confidence: bool,
    pub weighted_score: Option<f64>,
    pub grade: Option<Grade>,
    pub revised_grade: Option<Grade>,
    pub citations_analyzed: Option<usize>,
    pub unique_codes: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub application_domains: Vec<String>,
}

impl RecordView {
    pub fn from_record(record: &PipelineRecord) -> Self {
        let failed_stage = match record.status {
            RecordStatus::Failed { stage } | RecordStatus::Cancelled { stage } => Some(stage),
            RecordStatus::Running | RecordStatus::Done => None,
        };

        Self {
            patent_id: record.patent.id.clone(),
            title: record.patent.title.clone(),
            country: record.patent.country.clone(),
            status: record.status.label(),
            stage: record.stage.label(),
            failed_stage: failed_stage.map(StageName::label),
            failure: failed_stage
                .and_then(|stage| record.failures.get(&stage))
                .map(|failure| failure.reason.describe()),
            originality: record.originality.as_ref().and_then(|result| result.score()),
            insufficient_data: record
                .originality
                .as_ref()
                .is_some_and(|result| result.is_insufficient()),
            market: record.market.as_ref().map(|result| result.total()),
            low_confidence: record
                .market
                .as_ref()
                .is_some_and(|result| result.low_confidence),
            weighted_score: record
                .suitability
                .as_ref()
                .map(|result| result.weighted_score),
            grade: record.suitability.as_ref().map(|result| result.grade),
            revised_grade: record
                .suitability
                .as_ref()
                .and_then(|result| result.revised_grade),
            citations_analyzed: record
                .originality
                .as_ref()
                .map(|result| result.stats.citations_analyzed),
            unique_codes: record
                .originality
                .as_ref()
                .map(|result| result.stats.unique_codes),
            application_domains: record
                .market
                .as_ref()
                .map(|result| result.application_domains.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapStatus {
    Leading,
    Behind,
}

impl GapStatus {
    pub const fn label(self) -> &'static str {
        match self {
            GapStatus::Leading => "Leading",
            GapStatus::Behind => "Behind",
        }
    }
}

/// Difference between one country's averages and the baseline's.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryGap {
    pub country: CountryCode,
    pub originality_gap: f64,
    pub market_gap: f64,
    pub suitability_gap: f64,
    pub overall_gap: f64,
    pub status: GapStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub baseline: CountryCode,
    pub gaps: Vec<CountryGap>,
}
