mod config;
mod judge;
mod policy;
mod rules;

pub use config::{GradeBand, GRADE_BANDS, MARKET_WEIGHT, ORIGINALITY_WEIGHT};
pub use judge::CaveatJudge;
pub use policy::{
    parse_verdict, JudgeRequest, JudgeVerdict, MarketBreakdown, OriginalityBreakdown,
    VerdictError,
};
pub use rules::{grade_for, ScoreBreakdown};

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::collaborators::JudgeOracle;
use super::domain::{Grade, PatentId};
use super::market::MarketResult;
use super::originality::OriginalityResult;

/// Caveats recorded when an input had to be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitabilityCaveat {
    OriginalityInsufficientData,
    MarketLowConfidence,
}

/// What happened to the optional qualitative step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum JudgeStatus {
    Skipped,
    Accepted,
    Unavailable(String),
    Unparseable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuitabilityResult {
    pub patent_id: PatentId,
    pub originality_score: f64,
    pub market_score: f64,
    pub weighted_score: f64,
    pub breakdown: ScoreBreakdown,
    pub grade: Grade,
    pub revised_grade: Option<Grade>,
    pub caveats: Vec<SuitabilityCaveat>,
    pub judge: JudgeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<JudgeVerdict>,
    pub rationale: String,
}

impl SuitabilityResult {
    /// The judge proposed a grade that differs from the computed one.
    pub fn judge_override(&self) -> Option<Grade> {
        self.revised_grade.filter(|revised| *revised != self.grade)
    }
}

/// Combines the two scores and optionally consults the judge. Never fails.
pub struct SuitabilityAggregator {
    judge: Option<Arc<dyn JudgeOracle>>,
}

impl SuitabilityAggregator {
    pub fn new(judge: Option<Arc<dyn JudgeOracle>>) -> Self {
        Self { judge }
    }

    pub async fn evaluate(
        &self,
        originality: &OriginalityResult,
        market: &MarketResult,
    ) -> SuitabilityResult {
        let mut caveats = Vec::new();
        let originality_score = match originality.score() {
            Some(score) => score,
            None => {
                caveats.push(SuitabilityCaveat::OriginalityInsufficientData);
                0.0
            }
        };
        if market.low_confidence {
            caveats.push(SuitabilityCaveat::MarketLowConfidence);
        }

        let market_score = market.total();
        let (weighted_score, breakdown) = rules::weighted_score(originality_score, market_score);
        let grade = grade_for(weighted_score);

        let mut result = SuitabilityResult {
            patent_id: originality.patent_id.clone(),
            originality_score,
            market_score,
            weighted_score,
            breakdown,
            grade,
            revised_grade: None,
            caveats,
            judge: JudgeStatus::Skipped,
            verdict: None,
            rationale: policy::interpretation_summary(originality_score, market_score, grade),
        };

        if let Some(judge) = &self.judge {
            let request = judge_request(&result, originality, market);
            match judge.judge(&request).await {
                Ok(raw) => match parse_verdict(&raw) {
                    Ok(verdict) => {
                        result.revised_grade = verdict.suitability_grade;
                        if !verdict.suitability_rationale.trim().is_empty() {
                            result.rationale = verdict.suitability_rationale.clone();
                        }
                        result.judge = JudgeStatus::Accepted;
                        result.verdict = Some(verdict);
                    }
                    Err(error) => {
                        warn!(patent = %result.patent_id, %error, "judge reply discarded");
                        result.judge = JudgeStatus::Unparseable(error.to_string());
                    }
                },
                Err(error) => {
                    warn!(patent = %result.patent_id, %error, "judge unavailable");
                    result.judge = JudgeStatus::Unavailable(error.to_string());
                }
            }
        }

        debug!(
            patent = %result.patent_id,
            weighted = result.weighted_score,
            grade = %result.grade,
            revised = ?result.revised_grade,
            "suitability evaluated"
        );
        result
    }
}

fn judge_request(
    result: &SuitabilityResult,
    originality: &OriginalityResult,
    market: &MarketResult,
) -> JudgeRequest {
    JudgeRequest {
        patent_id: result.patent_id.clone(),
        weighted_score: result.weighted_score,
        grade: result.grade,
        breakdown: result.breakdown,
        originality: OriginalityBreakdown {
            score: result.originality_score,
            insufficient_data: originality.is_insufficient(),
            unique_codes: originality.stats.unique_codes,
            total_codes: originality.stats.total_codes,
        },
        market: MarketBreakdown {
            market_size: market.market_size.value,
            growth: market.growth.value,
            commercialization: market.commercialization.value,
            total: market.total(),
            low_confidence: market.low_confidence,
            application_domains: market.application_domains.clone(),
        },
    }
}
