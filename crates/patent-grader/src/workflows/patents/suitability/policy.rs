use serde::{Deserialize, Deserializer, Serialize};

use super::rules::ScoreBreakdown;
use crate::workflows::patents::domain::{Grade, PatentId};
use crate::workflows::patents::market::rubric_json_object;

/// Originality half of the judge context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginalityBreakdown {
    pub score: f64,
    pub insufficient_data: bool,
    pub unique_codes: usize,
    pub total_codes: u64,
}

/// Market half of the judge context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketBreakdown {
    pub market_size: f64,
    pub growth: f64,
    pub commercialization: f64,
    pub total: f64,
    pub low_confidence: bool,
    pub application_domains: Vec<String>,
}

/// Everything the judge oracle sees. It cannot change `weighted_score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeRequest {
    pub patent_id: PatentId,
    pub weighted_score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
    pub originality: OriginalityBreakdown,
    pub market: MarketBreakdown,
}

/// Qualitative verdict returned by the judge oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default, deserialize_with = "lenient_grade")]
    pub suitability_grade: Option<Grade>,
    #[serde(default)]
    pub suitability_rationale: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub key_weaknesses: Vec<String>,
    #[serde(default)]
    pub investment_recommendation: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub strategic_advice: Option<String>,
}

/// Wire shape of a judge reply. Grade and rationale may arrive under several
/// names; the first one present wins.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default, deserialize_with = "lenient_grade")]
    suitability_grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient_grade")]
    proposed_grade: Option<Grade>,
    #[serde(default, deserialize_with = "lenient_grade")]
    grade: Option<Grade>,
    #[serde(default)]
    suitability_rationale: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    key_strengths: Vec<String>,
    #[serde(default)]
    key_weaknesses: Vec<String>,
    #[serde(default)]
    investment_recommendation: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    strategic_advice: Option<String>,
}

impl From<RawVerdict> for JudgeVerdict {
    fn from(raw: RawVerdict) -> Self {
        Self {
            suitability_grade: raw.suitability_grade.or(raw.proposed_grade).or(raw.grade),
            suitability_rationale: raw
                .suitability_rationale
                .or(raw.rationale)
                .unwrap_or_default(),
            confidence_score: raw.confidence_score,
            key_strengths: raw.key_strengths,
            key_weaknesses: raw.key_weaknesses,
            investment_recommendation: raw.investment_recommendation,
            risk_level: raw.risk_level,
            strategic_advice: raw.strategic_advice,
        }
    }
}

fn lenient_grade<'de, D>(deserializer: D) -> Result<Option<Grade>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(Grade::parse))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerdictError {
    #[error("judge reply contains no JSON object")]
    MissingObject,
    #[error("judge reply is not a valid verdict: {0}")]
    Invalid(String),
    #[error("judge reply has neither a grade nor a rationale")]
    Empty,
}

pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, VerdictError> {
    let body = rubric_json_object(raw).ok_or(VerdictError::MissingObject)?;
    let raw: RawVerdict =
        serde_json::from_str(body).map_err(|error| VerdictError::Invalid(error.to_string()))?;
    let verdict = JudgeVerdict::from(raw);

    if verdict.suitability_grade.is_none() && verdict.suitability_rationale.trim().is_empty() {
        return Err(VerdictError::Empty);
    }
    Ok(verdict)
}

/// Deterministic summary used when no judge rationale is available.
pub(crate) fn interpretation_summary(originality: f64, market: f64, grade: Grade) -> String {
    let originality_band = if originality >= 0.9 {
        "very high technical originality"
    } else if originality >= 0.8 {
        "high technical originality"
    } else {
        "moderate technical originality"
    };

    let market_band = if market >= 0.75 {
        "strong market potential"
    } else if market >= 0.55 {
        "solid market potential"
    } else {
        "moderate market potential"
    };

    format!(
        "Grade {grade} ({}): {originality_band} ({originality:.3}) with {market_band} ({market:.3})",
        grade.description()
    )
}
