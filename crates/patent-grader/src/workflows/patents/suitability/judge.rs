use async_trait::async_trait;
use serde_json::json;

use super::policy::JudgeRequest;
use crate::workflows::patents::collaborators::{JudgeOracle, ProviderError};
use crate::workflows::patents::domain::Grade;

/// Offline judge that marks a grade down one step when the quantitative
/// inputs carry caveats (no classified citations or low-confidence market data).
#[derive(Debug, Clone, Copy, Default)]
pub struct CaveatJudge;

impl CaveatJudge {
    fn verdict(request: &JudgeRequest) -> (Grade, Vec<String>, Vec<String>) {
        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();

        if request.originality.insufficient_data {
            weaknesses.push("no classified citations to assess originality".to_string());
        } else if request.originality.score >= 0.6 {
            strengths.push(format!(
                "citations spread across {} classification codes",
                request.originality.unique_codes
            ));
        }

        if request.market.low_confidence {
            weaknesses.push("market evidence is thin or was corrected".to_string());
        } else if request.market.total >= 0.55 {
            strengths.push("market evidence supports a sizeable opportunity".to_string());
        }

        let caveated = request.originality.insufficient_data || request.market.low_confidence;
        let grade = if caveated {
            step_down(request.grade)
        } else {
            request.grade
        };

        (grade, strengths, weaknesses)
    }
}

fn step_down(grade: Grade) -> Grade {
    match grade {
        Grade::S => Grade::A,
        Grade::A => Grade::B,
        Grade::B => Grade::C,
        Grade::C | Grade::D => Grade::D,
    }
}

fn risk_level(grade: Grade) -> &'static str {
    match grade {
        Grade::S | Grade::A => "Low",
        Grade::B => "Medium",
        Grade::C | Grade::D => "High",
    }
}

#[async_trait]
impl JudgeOracle for CaveatJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<String, ProviderError> {
        let (grade, strengths, weaknesses) = Self::verdict(request);

        let rationale = if grade == request.grade {
            format!(
                "Weighted score {:.3} supports grade {}.",
                request.weighted_score, request.grade
            )
        } else {
            format!(
                "Weighted score {:.3} maps to grade {}, lowered to {} because {}.",
                request.weighted_score,
                request.grade,
                grade,
                weaknesses.join(" and ")
            )
        };

        let reply = json!({
            "suitability_grade": grade.label(),
            "confidence_score": if weaknesses.is_empty() { 0.8 } else { 0.5 },
            "key_strengths": strengths,
            "key_weaknesses": weaknesses,
            "risk_level": risk_level(grade),
            "suitability_rationale": rationale,
        });
        Ok(reply.to_string())
    }
}
