mod heuristic;
mod rubric;

pub use heuristic::EvidenceHeuristicOracle;
pub(crate) use rubric::json_object as rubric_json_object;
pub use rubric::{
    parse_reply, ReplyError, RubricBounds, RubricBucket, RubricReply, RubricRequest, SubScoreKind,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::collaborators::{ProviderError, ScoringOracle};
use super::domain::PatentId;
use super::evidence::EvidenceSet;

const MAX_APPLICATION_DOMAINS: usize = 5;

/// Post-hoc correction applied to an oracle answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreAdjustment {
    Clamped { raw: f64 },
    Discarded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub kind: SubScoreKind,
    pub value: f64,
    pub justification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<ScoreAdjustment>,
}

impl SubScore {
    /// Applies the kind's bounds to a raw oracle reply.
    pub fn from_reply(kind: SubScoreKind, raw: &str) -> Self {
        match parse_reply(raw) {
            Ok(reply) => {
                let bounds = kind.bounds();
                let value = bounds.clamp(reply.score);
                let adjustment = (!bounds.contains(reply.score)).then_some(
                    ScoreAdjustment::Clamped { raw: reply.score },
                );
                Self {
                    kind,
                    value,
                    justification: reply.justification,
                    adjustment,
                }
            }
            Err(error) => Self {
                kind,
                value: 0.0,
                justification: String::new(),
                adjustment: Some(ScoreAdjustment::Discarded {
                    reason: error.to_string(),
                }),
            },
        }
    }

    pub fn is_adjusted(&self) -> bool {
        self.adjustment.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommercializationPotential {
    High,
    Medium,
    Low,
}

impl CommercializationPotential {
    pub fn from_readiness(readiness: f64) -> Self {
        if readiness >= 0.2 {
            Self::High
        } else if readiness >= 0.1 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Market assessment. The total is derived from the sub-scores on construction
/// and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketResult {
    pub patent_id: PatentId,
    pub market_size: SubScore,
    pub growth: SubScore,
    pub commercialization: SubScore,
    total: f64,
    pub commercialization_potential: CommercializationPotential,
    pub application_domains: Vec<String>,
    pub evidence_citations: Vec<String>,
    pub evidence_available: bool,
    pub low_confidence: bool,
}

impl MarketResult {
    pub fn from_sub_scores(
        patent_id: PatentId,
        market_size: SubScore,
        growth: SubScore,
        commercialization: SubScore,
        application_domains: Vec<String>,
        evidence_citations: Vec<String>,
        evidence_available: bool,
    ) -> Self {
        let total = market_size.value + growth.value + commercialization.value;
        let low_confidence = !evidence_available
            || market_size.is_adjusted()
            || growth.is_adjusted()
            || commercialization.is_adjusted();

        Self {
            patent_id,
            commercialization_potential: CommercializationPotential::from_readiness(
                commercialization.value,
            ),
            market_size,
            growth,
            commercialization,
            total,
            application_domains,
            evidence_citations,
            evidence_available,
            low_confidence,
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn sub_scores(&self) -> [&SubScore; 3] {
        [&self.market_size, &self.growth, &self.commercialization]
    }
}

/// Raised when the scoring oracle cannot be reached at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("scoring oracle failed for {kind}: {source}")]
    Oracle {
        kind: SubScoreKind,
        #[source]
        source: ProviderError,
    },
}

pub struct MarketScorer {
    oracle: Arc<dyn ScoringOracle>,
}

impl MarketScorer {
    pub fn new(oracle: Arc<dyn ScoringOracle>) -> Self {
        Self { oracle }
    }

    pub async fn score(
        &self,
        patent_id: &PatentId,
        abstract_text: &str,
        evidence: &EvidenceSet,
    ) -> Result<MarketResult, MarketError> {
        let rendered = evidence.rendered();
        let requests = SubScoreKind::ALL
            .map(|kind| RubricRequest::new(patent_id, kind, abstract_text, rendered.clone()));
        let [size_request, growth_request, readiness_request] = &requests;

        let (market_size, growth, commercialization, domains) = tokio::join!(
            self.sub_score(size_request),
            self.sub_score(growth_request),
            self.sub_score(readiness_request),
            self.oracle.application_domains(abstract_text, evidence),
        );

        let application_domains = match domains {
            Ok(mut domains) => {
                domains.truncate(MAX_APPLICATION_DOMAINS);
                domains
            }
            Err(error) => {
                warn!(patent = %patent_id, %error, "application domain lookup failed");
                Vec::new()
            }
        };

        let result = MarketResult::from_sub_scores(
            patent_id.clone(),
            market_size?,
            growth?,
            commercialization?,
            application_domains,
            evidence.citations(),
            !evidence.is_empty(),
        );

        debug!(
            patent = %patent_id,
            total = result.total(),
            low_confidence = result.low_confidence,
            "market scored"
        );
        Ok(result)
    }

    async fn sub_score(&self, request: &RubricRequest) -> Result<SubScore, MarketError> {
        let raw = self
            .oracle
            .score(request)
            .await
            .map_err(|source| MarketError::Oracle {
                kind: request.kind,
                source,
            })?;

        let sub_score = SubScore::from_reply(request.kind, &raw);
        if let Some(adjustment) = &sub_score.adjustment {
            warn!(
                patent = %request.patent_id,
                kind = %request.kind,
                ?adjustment,
                "oracle reply adjusted"
            );
        }
        Ok(sub_score)
    }
}
