use std::fmt;

use serde::{Deserialize, Serialize};

use crate::workflows::patents::domain::PatentId;

/// The three bounded market sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubScoreKind {
    MarketSize,
    Growth,
    Commercialization,
}

impl SubScoreKind {
    pub const ALL: [SubScoreKind; 3] = [
        SubScoreKind::MarketSize,
        SubScoreKind::Growth,
        SubScoreKind::Commercialization,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SubScoreKind::MarketSize => "market_size",
            SubScoreKind::Growth => "growth_potential",
            SubScoreKind::Commercialization => "commercialization_readiness",
        }
    }

    pub const fn bounds(self) -> RubricBounds {
        match self {
            SubScoreKind::MarketSize => RubricBounds::new(0.0, 0.4),
            SubScoreKind::Growth | SubScoreKind::Commercialization => RubricBounds::new(0.0, 0.3),
        }
    }

    /// Bucket table handed to the oracle, strongest signal first.
    pub const fn buckets(self) -> &'static [RubricBucket] {
        match self {
            SubScoreKind::MarketSize => MARKET_SIZE_BUCKETS,
            SubScoreKind::Growth => GROWTH_BUCKETS,
            SubScoreKind::Commercialization => READINESS_BUCKETS,
        }
    }
}

impl fmt::Display for SubScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricBounds {
    pub min: f64,
    pub max: f64,
}

impl RubricBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// One row of a bucket table: a signal band and the sub-range it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RubricBucket {
    pub signal: &'static str,
    pub min: f64,
    pub max: f64,
}

const fn bucket(signal: &'static str, min: f64, max: f64) -> RubricBucket {
    RubricBucket { signal, min, max }
}

pub(crate) const MARKET_SIZE_BUCKETS: &[RubricBucket] = &[
    bucket("serviceable market of $10B or more", 0.35, 0.40),
    bucket("serviceable market of $3B to $10B", 0.25, 0.35),
    bucket("serviceable market of $1B to $3B", 0.15, 0.25),
    bucket("serviceable market of $300M to $1B", 0.10, 0.15),
    bucket("serviceable market below $300M", 0.0, 0.10),
];

pub(crate) const GROWTH_BUCKETS: &[RubricBucket] = &[
    bucket("CAGR of 25% or more", 0.25, 0.30),
    bucket("CAGR of 20% to 25%", 0.20, 0.25),
    bucket("CAGR of 15% to 20%", 0.15, 0.20),
    bucket("CAGR of 10% to 15%", 0.10, 0.15),
    bucket("CAGR below 10%", 0.0, 0.10),
];

pub(crate) const READINESS_BUCKETS: &[RubricBucket] = &[
    bucket("market entry within 1 year", 0.25, 0.30),
    bucket("market entry in 1 to 2 years", 0.20, 0.25),
    bucket("market entry in 2 to 3 years", 0.15, 0.20),
    bucket("market entry in 3 to 5 years", 0.10, 0.15),
    bucket("market entry beyond 5 years", 0.0, 0.10),
];

/// Context sent to the scoring oracle for one sub-score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricRequest {
    pub patent_id: PatentId,
    pub kind: SubScoreKind,
    pub bounds: RubricBounds,
    pub buckets: &'static [RubricBucket],
    pub abstract_text: String,
    pub evidence: Vec<String>,
    pub evidence_available: bool,
}

impl RubricRequest {
    pub fn new(
        patent_id: &PatentId,
        kind: SubScoreKind,
        abstract_text: &str,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            patent_id: patent_id.clone(),
            kind,
            bounds: kind.bounds(),
            buckets: kind.buckets(),
            abstract_text: abstract_text.to_string(),
            evidence_available: !evidence.is_empty(),
            evidence,
        }
    }
}

/// Parsed oracle answer before bounds enforcement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RubricReply {
    #[serde(alias = "sub_score", alias = "value")]
    pub score: f64,
    #[serde(default, alias = "rationale", alias = "reason")]
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("reply contains no JSON object")]
    MissingObject,
    #[error("reply is not valid rubric JSON: {0}")]
    Invalid(String),
    #[error("reply score is not a finite number")]
    NonFinite,
}

/// Extracts the first JSON object from an oracle reply, tolerating code fences.
pub fn parse_reply(raw: &str) -> Result<RubricReply, ReplyError> {
    let body = json_object(raw).ok_or(ReplyError::MissingObject)?;
    let reply: RubricReply =
        serde_json::from_str(body).map_err(|error| ReplyError::Invalid(error.to_string()))?;

    if !reply.score.is_finite() {
        return Err(ReplyError::NonFinite);
    }
    Ok(reply)
}

pub(crate) fn json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
