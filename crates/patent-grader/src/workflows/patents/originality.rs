use serde::{Deserialize, Serialize};

use super::citations::{ClassificationDistribution, ClassifiedCitations};
use super::domain::PatentId;

/// Either a concentration-complement score or an explicit lack of data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OriginalityOutcome {
    Scored { score: f64 },
    InsufficientData,
}

impl OriginalityOutcome {
    pub fn score(self) -> Option<f64> {
        match self {
            OriginalityOutcome::Scored { score } => Some(score),
            OriginalityOutcome::InsufficientData => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalityStats {
    pub total_codes: u64,
    pub unique_codes: usize,
    pub citations_analyzed: usize,
    pub unresolved_citations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalityResult {
    pub patent_id: PatentId,
    pub outcome: OriginalityOutcome,
    pub distribution: ClassificationDistribution,
    pub sample_size: u64,
    pub stats: OriginalityStats,
}

impl OriginalityResult {
    pub fn score(&self) -> Option<f64> {
        self.outcome.score()
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self.outcome, OriginalityOutcome::InsufficientData)
    }
}

/// `1 - Σ p²` over the code proportions, or `None` for an empty distribution.
pub fn originality_index(distribution: &ClassificationDistribution) -> Option<f64> {
    let total = distribution.total();
    if total == 0 {
        return None;
    }

    let total = total as f64;
    let concentration: f64 = distribution
        .iter()
        .map(|(_, count)| {
            let share = count as f64 / total;
            share * share
        })
        .sum();

    Some((1.0 - concentration).clamp(0.0, 1.0))
}

/// Pure scorer; holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalityScorer;

impl OriginalityScorer {
    pub fn score(
        &self,
        patent_id: &PatentId,
        distribution: ClassificationDistribution,
    ) -> OriginalityResult {
        let total = distribution.total();
        let stats = OriginalityStats {
            total_codes: total,
            unique_codes: distribution.unique_codes(),
            citations_analyzed: total as usize,
            unresolved_citations: 0,
        };
        self.build(patent_id, distribution, stats)
    }

    /// Scores a classification pass, carrying its citation tallies into the stats.
    pub fn score_classified(
        &self,
        patent_id: &PatentId,
        classified: ClassifiedCitations,
    ) -> OriginalityResult {
        let stats = OriginalityStats {
            total_codes: classified.distribution.total(),
            unique_codes: classified.distribution.unique_codes(),
            citations_analyzed: classified.considered,
            unresolved_citations: classified.unresolved_count(),
        };
        self.build(patent_id, classified.distribution, stats)
    }

    fn build(
        &self,
        patent_id: &PatentId,
        distribution: ClassificationDistribution,
        stats: OriginalityStats,
    ) -> OriginalityResult {
        let outcome = match originality_index(&distribution) {
            Some(score) => OriginalityOutcome::Scored { score },
            None => OriginalityOutcome::InsufficientData,
        };

        OriginalityResult {
            patent_id: patent_id.clone(),
            outcome,
            sample_size: distribution.total(),
            distribution,
            stats,
        }
    }
}
