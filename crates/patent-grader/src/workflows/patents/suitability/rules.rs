use serde::{Deserialize, Serialize};

use super::config::{GRADE_BANDS, MARKET_WEIGHT, ORIGINALITY_WEIGHT};
use crate::workflows::patents::domain::Grade;

/// Weighted contributions kept for audit next to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub originality_weight: f64,
    pub originality_contribution: f64,
    pub market_weight: f64,
    pub market_contribution: f64,
}

pub(crate) fn weighted_score(originality: f64, market: f64) -> (f64, ScoreBreakdown) {
    let originality_contribution = ORIGINALITY_WEIGHT * originality;
    let market_contribution = MARKET_WEIGHT * market;

    let breakdown = ScoreBreakdown {
        originality_weight: ORIGINALITY_WEIGHT,
        originality_contribution,
        market_weight: MARKET_WEIGHT,
        market_contribution,
    };

    (originality_contribution + market_contribution, breakdown)
}

/// Total over the reals: anything above 1.0 is S, anything below 0 (or NaN) is D.
pub fn grade_for(score: f64) -> Grade {
    GRADE_BANDS
        .iter()
        .find(|band| score >= band.lower)
        .map(|band| band.grade)
        .unwrap_or(Grade::D)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_inclusive_on_the_lower_side() {
        assert_eq!(grade_for(1.0), Grade::S);
        assert_eq!(grade_for(0.85), Grade::S);
        assert_eq!(grade_for(0.849_999), Grade::A);
        assert_eq!(grade_for(0.70), Grade::A);
        assert_eq!(grade_for(0.55), Grade::B);
        assert_eq!(grade_for(0.40), Grade::C);
        assert_eq!(grade_for(0.399_999), Grade::D);
        assert_eq!(grade_for(0.0), Grade::D);
    }

    #[test]
    fn every_score_in_range_maps_to_exactly_one_band() {
        for step in 0..=10_000 {
            let score = f64::from(step) / 10_000.0;
            let matching: Vec<Grade> = GRADE_BANDS
                .iter()
                .enumerate()
                .filter(|&(index, band)| {
                    let upper = if index == 0 {
                        f64::INFINITY
                    } else {
                        GRADE_BANDS[index - 1].lower
                    };
                    score >= band.lower && score < upper
                })
                .map(|(_, band)| band.grade)
                .collect();
            assert_eq!(matching, vec![grade_for(score)], "score {score}");
        }
    }

    #[test]
    fn weighted_score_uses_fixed_weights() {
        let (score, breakdown) = weighted_score(0.625, 0.80);
        assert!((score - 0.70375).abs() < 1e-9);
        assert!((breakdown.originality_contribution - 0.34375).abs() < 1e-9);
        assert!((breakdown.market_contribution - 0.36).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_scores_still_grade() {
        assert_eq!(grade_for(1.2), Grade::S);
        assert_eq!(grade_for(-0.1), Grade::D);
        assert_eq!(grade_for(f64::NAN), Grade::D);
    }
}
