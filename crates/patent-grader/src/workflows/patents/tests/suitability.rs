use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::workflows::patents::citations::ClassificationDistribution;
use crate::workflows::patents::domain::{ClassificationCode, Grade, PatentId};
use crate::workflows::patents::market::{MarketResult, SubScore, SubScoreKind};
use crate::workflows::patents::originality::{OriginalityResult, OriginalityScorer};
use crate::workflows::patents::suitability::{
    CaveatJudge, JudgeStatus, SuitabilityAggregator, SuitabilityCaveat,
};

fn originality(codes: &[&str]) -> OriginalityResult {
    OriginalityScorer.score(
        &PatentId::new("US-1"),
        ClassificationDistribution::from_codes(codes.iter().map(ClassificationCode::new)),
    )
}

fn market(size: f64, growth: f64, readiness: f64, evidence_available: bool) -> MarketResult {
    let reply = |kind: SubScoreKind, score: f64| {
        SubScore::from_reply(
            kind,
            &json!({ "score": score, "justification": "fixture" }).to_string(),
        )
    };
    MarketResult::from_sub_scores(
        PatentId::new("US-1"),
        reply(SubScoreKind::MarketSize, size),
        reply(SubScoreKind::Growth, growth),
        reply(SubScoreKind::Commercialization, readiness),
        Vec::new(),
        Vec::new(),
        evidence_available,
    )
}

#[tokio::test]
async fn worked_example_grades_a() {
    let aggregator = SuitabilityAggregator::new(None);

    let result = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_close(result.originality_score, 0.625);
    assert_close(result.market_score, 0.80);
    assert_close(result.weighted_score, 0.70375);
    assert_close(result.breakdown.originality_contribution, 0.34375);
    assert_close(result.breakdown.market_contribution, 0.36);
    assert_eq!(result.grade, Grade::A);
    assert_eq!(result.judge, JudgeStatus::Skipped);
    assert!(result.caveats.is_empty());
    assert!(result.rationale.starts_with("Grade A (strong)"));
}

#[tokio::test]
async fn insufficient_originality_counts_as_zero_with_caveat() {
    let aggregator = SuitabilityAggregator::new(None);

    let result = aggregator
        .evaluate(&originality(&[]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_close(result.originality_score, 0.0);
    assert_close(result.weighted_score, 0.36);
    assert_eq!(result.grade, Grade::D);
    assert_eq!(
        result.caveats,
        vec![SuitabilityCaveat::OriginalityInsufficientData]
    );
}

#[tokio::test]
async fn low_confidence_market_is_caveated() {
    let aggregator = SuitabilityAggregator::new(None);

    let result = aggregator
        .evaluate(&originality(&["A", "B"]), &market(0.1, 0.1, 0.1, false))
        .await;

    assert_eq!(result.caveats, vec![SuitabilityCaveat::MarketLowConfidence]);
}

#[tokio::test]
async fn judge_grade_is_recorded_beside_computed_grade() {
    let judge = Arc::new(ScriptedJudge::replying(
        r#"{"suitability_grade": "B", "suitability_rationale": "Crowded field.", "confidence_score": 0.6}"#,
    ));
    let aggregator = SuitabilityAggregator::new(Some(judge.clone()));

    let result = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_eq!(result.grade, Grade::A);
    assert_eq!(result.revised_grade, Some(Grade::B));
    assert_eq!(result.judge_override(), Some(Grade::B));
    assert_eq!(result.judge, JudgeStatus::Accepted);
    assert_eq!(result.rationale, "Crowded field.");
    assert_eq!(judge.call_count(), 1);

    let calls = judge.calls.lock().expect("judge calls mutex poisoned");
    assert_eq!(calls[0].grade, Grade::A);
    assert_close(calls[0].weighted_score, 0.70375);
}

#[tokio::test]
async fn agreeing_judge_is_not_an_override() {
    let judge = Arc::new(ScriptedJudge::replying(r#"{"grade": "Grade A"}"#));
    let aggregator = SuitabilityAggregator::new(Some(judge));

    let result = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_eq!(result.revised_grade, Some(Grade::A));
    assert_eq!(result.judge_override(), None);
    assert!(result.rationale.starts_with("Grade A"));
}

#[tokio::test]
async fn unavailable_judge_keeps_computed_result() {
    let aggregator = SuitabilityAggregator::new(Some(Arc::new(ScriptedJudge::unavailable())));

    let result = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_eq!(result.grade, Grade::A);
    assert_eq!(result.revised_grade, None);
    assert!(matches!(result.judge, JudgeStatus::Unavailable(_)));
}

#[tokio::test]
async fn unparseable_judge_reply_is_ignored() {
    let aggregator = SuitabilityAggregator::new(Some(Arc::new(ScriptedJudge::replying(
        "I would rate this highly.",
    ))));

    let result = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;

    assert_eq!(result.grade, Grade::A);
    assert_eq!(result.revised_grade, None);
    assert!(matches!(result.judge, JudgeStatus::Unparseable(_)));
}

#[tokio::test]
async fn caveat_judge_marks_down_caveated_inputs() {
    let aggregator = SuitabilityAggregator::new(Some(Arc::new(CaveatJudge)));

    let clean = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, true))
        .await;
    assert_eq!(clean.revised_grade, Some(Grade::A));

    let caveated = aggregator
        .evaluate(&originality(&["A", "A", "B", "C"]), &market(0.35, 0.25, 0.20, false))
        .await;
    assert_eq!(caveated.grade, Grade::A);
    assert_eq!(caveated.revised_grade, Some(Grade::B));
    assert_eq!(caveated.judge_override(), Some(Grade::B));
}
