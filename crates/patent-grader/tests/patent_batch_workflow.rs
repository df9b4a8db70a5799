use std::sync::Arc;

use async_trait::async_trait;
use patent_grader::workflows::fixtures::{
    load_corpus, FixtureCitationLookup, FixturePatentSource,
};
use patent_grader::workflows::patents::suitability::grade_for;
use patent_grader::workflows::patents::{
    BatchReport, BatchRequest, CaveatJudge, Collaborators, CountryCode, EvidenceHeuristicOracle,
    PipelineOrchestrator, PipelineSettings, ProviderError, Snippet, WebSearch,
};
use tokio_util::sync::CancellationToken;

const PATENTS: &[u8] = include_bytes!("../fixtures/patents.csv");
const CITATIONS: &[u8] = include_bytes!("../fixtures/citations.csv");
const CORPUS: &[u8] = include_bytes!("../fixtures/corpus.csv");

struct OfflineWeb;

#[async_trait]
impl WebSearch for OfflineWeb {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<Snippet>, ProviderError> {
        Ok(Vec::new())
    }
}

fn orchestrator(judge: bool) -> PipelineOrchestrator {
    let corpus = Arc::new(load_corpus(CORPUS).expect("corpus fixture loads"));
    let collaborators = Collaborators {
        patents: Arc::new(FixturePatentSource::from_reader(PATENTS).expect("patent fixture loads")),
        citations: Arc::new(
            FixtureCitationLookup::from_reader(CITATIONS).expect("citation fixture loads"),
        ),
        semantic: corpus.clone(),
        lexical: corpus,
        web: Arc::new(OfflineWeb),
        scoring: Arc::new(EvidenceHeuristicOracle::with_reference_year(2025)),
        judge: judge.then(|| Arc::new(CaveatJudge) as _),
    };
    PipelineOrchestrator::new(collaborators, PipelineSettings::default())
}

fn request() -> BatchRequest {
    BatchRequest {
        query: "solid-state battery".to_string(),
        countries: ["US", "KR", "JP"].iter().map(CountryCode::new).collect(),
        top_n_per_country: 3,
    }
}

#[test]
fn fixtures_load_from_csv_exports() {
    let patents = FixturePatentSource::from_reader(PATENTS).expect("patent fixture loads");
    let citations = FixtureCitationLookup::from_reader(CITATIONS).expect("citation fixture loads");
    let corpus = load_corpus(CORPUS).expect("corpus fixture loads");

    assert_eq!(patents.len(), 9);
    assert_eq!(citations.len(), 12);
    assert_eq!(corpus.len(), 4);
}

#[tokio::test]
async fn offline_batch_scores_every_matching_patent() {
    let outcome = orchestrator(false)
        .run_batch(&request(), CancellationToken::new())
        .await
        .expect("batch runs");

    assert_eq!(outcome.records.len(), 8);
    assert!(outcome
        .records
        .iter()
        .all(|record| record.patent_id().as_str() != "US-11688001-B1"));
    assert!(outcome.records.iter().all(|record| record.is_done()));

    for record in &outcome.records {
        let market = record.market.as_ref().expect("market scored");
        assert!((0.0..=1.0).contains(&market.total()));
        let summed: f64 = market.sub_scores().iter().map(|sub| sub.value).sum();
        assert!((market.total() - summed).abs() < 1e-9);

        let suitability = record.suitability.as_ref().expect("suitability scored");
        assert!((0.0..=1.0).contains(&suitability.weighted_score));
        assert_eq!(suitability.grade, grade_for(suitability.weighted_score));
        assert_eq!(suitability.revised_grade, None);
    }

    let cooling_plate = outcome
        .records
        .iter()
        .find(|record| record.patent_id().as_str() == "KR-102511042-B1")
        .expect("cooling plate patent matched");
    assert!(cooling_plate
        .originality
        .as_ref()
        .is_some_and(|result| result.is_insufficient()));

    let thermal_barrier = outcome
        .records
        .iter()
        .find(|record| record.patent_id().as_str() == "US-11755320-B2")
        .expect("thermal barrier patent matched");
    let originality = thermal_barrier.originality.as_ref().expect("scored");
    assert_eq!(originality.stats.unique_codes, 2);
    assert!((originality.score().expect("scored") - (1.0 - (4.0 + 1.0) / 9.0)).abs() < 1e-9);
}

#[tokio::test]
async fn report_compares_countries_with_the_baseline() {
    let outcome = orchestrator(true)
        .run_batch(&request(), CancellationToken::new())
        .await
        .expect("batch runs");

    let report = BatchReport::from_outcome(&outcome, &CountryCode::new("KR"));

    assert_eq!(report.tally.total, 8);
    assert_eq!(report.countries.len(), 3);
    assert_eq!(report.grades.total(), 8);
    assert_eq!(report.insufficient_data, 1);

    let analysis = report.gap_analysis.expect("baseline scored");
    let compared: Vec<&str> = analysis
        .gaps
        .iter()
        .map(|gap| gap.country.as_str())
        .collect();
    assert_eq!(compared.len(), 2);
    assert!(compared.contains(&"US") && compared.contains(&"JP"));
    assert!(analysis
        .gaps
        .windows(2)
        .all(|pair| pair[0].overall_gap >= pair[1].overall_gap));

    assert!(report
        .records
        .windows(2)
        .all(|pair| pair[0].weighted_score >= pair[1].weighted_score));
    assert!(report
        .records
        .iter()
        .all(|view| view.revised_grade.is_some()));
}
