use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::workflows::patents::collaborators::{
    CitationLookup, JudgeOracle, LexicalRetriever, PatentSource, ProviderError, ScoringOracle,
    SemanticRetriever, WebSearch,
};
use crate::workflows::patents::domain::{
    CitationId, ClassificationCode, CountryCode, Document, Patent, PatentId, Snippet,
};
use crate::workflows::patents::market::{RubricRequest, SubScoreKind};
use crate::workflows::patents::pipeline::{Collaborators, PipelineOrchestrator, PipelineSettings};
use crate::workflows::patents::repository::{
    BatchId, BatchRepository, RepositoryError, StoredBatch,
};
use crate::workflows::patents::service::{BatchDefaults, PatentEvaluationService};
use crate::workflows::patents::suitability::JudgeRequest;

pub(super) fn patent(id: &str, country: &str, citations: &[&str]) -> Patent {
    Patent {
        id: PatentId::new(id),
        title: format!("Solid-state battery electrolyte {id}"),
        abstract_text: "A sulfide solid electrolyte improves battery cell safety and \
            energy density for electric vehicle packs."
            .to_string(),
        country: CountryCode::new(country),
        filing_date: None,
        publication_date: None,
        assignee: Some("Example Energy".to_string()),
        citations: citations.iter().map(|id| CitationId::new(*id)).collect(),
    }
}

/// Country-keyed search results; unknown countries return no patents.
#[derive(Default)]
pub(super) struct StaticSource {
    hits: HashMap<CountryCode, Result<Vec<Patent>, ProviderError>>,
}

impl StaticSource {
    pub(super) fn with(mut self, country: &str, patents: Vec<Patent>) -> Self {
        self.hits.insert(CountryCode::new(country), Ok(patents));
        self
    }

    pub(super) fn failing(mut self, country: &str) -> Self {
        self.hits.insert(
            CountryCode::new(country),
            Err(ProviderError::Unavailable("search backend offline".to_string())),
        );
        self
    }
}

#[async_trait]
impl PatentSource for StaticSource {
    async fn search(
        &self,
        _query: &str,
        country: &CountryCode,
        top_n: usize,
    ) -> Result<Vec<Patent>, ProviderError> {
        match self.hits.get(country) {
            Some(Ok(patents)) => Ok(patents.iter().take(top_n).cloned().collect()),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// Citation table. The optional trigger cancels the batch when its citation is
/// resolved and then never answers.
#[derive(Default)]
pub(super) struct MapLookup {
    codes: HashMap<CitationId, ClassificationCode>,
    trigger: Option<(CitationId, CancellationToken)>,
    delay: Option<Duration>,
}

impl MapLookup {
    pub(super) fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            codes: entries
                .iter()
                .map(|(citation, code)| (CitationId::new(*citation), ClassificationCode::new(code)))
                .collect(),
            trigger: None,
            delay: None,
        }
    }

    pub(super) fn slowed_by(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn cancelling_on(mut self, citation: &str, token: CancellationToken) -> Self {
        self.trigger = Some((CitationId::new(citation), token));
        self
    }
}

#[async_trait]
impl CitationLookup for MapLookup {
    async fn resolve(
        &self,
        citation: &CitationId,
    ) -> Result<Option<ClassificationCode>, ProviderError> {
        if let Some((trigger, token)) = &self.trigger {
            if trigger == citation {
                token.cancel();
                futures::future::pending::<()>().await;
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.codes.get(citation).cloned())
    }
}

pub(super) struct StaticDocs(pub(super) Vec<Document>);

impl StaticDocs {
    pub(super) fn market_report() -> Self {
        Self(vec![Document {
            source: "battery-outlook.pdf".to_string(),
            content: "The solid-state battery market is projected to reach $8.5 billion \
                by 2030 at a CAGR of 22%."
                .to_string(),
        }])
    }
}

#[async_trait]
impl SemanticRetriever for StaticDocs {
    async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }
}

#[async_trait]
impl LexicalRetriever for StaticDocs {
    async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }
}

pub(super) struct NoWeb;

#[async_trait]
impl WebSearch for NoWeb {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<Snippet>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Oracle answering every rubric with fixed sub-scores.
pub(super) struct ScriptedOracle {
    replies: HashMap<SubScoreKind, Result<String, ProviderError>>,
    failing_for: HashSet<PatentId>,
    domains: Vec<String>,
    stall: Option<(Duration, CancellationToken)>,
}

impl ScriptedOracle {
    pub(super) fn scores(size: f64, growth: f64, readiness: f64) -> Self {
        let reply = |score: f64| Ok(json!({ "score": score, "justification": "scripted" }).to_string());
        Self::raw([reply(size), reply(growth), reply(readiness)])
    }

    pub(super) fn raw(replies: [Result<String, ProviderError>; 3]) -> Self {
        Self {
            replies: SubScoreKind::ALL.into_iter().zip(replies).collect(),
            failing_for: HashSet::new(),
            domains: vec!["Electric vehicles".to_string()],
            stall: None,
        }
    }

    pub(super) fn failing_for(mut self, patent_id: &str) -> Self {
        self.failing_for.insert(PatentId::new(patent_id));
        self
    }

    /// Waits, cancels the batch, then never answers.
    pub(super) fn cancelling_after(mut self, delay: Duration, token: CancellationToken) -> Self {
        self.stall = Some((delay, token));
        self
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn score(&self, request: &RubricRequest) -> Result<String, ProviderError> {
        if let Some((delay, token)) = &self.stall {
            tokio::time::sleep(*delay).await;
            token.cancel();
            futures::future::pending::<()>().await;
        }
        if self.failing_for.contains(&request.patent_id) {
            return Err(ProviderError::Unavailable("oracle timeout".to_string()));
        }
        self.replies
            .get(&request.kind)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::Malformed("no script".to_string())))
    }

    async fn application_domains(
        &self,
        _abstract_text: &str,
        _evidence: &crate::workflows::patents::evidence::EvidenceSet,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(self.domains.clone())
    }
}

/// Judge replaying one canned answer and counting calls.
pub(super) struct ScriptedJudge {
    reply: Result<String, ProviderError>,
    pub(super) calls: Mutex<Vec<JudgeRequest>>,
}

impl ScriptedJudge {
    pub(super) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn unavailable() -> Self {
        Self {
            reply: Err(ProviderError::Unavailable("judge offline".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("judge calls mutex poisoned").len()
    }
}

#[async_trait]
impl JudgeOracle for ScriptedJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .expect("judge calls mutex poisoned")
            .push(request.clone());
        self.reply.clone()
    }
}

pub(super) fn settings(workers: usize) -> PipelineSettings {
    PipelineSettings {
        workers,
        ..PipelineSettings::default()
    }
}

pub(super) fn collaborators(
    source: StaticSource,
    lookup: MapLookup,
    oracle: ScriptedOracle,
    judge: Option<Arc<dyn JudgeOracle>>,
) -> Collaborators {
    let docs = Arc::new(StaticDocs::market_report());
    Collaborators {
        patents: Arc::new(source),
        citations: Arc::new(lookup),
        semantic: docs.clone(),
        lexical: docs,
        web: Arc::new(NoWeb),
        scoring: Arc::new(oracle),
        judge,
    }
}

pub(super) fn orchestrator(
    source: StaticSource,
    lookup: MapLookup,
    oracle: ScriptedOracle,
    workers: usize,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(collaborators(source, lookup, oracle, None), settings(workers))
}

/// Two US patents and one KR patent with distinct citation mixes.
pub(super) fn sample_source() -> StaticSource {
    StaticSource::default()
        .with(
            "US",
            vec![
                patent("US-1", "US", &["C1", "C2", "C3", "C4"]),
                patent("US-2", "US", &["C1", "C1"]),
            ],
        )
        .with("KR", vec![patent("KR-1", "KR", &["C1", "C2"])])
}

pub(super) fn sample_lookup() -> MapLookup {
    MapLookup::new(&[("C1", "H01M"), ("C2", "H01M"), ("C3", "C01B"), ("C4", "B60L")])
}

pub(super) fn defaults() -> BatchDefaults {
    BatchDefaults {
        countries: vec![CountryCode::new("US"), CountryCode::new("KR")],
        top_n_per_country: 3,
        baseline: CountryCode::new("KR"),
    }
}

pub(super) fn service_with<R>(repository: Arc<R>) -> PatentEvaluationService<R>
where
    R: BatchRepository + 'static,
{
    let orchestrator = orchestrator(
        sample_source(),
        sample_lookup(),
        ScriptedOracle::scores(0.35, 0.25, 0.20),
        2,
    );
    PatentEvaluationService::new(Arc::new(orchestrator), repository, defaults())
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    batches: Mutex<Vec<StoredBatch>>,
}

impl BatchRepository for MemoryRepository {
    fn insert(&self, batch: StoredBatch) -> Result<StoredBatch, RepositoryError> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| RepositoryError::Unavailable("mutex poisoned".to_string()))?;
        if batches.iter().any(|existing| existing.id == batch.id) {
            return Err(RepositoryError::Conflict);
        }
        batches.push(batch.clone());
        Ok(batch)
    }

    fn fetch(&self, id: &BatchId) -> Result<Option<StoredBatch>, RepositoryError> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| RepositoryError::Unavailable("mutex poisoned".to_string()))?;
        Ok(batches.iter().find(|batch| &batch.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredBatch>, RepositoryError> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| RepositoryError::Unavailable("mutex poisoned".to_string()))?;
        Ok(batches.iter().rev().take(limit).cloned().collect())
    }
}

pub(super) struct UnavailableRepository;

impl BatchRepository for UnavailableRepository {
    fn insert(&self, _batch: StoredBatch) -> Result<StoredBatch, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &BatchId) -> Result<Option<StoredBatch>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<StoredBatch>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
