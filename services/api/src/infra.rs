use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use patent_grader::config::{AppConfig, FixtureConfig};
use patent_grader::error::AppError;
use patent_grader::workflows::fixtures::{
    load_corpus, load_corpus_path, FixtureCitationLookup, FixtureImportError, FixturePatentSource,
};
use patent_grader::workflows::patents::{
    BatchDefaults, BatchId, BatchRepository, CaveatJudge, Collaborators, EvidenceHeuristicOracle,
    JudgeOracle, PatentEvaluationService, PipelineOrchestrator, ProviderError, ReferenceCorpus,
    RepositoryError, Snippet, StoredBatch, WebSearch,
};
use tracing::info;

const BUNDLED_PATENTS: &[u8] = include_bytes!("../../../crates/patent-grader/fixtures/patents.csv");
const BUNDLED_CITATIONS: &[u8] =
    include_bytes!("../../../crates/patent-grader/fixtures/citations.csv");
const BUNDLED_CORPUS: &[u8] = include_bytes!("../../../crates/patent-grader/fixtures/corpus.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local batch store; newest batches are listed first.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBatchRepository {
    batches: Arc<Mutex<Vec<StoredBatch>>>,
}

impl InMemoryBatchRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredBatch>>, RepositoryError> {
        self.batches
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl BatchRepository for InMemoryBatchRepository {
    fn insert(&self, batch: StoredBatch) -> Result<StoredBatch, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.iter().any(|existing| existing.id == batch.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(batch.clone());
        Ok(batch)
    }

    fn fetch(&self, id: &BatchId) -> Result<Option<StoredBatch>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.iter().find(|batch| &batch.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredBatch>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Stands in for web search by querying the reference corpus lexically.
pub(crate) struct CorpusWebSearch {
    corpus: Arc<ReferenceCorpus>,
}

impl CorpusWebSearch {
    pub(crate) fn new(corpus: Arc<ReferenceCorpus>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl WebSearch for CorpusWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Snippet>, ProviderError> {
        Ok(self
            .corpus
            .bm25(query, max_results)
            .into_iter()
            .map(|document| Snippet {
                title: document.source.clone(),
                url: format!("corpus://{}", document.source),
                content: document.content,
            })
            .collect())
    }
}

/// Offline collaborators: CSV exports when configured, bundled samples otherwise.
pub(crate) struct OfflineFixtures {
    pub(crate) patents: FixturePatentSource,
    pub(crate) citations: FixtureCitationLookup,
    pub(crate) corpus: ReferenceCorpus,
}

impl OfflineFixtures {
    pub(crate) fn load(config: &FixtureConfig) -> Result<Self, FixtureImportError> {
        let patents = match config.patents_csv.as_deref() {
            Some(path) => FixturePatentSource::from_path(path)?,
            None => FixturePatentSource::from_reader(BUNDLED_PATENTS)?,
        };
        let citations = match config.citations_csv.as_deref() {
            Some(path) => FixtureCitationLookup::from_path(path)?,
            None => FixtureCitationLookup::from_reader(BUNDLED_CITATIONS)?,
        };
        let corpus = match config.corpus_csv.as_deref() {
            Some(path) => load_corpus_path(path)?,
            None => load_corpus(BUNDLED_CORPUS)?,
        };

        info!(
            patents = patents.len(),
            citations = citations.len(),
            corpus = corpus.len(),
            source = source_label(config.patents_csv.as_deref()),
            "offline fixtures loaded"
        );

        Ok(Self {
            patents,
            citations,
            corpus,
        })
    }

    pub(crate) fn into_collaborators(self, judge_enabled: bool) -> Collaborators {
        let corpus = Arc::new(self.corpus);
        let judge: Option<Arc<dyn JudgeOracle>> = if judge_enabled {
            Some(Arc::new(CaveatJudge))
        } else {
            None
        };

        Collaborators {
            patents: Arc::new(self.patents),
            citations: Arc::new(self.citations),
            semantic: corpus.clone(),
            lexical: corpus.clone(),
            web: Arc::new(CorpusWebSearch::new(corpus)),
            scoring: Arc::new(EvidenceHeuristicOracle::new()),
            judge,
        }
    }
}

fn source_label(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| "bundled".to_string())
}

pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<Arc<PatentEvaluationService<InMemoryBatchRepository>>, AppError> {
    let fixtures = OfflineFixtures::load(&config.fixtures)?;
    let collaborators = fixtures.into_collaborators(config.pipeline.judge_enabled);
    let orchestrator = PipelineOrchestrator::new(collaborators, config.pipeline.settings());

    let defaults = BatchDefaults {
        countries: config.pipeline.countries.clone(),
        top_n_per_country: config.pipeline.patents_per_country,
        baseline: config.pipeline.baseline_country.clone(),
    };

    Ok(Arc::new(PatentEvaluationService::new(
        Arc::new(orchestrator),
        Arc::new(InMemoryBatchRepository::default()),
        defaults,
    )))
}
