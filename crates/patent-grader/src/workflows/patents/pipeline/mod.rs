//! Batch orchestration: per-patent state machine over a bounded worker pool.

mod record;

pub use record::{
    FailureReason, PipelineRecord, PipelineStage, RecordStatus, StageFailure, StageName,
    StageTransition,
};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::citations::CitationClassifier;
use super::collaborators::{
    CitationLookup, JudgeOracle, LexicalRetriever, PatentSource, ScoringOracle,
    SemanticRetriever, WebSearch,
};
use super::domain::{CountryCode, Patent, PatentId};
use super::evidence::{EvidenceAggregator, EvidenceSettings};
use super::market::{MarketError, MarketResult, MarketScorer};
use super::originality::{OriginalityResult, OriginalityScorer};
use super::suitability::SuitabilityAggregator;

/// Runtime knobs for one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub max_citations: Option<usize>,
    pub retrieval_top_k: usize,
    pub web_results_per_query: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            max_citations: Some(5),
            retrieval_top_k: 4,
            web_results_per_query: 2,
        }
    }
}

/// External providers wired into the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub patents: Arc<dyn PatentSource>,
    pub citations: Arc<dyn CitationLookup>,
    pub semantic: Arc<dyn SemanticRetriever>,
    pub lexical: Arc<dyn LexicalRetriever>,
    pub web: Arc<dyn WebSearch>,
    pub scoring: Arc<dyn ScoringOracle>,
    pub judge: Option<Arc<dyn JudgeOracle>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub query: String,
    pub countries: Vec<CountryCode>,
    pub top_n_per_country: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus {
    Found { patents: usize },
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountrySearch {
    pub country: CountryCode,
    #[serde(flatten)]
    pub status: SearchStatus,
}

/// Everything a batch produced, records in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub query: String,
    pub searches: Vec<CountrySearch>,
    pub records: Vec<PipelineRecord>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Input contract violations; the only batch-fatal errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("patent at position {position} has no identifier")]
    MissingIdentifier { position: usize },
    #[error("patent {0} appears more than once in the batch")]
    DuplicateIdentifier(PatentId),
}

pub struct PipelineOrchestrator {
    patents: Arc<dyn PatentSource>,
    pipeline: Arc<PatentPipeline>,
    workers: usize,
}

impl PipelineOrchestrator {
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        let evidence = EvidenceAggregator::new(
            collaborators.semantic,
            collaborators.lexical,
            collaborators.web,
            EvidenceSettings {
                top_k: settings.retrieval_top_k,
                web_results_per_query: settings.web_results_per_query,
                ..EvidenceSettings::default()
            },
        );

        let pipeline = PatentPipeline {
            classifier: CitationClassifier::new(collaborators.citations, settings.max_citations),
            originality: OriginalityScorer,
            evidence,
            market: MarketScorer::new(collaborators.scoring),
            suitability: SuitabilityAggregator::new(collaborators.judge),
        };

        Self {
            patents: collaborators.patents,
            pipeline: Arc::new(pipeline),
            workers: settings.workers.max(1),
        }
    }

    /// Searches every country, then scores the combined patent list.
    pub async fn run_batch(
        &self,
        request: &BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, BatchError> {
        let started_at = Utc::now();
        info!(
            query = %request.query,
            countries = request.countries.len(),
            top_n = request.top_n_per_country,
            "batch started"
        );

        let mut searches = Vec::with_capacity(request.countries.len());
        let mut patents = Vec::new();
        let mut seen = HashSet::new();

        for country in &request.countries {
            if cancel.is_cancelled() {
                searches.push(CountrySearch {
                    country: country.clone(),
                    status: SearchStatus::Cancelled,
                });
                continue;
            }

            let found = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                found = self.patents.search(
                    &request.query,
                    country,
                    request.top_n_per_country,
                ) => Some(found),
            };

            let status = match found {
                None => SearchStatus::Cancelled,
                Some(Ok(found)) => {
                    let mut accepted = 0;
                    for (offset, patent) in found.into_iter().enumerate() {
                        if patent.id.is_blank() {
                            return Err(BatchError::MissingIdentifier {
                                position: patents.len() + offset,
                            });
                        }
                        if seen.insert(patent.id.clone()) {
                            patents.push(patent);
                            accepted += 1;
                        } else {
                            debug!(patent = %patent.id, %country, "duplicate search hit skipped");
                        }
                    }
                    SearchStatus::Found { patents: accepted }
                }
                Some(Err(error)) => {
                    warn!(%country, %error, "patent search failed");
                    SearchStatus::Failed {
                        message: error.to_string(),
                    }
                }
            };

            searches.push(CountrySearch {
                country: country.clone(),
                status,
            });
        }

        let records = self.run_patents(&request.query, patents, cancel.clone()).await?;

        let outcome = BatchOutcome {
            query: request.query.clone(),
            searches,
            records,
            cancelled: cancel.is_cancelled(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            query = %outcome.query,
            records = outcome.records.len(),
            cancelled = outcome.cancelled,
            "batch finished"
        );
        Ok(outcome)
    }

    /// Scores an explicit patent list. Returns one record per patent, in input order.
    pub async fn run_patents(
        &self,
        keyword: &str,
        patents: Vec<Patent>,
        cancel: CancellationToken,
    ) -> Result<Vec<PipelineRecord>, BatchError> {
        validate(&patents)?;

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let keyword: Arc<str> = Arc::from(keyword);
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<PipelineRecord>> = Vec::with_capacity(patents.len());
        let mut inputs = Vec::with_capacity(patents.len());

        for (index, patent) in patents.into_iter().enumerate() {
            inputs.push(patent.clone());
            slots.push(None);

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                let mut record = PipelineRecord::start(patent);
                record.cancel();
                slots[index] = Some(record);
                continue;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let keyword = Arc::clone(&keyword);
            let token = cancel.clone();
            tasks.spawn(async move {
                let record = pipeline.run(patent, &keyword, token).await;
                drop(permit);
                (index, record)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record)) => slots[index] = Some(record),
                Err(error) => warn!(%error, "pipeline worker stopped"),
            }
        }

        let records = slots
            .into_iter()
            .zip(inputs)
            .map(|(slot, patent)| {
                slot.unwrap_or_else(|| {
                    let mut record = PipelineRecord::start(patent);
                    record.fail(
                        StageName::following(record.stage),
                        FailureReason::Aborted("pipeline worker stopped".to_string()),
                    );
                    record
                })
            })
            .collect();

        Ok(records)
    }
}

fn validate(patents: &[Patent]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(patents.len());
    for (position, patent) in patents.iter().enumerate() {
        if patent.id.is_blank() {
            return Err(BatchError::MissingIdentifier { position });
        }
        if !seen.insert(&patent.id) {
            return Err(BatchError::DuplicateIdentifier(patent.id.clone()));
        }
    }
    Ok(())
}

struct PatentPipeline {
    classifier: CitationClassifier,
    originality: OriginalityScorer,
    evidence: EvidenceAggregator,
    market: MarketScorer,
    suitability: SuitabilityAggregator,
}

struct OriginalityBranch {
    classified_at: DateTime<Utc>,
    result: OriginalityResult,
    scored_at: DateTime<Utc>,
}

struct MarketBranch {
    result: Result<MarketResult, MarketError>,
    finished_at: DateTime<Utc>,
}

enum Branches {
    Joined(OriginalityBranch, MarketBranch),
    Cancelled {
        originality: Option<OriginalityBranch>,
        market: Option<MarketBranch>,
    },
}

impl PatentPipeline {
    async fn run(
        &self,
        patent: Patent,
        keyword: &str,
        cancel: CancellationToken,
    ) -> PipelineRecord {
        let mut record = PipelineRecord::start(patent);
        if cancel.is_cancelled() {
            record.cancel();
            return record;
        }

        debug!(patent = %record.patent_id(), "pipeline started");

        let branches = self.score_branches(&record.patent, keyword, &cancel).await;
        let (originality, market) = match branches {
            Branches::Joined(originality, market) => (originality, market),
            Branches::Cancelled {
                originality,
                market,
            } => {
                if let Some(originality) = originality {
                    record.advance(PipelineStage::Classified, originality.classified_at);
                    record.advance(PipelineStage::OriginalityScored, originality.scored_at);
                    record.originality = Some(originality.result);
                }
                record.market = market.and_then(|branch| branch.result.ok());
                info!(patent = %record.patent_id(), stage = ?record.stage, "pipeline cancelled");
                record.cancel();
                return record;
            }
        };

        record.advance(PipelineStage::Classified, originality.classified_at);
        record.advance(PipelineStage::OriginalityScored, originality.scored_at);
        let originality_result = originality.result;

        let market_result = match market.result {
            Ok(result) => result,
            Err(error) => {
                warn!(patent = %record.patent_id(), %error, "market stage failed");
                record.originality = Some(originality_result);
                record.fail(StageName::Market, FailureReason::Provider(error.to_string()));
                return record;
            }
        };
        record.advance(
            PipelineStage::MarketScored,
            market.finished_at.max(originality.scored_at),
        );

        let suitability = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            suitability = self.suitability.evaluate(&originality_result, &market_result) => {
                Some(suitability)
            }
        };
        record.originality = Some(originality_result);
        record.market = Some(market_result);

        let Some(suitability) = suitability else {
            info!(patent = %record.patent_id(), "pipeline cancelled");
            record.cancel();
            return record;
        };

        record.suitability = Some(suitability);
        record.advance(PipelineStage::Evaluated, Utc::now());
        record.complete();

        debug!(patent = %record.patent_id(), "pipeline done");
        record
    }

    /// Runs both scoring branches concurrently. A cancellation keeps whichever
    /// branch already finished.
    async fn score_branches(
        &self,
        patent: &Patent,
        keyword: &str,
        cancel: &CancellationToken,
    ) -> Branches {
        let originality = async {
            let classified = self.classifier.classify(&patent.citations).await;
            let classified_at = Utc::now();
            let result = self.originality.score_classified(&patent.id, classified);
            OriginalityBranch {
                classified_at,
                result,
                scored_at: Utc::now(),
            }
        };

        let market = async {
            let evidence = self.evidence.gather(&patent.abstract_text, keyword).await;
            let result = self
                .market
                .score(&patent.id, &patent.abstract_text, &evidence)
                .await;
            MarketBranch {
                result,
                finished_at: Utc::now(),
            }
        };

        tokio::pin!(originality, market);
        let mut originality_done = None;
        let mut market_done = None;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Branches::Cancelled {
                        originality: originality_done,
                        market: market_done,
                    };
                }
                branch = &mut originality, if originality_done.is_none() => {
                    originality_done = Some(branch);
                }
                branch = &mut market, if market_done.is_none() => {
                    market_done = Some(branch);
                }
            }

            if originality_done.is_some() && market_done.is_some() {
                break;
            }
        }

        match (originality_done, market_done) {
            (Some(originality), Some(market)) => Branches::Joined(originality, market),
            (originality, market) => Branches::Cancelled {
                originality,
                market,
            },
        }
    }
}
