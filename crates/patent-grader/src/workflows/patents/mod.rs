//! Patent originality, market, and suitability scoring workflow.

pub mod citations;
pub mod collaborators;
pub mod domain;
pub mod evidence;
pub mod market;
pub mod originality;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod suitability;

#[cfg(test)]
mod tests;

pub use citations::{
    CitationClassifier, ClassificationDistribution, ClassifiedCitations, UnresolvedCitation,
    UnresolvedReason,
};
pub use collaborators::{
    CitationLookup, JudgeOracle, LexicalRetriever, PatentSource, ProviderError, ScoringOracle,
    SemanticRetriever, WebSearch,
};
pub use domain::{
    CitationId, ClassificationCode, CountryCode, Document, Grade, Patent, PatentId, Snippet,
};
pub use evidence::{EvidenceAggregator, EvidenceSet, EvidenceSettings, ReferenceCorpus};
pub use market::{EvidenceHeuristicOracle, MarketError, MarketResult, MarketScorer, SubScore};
pub use originality::{OriginalityOutcome, OriginalityResult, OriginalityScorer};
pub use pipeline::{
    BatchError, BatchOutcome, BatchRequest, Collaborators, PipelineOrchestrator, PipelineRecord,
    PipelineSettings, PipelineStage, RecordStatus, StageName,
};
pub use report::BatchReport;
pub use repository::{BatchId, BatchRepository, RepositoryError, StoredBatch};
pub use router::patent_batch_router;
pub use service::{
    BatchDefaults, BatchSubmission, EvaluationServiceError, PatentEvaluationService,
};
pub use suitability::{CaveatJudge, SuitabilityAggregator, SuitabilityResult};
