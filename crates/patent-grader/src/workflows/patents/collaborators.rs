//! Seams to the external providers the pipeline consults.
//!
//! Every method here is a suspension point; the pipeline never performs I/O
//! outside these traits. Oracles answer with raw structured text so that the
//! scorers own parsing, clamping and validation.

use async_trait::async_trait;

use super::domain::{CitationId, ClassificationCode, CountryCode, Document, Patent, Snippet};
use super::evidence::EvidenceSet;
use super::market::RubricRequest;
use super::suitability::JudgeRequest;

#[async_trait]
pub trait PatentSource: Send + Sync {
    async fn search(
        &self,
        query: &str,
        country: &CountryCode,
        top_n: usize,
    ) -> Result<Vec<Patent>, ProviderError>;
}

/// Resolves a cited document to its primary classification code.
/// `Ok(None)` means the provider answered but knows no classification.
#[async_trait]
pub trait CitationLookup: Send + Sync {
    async fn resolve(
        &self,
        citation: &CitationId,
    ) -> Result<Option<ClassificationCode>, ProviderError>;
}

#[async_trait]
pub trait SemanticRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError>;
}

#[async_trait]
pub trait LexicalRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<Snippet>, ProviderError>;
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Returns a JSON object carrying `score` and `justification`.
    async fn score(&self, request: &RubricRequest) -> Result<String, ProviderError>;

    async fn application_domains(
        &self,
        _abstract_text: &str,
        _evidence: &EvidenceSet,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

#[async_trait]
pub trait JudgeOracle: Send + Sync {
    /// Returns a JSON verdict; see `JudgeVerdict` for the accepted fields.
    async fn judge(&self, request: &JudgeRequest) -> Result<String, ProviderError>;
}

/// Failure reported by any external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider returned a malformed response: {0}")]
    Malformed(String),
}
