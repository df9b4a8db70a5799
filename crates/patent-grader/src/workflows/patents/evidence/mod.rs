//! Market evidence gathering from the retrievers and web search.

mod corpus;
mod queries;

pub use corpus::ReferenceCorpus;
pub use queries::{extract_keyterms, retrieval_query, web_queries};

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::collaborators::{LexicalRetriever, ProviderError, SemanticRetriever, WebSearch};
use super::domain::{Document, Snippet};

const MAX_EVIDENCE_CITATIONS: usize = 8;
const WEB_TITLE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceOrigin {
    Semantic,
    Lexical,
    Web,
}

impl EvidenceOrigin {
    pub const fn label(self) -> &'static str {
        match self {
            EvidenceOrigin::Semantic | EvidenceOrigin::Lexical => "RAG",
            EvidenceOrigin::Web => "Web",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub origin: EvidenceOrigin,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub snippet: String,
}

impl EvidenceItem {
    fn from_document(origin: EvidenceOrigin, document: Document) -> Self {
        Self {
            origin,
            source: document.source,
            title: None,
            snippet: document.content,
        }
    }

    fn from_snippet(snippet: Snippet) -> Self {
        Self {
            origin: EvidenceOrigin::Web,
            source: snippet.url,
            title: Some(snippet.title),
            snippet: snippet.content,
        }
    }

    /// `[RAG] source` or `[Web] title (url)`.
    pub fn citation(&self) -> String {
        match (&self.origin, &self.title) {
            (EvidenceOrigin::Web, Some(title)) => {
                let title: String = title.chars().take(WEB_TITLE_LIMIT).collect();
                format!("[Web] {title} ({})", self.source)
            }
            (origin, _) => format!("[{}] {}", origin.label(), self.source),
        }
    }
}

/// Which part of a gather call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFailure {
    pub origin: EvidenceOrigin,
    pub query: String,
    pub message: String,
}

/// Deduplicated evidence, semantic hits first, then lexical, then web.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSet {
    items: Vec<EvidenceItem>,
    failures: Vec<EvidenceFailure>,
}

impl EvidenceSet {
    pub fn from_items(items: impl IntoIterator<Item = EvidenceItem>) -> Self {
        let mut set = Self::default();
        for item in items {
            set.push(item);
        }
        set
    }

    fn push(&mut self, item: EvidenceItem) {
        let duplicate = self
            .items
            .iter()
            .any(|existing| existing.source == item.source && existing.snippet == item.snippet);
        if !duplicate {
            self.items.push(item);
        }
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn failures(&self) -> &[EvidenceFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_web_evidence(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.origin == EvidenceOrigin::Web)
    }

    /// Unique source citations, capped at eight.
    pub fn citations(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|item| seen.insert(item.source.as_str()))
            .map(EvidenceItem::citation)
            .take(MAX_EVIDENCE_CITATIONS)
            .collect()
    }

    /// Snippets as plain text lines handed to the scoring oracle.
    pub fn rendered(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| format!("{}: {}", item.citation(), item.snippet))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceSettings {
    pub top_k: usize,
    pub web_results_per_query: usize,
    pub max_keyterms: usize,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            web_results_per_query: 2,
            max_keyterms: 8,
        }
    }
}

pub struct EvidenceAggregator {
    semantic: Arc<dyn SemanticRetriever>,
    lexical: Arc<dyn LexicalRetriever>,
    web: Arc<dyn WebSearch>,
    settings: EvidenceSettings,
}

impl EvidenceAggregator {
    pub fn new(
        semantic: Arc<dyn SemanticRetriever>,
        lexical: Arc<dyn LexicalRetriever>,
        web: Arc<dyn WebSearch>,
        settings: EvidenceSettings,
    ) -> Self {
        Self {
            semantic,
            lexical,
            web,
            settings,
        }
    }

    /// Collects evidence for one patent. Provider failures only shrink the set.
    pub async fn gather(&self, abstract_text: &str, keyword: &str) -> EvidenceSet {
        let keyterms = extract_keyterms(abstract_text, self.settings.max_keyterms);
        let query = retrieval_query(keyword, &keyterms);
        let web_queries = web_queries(keyword, &keyterms);
        let top_k = self.settings.top_k;
        let web_limit = self.settings.web_results_per_query;

        let web_calls = web_queries.iter().map(|web_query| async move {
            let result = self.web.search(web_query, web_limit).await;
            (web_query.as_str(), result)
        });

        let (semantic, lexical, web) = tokio::join!(
            self.semantic.retrieve(&query, top_k),
            self.lexical.retrieve(&query, top_k),
            join_all(web_calls),
        );

        let mut set = EvidenceSet::default();
        collect_documents(&mut set, EvidenceOrigin::Semantic, &query, semantic, top_k);
        collect_documents(&mut set, EvidenceOrigin::Lexical, &query, lexical, top_k);

        for (web_query, result) in web {
            match result {
                Ok(snippets) => {
                    for snippet in snippets.into_iter().take(web_limit) {
                        set.push(EvidenceItem::from_snippet(snippet));
                    }
                }
                Err(error) => {
                    warn!(query = web_query, %error, "web search failed");
                    set.failures.push(failure(EvidenceOrigin::Web, web_query, &error));
                }
            }
        }

        debug!(
            items = set.len(),
            failures = set.failures.len(),
            "evidence gathered"
        );
        set
    }
}

fn collect_documents(
    set: &mut EvidenceSet,
    origin: EvidenceOrigin,
    query: &str,
    result: Result<Vec<Document>, ProviderError>,
    top_k: usize,
) {
    match result {
        Ok(documents) => {
            for document in documents.into_iter().take(top_k) {
                set.push(EvidenceItem::from_document(origin, document));
            }
        }
        Err(error) => {
            warn!(?origin, %error, "retrieval failed");
            set.failures.push(failure(origin, query, &error));
        }
    }
}

fn failure(origin: EvidenceOrigin, query: &str, error: &ProviderError) -> EvidenceFailure {
    EvidenceFailure {
        origin,
        query: query.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticDocs(Vec<Document>);

    #[async_trait]
    impl SemanticRetriever for StaticDocs {
        async fn retrieve(&self, _: &str, _: usize) -> Result<Vec<Document>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl LexicalRetriever for StaticDocs {
        async fn retrieve(&self, _: &str, _: usize) -> Result<Vec<Document>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct Unavailable;

    #[async_trait]
    impl SemanticRetriever for Unavailable {
        async fn retrieve(&self, _: &str, _: usize) -> Result<Vec<Document>, ProviderError> {
            Err(ProviderError::Unavailable("vector store offline".to_string()))
        }
    }

    #[async_trait]
    impl LexicalRetriever for Unavailable {
        async fn retrieve(&self, _: &str, _: usize) -> Result<Vec<Document>, ProviderError> {
            Err(ProviderError::Unavailable("index offline".to_string()))
        }
    }

    #[async_trait]
    impl WebSearch for Unavailable {
        async fn search(&self, _: &str, _: usize) -> Result<Vec<Snippet>, ProviderError> {
            Err(ProviderError::Unavailable("quota exceeded".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingWeb {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebSearch for RecordingWeb {
        async fn search(&self, query: &str, _: usize) -> Result<Vec<Snippet>, ProviderError> {
            self.queries
                .lock()
                .expect("queries lock")
                .push(query.to_string());
            Ok((0..3)
                .map(|n| Snippet {
                    title: format!("Result {n}"),
                    url: format!("https://example.test/{n}"),
                    content: format!("snippet {n} for {query}"),
                })
                .collect())
        }
    }

    fn doc(source: &str, content: &str) -> Document {
        Document {
            source: source.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn deduplicates_across_retrievers_and_caps_web_results() {
        let docs = Arc::new(StaticDocs(vec![
            doc("report-a", "market is $4 billion"),
            doc("report-b", "CAGR of 18%"),
        ]));
        let web = Arc::new(RecordingWeb::default());
        let aggregator = EvidenceAggregator::new(
            docs.clone(),
            docs,
            web.clone(),
            EvidenceSettings::default(),
        );

        let set = aggregator
            .gather("Sulfide electrolyte battery cell.", "solid-state battery")
            .await;

        assert_eq!(set.len(), 2 + 3 * 2);
        assert_eq!(set.items()[0].origin, EvidenceOrigin::Semantic);
        assert!(set.failures().is_empty());
        assert_eq!(web.queries.lock().expect("queries lock").len(), 3);
    }

    #[tokio::test]
    async fn web_failure_degrades_to_retrieval_evidence() {
        let docs = Arc::new(StaticDocs(vec![doc("report-a", "market is $4 billion")]));
        let aggregator = EvidenceAggregator::new(
            docs.clone(),
            docs,
            Arc::new(Unavailable),
            EvidenceSettings::default(),
        );

        let set = aggregator.gather("abstract", "robotics").await;

        assert_eq!(set.len(), 1);
        assert!(!set.has_web_evidence());
        assert_eq!(set.failures().len(), 3);
    }

    #[tokio::test]
    async fn total_failure_yields_empty_set() {
        let aggregator = EvidenceAggregator::new(
            Arc::new(Unavailable),
            Arc::new(Unavailable),
            Arc::new(Unavailable),
            EvidenceSettings::default(),
        );

        let set = aggregator.gather("abstract", "robotics").await;

        assert!(set.is_empty());
        assert_eq!(set.failures().len(), 5);
    }

    #[test]
    fn citations_are_unique_by_source_and_capped() {
        let items = (0..12).map(|n| EvidenceItem {
            origin: if n % 2 == 0 {
                EvidenceOrigin::Lexical
            } else {
                EvidenceOrigin::Web
            },
            source: format!("source-{n}"),
            title: (n % 2 == 1).then(|| "A very long headline about the battery market".into()),
            snippet: format!("snippet {n}"),
        });
        let set = EvidenceSet::from_items(items);

        let citations = set.citations();
        assert_eq!(citations.len(), 8);
        assert_eq!(citations[0], "[RAG] source-0");
        assert_eq!(
            citations[1],
            "[Web] A very long headline about the battery market (source-1)"
        );
    }
}
