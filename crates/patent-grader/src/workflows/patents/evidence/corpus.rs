//! In-memory reference corpus serving both retriever seams.
//!
//! The index is built once before a batch and only read afterwards, so a
//! single `Arc<ReferenceCorpus>` can back every worker without locking.

use std::collections::HashMap;

use async_trait::async_trait;

use super::queries::tokenize;
use crate::workflows::patents::collaborators::{
    LexicalRetriever, ProviderError, SemanticRetriever,
};
use crate::workflows::patents::domain::Document;

const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;

#[derive(Debug)]
struct IndexedDocument {
    document: Document,
    term_counts: HashMap<String, u32>,
    length: usize,
}

#[derive(Debug, Default)]
pub struct ReferenceCorpus {
    documents: Vec<IndexedDocument>,
    document_frequency: HashMap<String, usize>,
    average_length: f64,
}

impl ReferenceCorpus {
    pub fn build(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut indexed = Vec::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let tokens = tokenize(&document.content);
            let mut term_counts: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            indexed.push(IndexedDocument {
                document,
                term_counts,
                length: tokens.len(),
            });
        }

        let average_length = if indexed.is_empty() {
            0.0
        } else {
            indexed.iter().map(|doc| doc.length as f64).sum::<f64>() / indexed.len() as f64
        };

        Self {
            documents: indexed,
            document_frequency,
            average_length,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Okapi BM25 ranking; documents sharing no query term are skipped.
    pub fn bm25(&self, query: &str, top_k: usize) -> Vec<Document> {
        let terms = tokenize(query);
        let scored = self.documents.iter().enumerate().filter_map(|(index, doc)| {
            let score: f64 = terms
                .iter()
                .filter_map(|term| {
                    let frequency = f64::from(*doc.term_counts.get(term)?);
                    let length_norm = if self.average_length > 0.0 {
                        doc.length as f64 / self.average_length
                    } else {
                        1.0
                    };
                    let numerator = frequency * (BM25_K1 + 1.0);
                    let denominator =
                        frequency + BM25_K1 * (1.0 - BM25_B + BM25_B * length_norm);
                    Some(self.bm25_idf(term) * numerator / denominator)
                })
                .sum();
            (score > 0.0).then_some((index, score))
        });

        self.top(scored, top_k)
    }

    /// TF-IDF cosine similarity, the local stand-in for embedding search.
    pub fn cosine(&self, query: &str, top_k: usize) -> Vec<Document> {
        let mut query_counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(query) {
            *query_counts.entry(token).or_insert(0) += 1;
        }
        let query_vector = self.weigh(&query_counts);
        let query_norm = norm(&query_vector);
        if query_norm == 0.0 {
            return Vec::new();
        }

        let scored = self.documents.iter().enumerate().filter_map(|(index, doc)| {
            let doc_vector = self.weigh(&doc.term_counts);
            let doc_norm = norm(&doc_vector);
            if doc_norm == 0.0 {
                return None;
            }
            let dot: f64 = query_vector
                .iter()
                .filter_map(|(term, weight)| doc_vector.get(term).map(|other| weight * other))
                .sum();
            let similarity = dot / (query_norm * doc_norm);
            (similarity > 0.0).then_some((index, similarity))
        });

        self.top(scored, top_k)
    }

    fn bm25_idf(&self, term: &str) -> f64 {
        let n = self.documents.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn tfidf_idf(&self, term: &str) -> f64 {
        let n = self.documents.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    }

    fn weigh(&self, counts: &HashMap<String, u32>) -> HashMap<String, f64> {
        counts
            .iter()
            .map(|(term, count)| (term.clone(), f64::from(*count) * self.tfidf_idf(term)))
            .collect()
    }

    fn top(&self, scored: impl Iterator<Item = (usize, f64)>, top_k: usize) -> Vec<Document> {
        let mut ranked: Vec<(usize, f64)> = scored.collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(top_k)
            .map(|(index, _)| self.documents[index].document.clone())
            .collect()
    }
}

fn norm(vector: &HashMap<String, f64>) -> f64 {
    vector.values().map(|weight| weight * weight).sum::<f64>().sqrt()
}

#[async_trait]
impl LexicalRetriever for ReferenceCorpus {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError> {
        Ok(self.bm25(query, top_k))
    }
}

#[async_trait]
impl SemanticRetriever for ReferenceCorpus {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, ProviderError> {
        Ok(self.cosine(query, top_k))
    }
}
