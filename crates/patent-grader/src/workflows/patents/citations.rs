use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::collaborators::{CitationLookup, ProviderError};
use super::domain::{CitationId, ClassificationCode};

/// Classification code counts derived from one patent's citations.
///
/// Only successfully classified citations contribute, so `total()` always
/// equals the number of resolved citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationDistribution {
    counts: BTreeMap<ClassificationCode, u64>,
}

impl ClassificationDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = ClassificationCode>,
    {
        let mut distribution = Self::new();
        for code in codes {
            distribution.record(code);
        }
        distribution
    }

    /// Builds a distribution from explicit counts; zero counts are ignored.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (ClassificationCode, u64)>,
    {
        let mut distribution = Self::new();
        for (code, count) in counts {
            if count > 0 {
                let entry = distribution.counts.entry(code).or_insert(0);
                *entry = entry.saturating_add(count);
            }
        }
        distribution
    }

    pub fn record(&mut self, code: ClassificationCode) {
        let entry = self.counts.entry(code).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn count(&self, code: &ClassificationCode) -> u64 {
        self.counts.get(code).copied().unwrap_or(0)
    }

    /// Saturates instead of wrapping on extreme counts.
    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |total, count| total.saturating_add(*count))
    }

    pub fn unique_codes(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassificationCode, u64)> {
        self.counts.iter().map(|(code, count)| (code, *count))
    }
}

/// Why a citation did not contribute to the distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnresolvedReason {
    NotFound,
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedCitation {
    pub citation: CitationId,
    pub reason: UnresolvedReason,
}

/// Output of a classification pass: the distribution plus the unresolved tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCitations {
    pub distribution: ClassificationDistribution,
    pub considered: usize,
    pub unresolved: Vec<UnresolvedCitation>,
}

impl ClassifiedCitations {
    pub fn resolved(&self) -> usize {
        self.considered - self.unresolved.len()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

/// Resolves citations through the lookup collaborator. Never fails as a whole.
pub struct CitationClassifier {
    lookup: Arc<dyn CitationLookup>,
    max_citations: Option<usize>,
}

impl CitationClassifier {
    pub fn new(lookup: Arc<dyn CitationLookup>, max_citations: Option<usize>) -> Self {
        Self {
            lookup,
            max_citations,
        }
    }

    pub async fn classify(&self, citations: &[CitationId]) -> ClassifiedCitations {
        let considered = match self.max_citations {
            Some(limit) => &citations[..citations.len().min(limit)],
            None => citations,
        };

        let lookups = considered
            .iter()
            .map(|citation| async move { (citation, self.lookup.resolve(citation).await) });
        let resolutions = join_all(lookups).await;

        let mut classified = ClassifiedCitations {
            considered: considered.len(),
            ..ClassifiedCitations::default()
        };

        for (citation, resolution) in resolutions {
            match resolution {
                Ok(Some(code)) => classified.distribution.record(code),
                Ok(None) => {
                    debug!(citation = %citation, "citation has no classification");
                    classified.unresolved.push(UnresolvedCitation {
                        citation: citation.clone(),
                        reason: UnresolvedReason::NotFound,
                    });
                }
                Err(error) => {
                    warn!(citation = %citation, %error, "citation lookup failed");
                    classified.unresolved.push(UnresolvedCitation {
                        citation: citation.clone(),
                        reason: provider_reason(error),
                    });
                }
            }
        }

        classified
    }
}

fn provider_reason(error: ProviderError) -> UnresolvedReason {
    UnresolvedReason::Provider(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapLookup {
        codes: HashMap<&'static str, &'static str>,
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl CitationLookup for MapLookup {
        async fn resolve(
            &self,
            citation: &CitationId,
        ) -> Result<Option<ClassificationCode>, ProviderError> {
            if self.failing.contains(&citation.as_str()) {
                return Err(ProviderError::Unavailable("timeout".to_string()));
            }
            Ok(self
                .codes
                .get(citation.as_str())
                .map(|code| ClassificationCode::new(code)))
        }
    }

    fn ids(values: &[&str]) -> Vec<CitationId> {
        values.iter().map(|value| CitationId::new(*value)).collect()
    }

    fn lookup() -> Arc<MapLookup> {
        Arc::new(MapLookup {
            codes: HashMap::from([
                ("c1", "H01M"),
                ("c2", "H01M"),
                ("c3", "G06N"),
                ("c4", "B60L"),
            ]),
            failing: vec!["c5"],
        })
    }

    #[tokio::test]
    async fn unresolved_citations_are_tallied_not_counted() {
        let classifier = CitationClassifier::new(lookup(), None);
        let classified = classifier
            .classify(&ids(&["c1", "c2", "c3", "missing", "c5"]))
            .await;

        assert_eq!(classified.considered, 5);
        assert_eq!(classified.distribution.total(), 3);
        assert_eq!(classified.resolved(), 3);
        assert_eq!(classified.unresolved_count(), 2);
        assert_eq!(
            classified.distribution.count(&ClassificationCode::new("H01M")),
            2
        );
        assert!(matches!(
            classified.unresolved[1].reason,
            UnresolvedReason::Provider(_)
        ));
    }

    #[tokio::test]
    async fn all_failures_yield_empty_distribution() {
        let classifier = CitationClassifier::new(lookup(), None);
        let classified = classifier.classify(&ids(&["c5", "nope"])).await;

        assert!(classified.distribution.is_empty());
        assert_eq!(classified.distribution.total(), 0);
        assert_eq!(classified.unresolved_count(), 2);
    }

    #[tokio::test]
    async fn citation_cap_applies_in_citation_order() {
        let classifier = CitationClassifier::new(lookup(), Some(2));
        let classified = classifier.classify(&ids(&["c3", "c4", "c1"])).await;

        assert_eq!(classified.considered, 2);
        assert_eq!(
            classified.distribution.count(&ClassificationCode::new("H01M")),
            0
        );
        assert_eq!(classified.distribution.unique_codes(), 2);
    }

    #[test]
    fn from_counts_skips_zero_entries() {
        let distribution = ClassificationDistribution::from_counts([
            (ClassificationCode::new("A"), 0),
            (ClassificationCode::new("B"), 3),
        ]);
        assert_eq!(distribution.unique_codes(), 1);
        assert_eq!(distribution.total(), 3);
    }
}
