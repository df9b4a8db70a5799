//! CSV-backed collaborators for offline batches and tests.

mod parser;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::workflows::patents::collaborators::{CitationLookup, PatentSource, ProviderError};
use crate::workflows::patents::domain::{CitationId, ClassificationCode, CountryCode, Patent};
use crate::workflows::patents::evidence::{extract_keyterms, ReferenceCorpus};

#[derive(Debug)]
pub enum FixtureImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for FixtureImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixtureImportError::Io(err) => write!(f, "failed to read fixture export: {}", err),
            FixtureImportError::Csv(err) => write!(f, "invalid fixture CSV data: {}", err),
        }
    }
}

impl std::error::Error for FixtureImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FixtureImportError::Io(err) => Some(err),
            FixtureImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for FixtureImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for FixtureImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Patent search over an exported patent list.
#[derive(Debug, Clone, Default)]
pub struct FixturePatentSource {
    patents: Vec<Patent>,
}

impl FixturePatentSource {
    pub fn new(patents: Vec<Patent>) -> Self {
        Self { patents }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureImportError> {
        Ok(Self::new(parser::parse_patents(reader)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.patents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patents.is_empty()
    }

    /// Patents of `country` ranked by how many query terms their title and abstract share.
    pub fn matching(&self, query: &str, country: &CountryCode, top_n: usize) -> Vec<Patent> {
        let mut terms = extract_keyterms(query, usize::MAX);
        if terms.is_empty() {
            terms = query
                .split_whitespace()
                .map(str::to_lowercase)
                .collect();
        }

        let mut ranked: Vec<(usize, usize, &Patent)> = self
            .patents
            .iter()
            .enumerate()
            .filter(|(_, patent)| &patent.country == country)
            .filter_map(|(position, patent)| {
                let haystack =
                    format!("{} {}", patent.title, patent.abstract_text).to_lowercase();
                let hits = terms
                    .iter()
                    .filter(|term| haystack.contains(term.as_str()))
                    .count();
                (hits > 0).then_some((hits, position, patent))
            })
            .collect();

        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked
            .into_iter()
            .take(top_n)
            .map(|(_, _, patent)| patent.clone())
            .collect()
    }
}

#[async_trait]
impl PatentSource for FixturePatentSource {
    async fn search(
        &self,
        query: &str,
        country: &CountryCode,
        top_n: usize,
    ) -> Result<Vec<Patent>, ProviderError> {
        Ok(self.matching(query, country, top_n))
    }
}

/// Citation classification table loaded from CSV.
#[derive(Debug, Clone, Default)]
pub struct FixtureCitationLookup {
    codes: HashMap<CitationId, ClassificationCode>,
}

impl FixtureCitationLookup {
    pub fn new(codes: impl IntoIterator<Item = (CitationId, ClassificationCode)>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureImportError> {
        Ok(Self::new(parser::parse_citations(reader)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl CitationLookup for FixtureCitationLookup {
    async fn resolve(
        &self,
        citation: &CitationId,
    ) -> Result<Option<ClassificationCode>, ProviderError> {
        Ok(self.codes.get(citation).cloned())
    }
}

pub fn load_corpus<R: Read>(reader: R) -> Result<ReferenceCorpus, FixtureImportError> {
    Ok(ReferenceCorpus::build(parser::parse_corpus(reader)?))
}

pub fn load_corpus_path(path: impl AsRef<Path>) -> Result<ReferenceCorpus, FixtureImportError> {
    let file = File::open(path)?;
    load_corpus(file)
}
