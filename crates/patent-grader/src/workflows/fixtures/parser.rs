use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::workflows::patents::domain::{
    CitationId, ClassificationCode, CountryCode, Document, Patent, PatentId,
};

pub(crate) fn parse_patents<R: Read>(reader: R) -> Result<Vec<Patent>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut patents = Vec::new();

    for record in csv_reader.deserialize::<PatentRow>() {
        patents.push(record?.into_patent());
    }

    Ok(patents)
}

pub(crate) fn parse_citations<R: Read>(
    reader: R,
) -> Result<Vec<(CitationId, ClassificationCode)>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut citations = Vec::new();

    for record in csv_reader.deserialize::<CitationRow>() {
        let row = record?;
        if let Some(classification) = row.classification {
            citations.push((
                CitationId::new(row.citation_id),
                ClassificationCode::new(classification),
            ));
        }
    }

    Ok(citations)
}

pub(crate) fn parse_corpus<R: Read>(reader: R) -> Result<Vec<Document>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut documents = Vec::new();

    for record in csv_reader.deserialize::<CorpusRow>() {
        let row = record?;
        documents.push(Document {
            source: row.source,
            content: row.content,
        });
    }

    Ok(documents)
}

#[derive(Debug, Deserialize)]
struct PatentRow {
    patent_id: String,
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    country: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    publication_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    filing_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    assignee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    citations: Option<String>,
}

impl PatentRow {
    fn into_patent(self) -> Patent {
        let citations = self
            .citations
            .as_deref()
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(CitationId::new)
                    .collect()
            })
            .unwrap_or_default();

        Patent {
            id: PatentId::new(self.patent_id),
            title: self.title,
            abstract_text: self.abstract_text,
            country: CountryCode::new(self.country),
            filing_date: self.filing_date.as_deref().and_then(parse_date),
            publication_date: self.publication_date.as_deref().and_then(parse_date),
            assignee: self.assignee,
            citations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CitationRow {
    citation_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    classification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusRow {
    source: String,
    content: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// Accepts ISO dates and the compact `YYYYMMDD` form patent offices publish.
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}
