use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for patents flowing through a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatentId(pub String);

impl PatentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PatentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a cited prior-art document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitationId(pub String);

impl CitationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upper-cased jurisdiction code such as `US` or `KR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Technology classification label (CPC group or subclass).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationCode(String);

impl ClassificationCode {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Patent as returned by a search provider. Stages only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patent {
    pub id: PatentId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub country: CountryCode,
    pub filing_date: Option<NaiveDate>,
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub citations: Vec<CitationId>,
}

/// Letter grade assigned from the weighted suitability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::S, Grade::A, Grade::B, Grade::C, Grade::D];

    pub const fn label(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Grade::S => "exceptional",
            Grade::A => "strong",
            Grade::B => "promising",
            Grade::C => "limited",
            Grade::D => "weak",
        }
    }

    /// Accepts `"A"`, `"a"`, `"Grade A"` and similar judge phrasing.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let token = trimmed
            .strip_prefix("Grade")
            .or_else(|| trimmed.strip_prefix("grade"))
            .unwrap_or(trimmed)
            .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '"');

        match token.to_ascii_uppercase().as_str() {
            "S" => Some(Grade::S),
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference corpus document returned by the retrievers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub content: String,
}

/// Free-text web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_parse_accepts_judge_phrasing() {
        assert_eq!(Grade::parse("A"), Some(Grade::A));
        assert_eq!(Grade::parse(" s "), Some(Grade::S));
        assert_eq!(Grade::parse("Grade: B"), Some(Grade::B));
        assert_eq!(Grade::parse("\"D\""), Some(Grade::D));
        assert_eq!(Grade::parse("excellent"), None);
        assert_eq!(Grade::parse(""), None);
    }

    #[test]
    fn country_codes_are_normalized() {
        assert_eq!(CountryCode::new(" kr "), CountryCode::new("KR"));
        assert_eq!(CountryCode::new("jp").as_str(), "JP");
    }

    #[test]
    fn patent_serializes_abstract_field_name() {
        let patent = Patent {
            id: PatentId::new("US-1"),
            title: "Solid electrolyte".to_string(),
            abstract_text: "A sulfide electrolyte.".to_string(),
            country: CountryCode::new("US"),
            filing_date: NaiveDate::from_ymd_opt(2021, 3, 4),
            publication_date: None,
            assignee: None,
            citations: vec![CitationId::new("US-0")],
        };

        let value = serde_json::to_value(&patent).expect("serializes");
        assert_eq!(value["abstract"], "A sulfide electrolyte.");
        assert_eq!(value["citations"][0], "US-0");
    }
}
