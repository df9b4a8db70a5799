//! Offline scoring oracle that reads numeric signals straight from evidence.
//!
//! It honours the same bucket tables as a model-backed oracle: dollar
//! magnitudes drive market size, CAGR percentages drive growth and launch
//! horizons drive commercialization readiness.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::json;

use super::rubric::{RubricBucket, RubricRequest, SubScoreKind};
use crate::workflows::patents::collaborators::{ProviderError, ScoringOracle};
use crate::workflows::patents::evidence::EvidenceSet;

const DOMAIN_KEYWORDS: &[(&str, &str)] = &[
    ("vehicle", "Automotive"),
    ("automotive", "Automotive"),
    ("battery", "Energy storage"),
    ("grid", "Energy storage"),
    ("solar", "Renewable energy"),
    ("medical", "Healthcare"),
    ("diagnostic", "Healthcare"),
    ("drug", "Pharmaceuticals"),
    ("semiconductor", "Semiconductors"),
    ("wafer", "Semiconductors"),
    ("robot", "Industrial automation"),
    ("factory", "Industrial automation"),
    ("wireless", "Telecommunications"),
    ("network", "Telecommunications"),
    ("smartphone", "Consumer electronics"),
    ("display", "Consumer electronics"),
    ("aircraft", "Aerospace"),
    ("satellite", "Aerospace"),
];

const MAX_DOMAINS: usize = 5;

#[derive(Debug, Clone)]
pub struct EvidenceHeuristicOracle {
    reference_year: i32,
}

impl Default for EvidenceHeuristicOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceHeuristicOracle {
    pub fn new() -> Self {
        Self {
            reference_year: Utc::now().year(),
        }
    }

    /// Fixes the year used to turn "by 2027" into a horizon.
    pub fn with_reference_year(reference_year: i32) -> Self {
        Self { reference_year }
    }

    fn assess(&self, request: &RubricRequest) -> (f64, String) {
        let text = request.evidence.join(" ");
        let words = words(&text);

        let signal = match request.kind {
            SubScoreKind::MarketSize => largest_dollar_amount(&words).map(|billions| {
                let thresholds = [10.0, 3.0, 1.0, 0.3];
                let value = place(request.kind.buckets(), &thresholds, billions, 50.0);
                (value, format!("largest market estimate ${billions:.2}B"))
            }),
            SubScoreKind::Growth => highest_cagr(&words).map(|cagr| {
                let thresholds = [25.0, 20.0, 15.0, 10.0];
                let value = place(request.kind.buckets(), &thresholds, cagr, 40.0);
                (value, format!("highest growth signal {cagr:.1}% CAGR"))
            }),
            SubScoreKind::Commercialization => {
                shortest_horizon(&words, self.reference_year).map(|years| {
                    let readiness = 10.0 - years.min(10.0);
                    let thresholds = [9.0, 8.0, 7.0, 5.0];
                    let value = place(request.kind.buckets(), &thresholds, readiness, 10.0);
                    (value, format!("earliest market entry in {years:.1} years"))
                })
            }
        };

        match signal {
            Some(found) => found,
            None if request.evidence_available => {
                (0.0, format!("no {} signal in evidence", request.kind))
            }
            None => (0.0, "evidence unavailable".to_string()),
        }
    }
}

#[async_trait]
impl ScoringOracle for EvidenceHeuristicOracle {
    async fn score(&self, request: &RubricRequest) -> Result<String, ProviderError> {
        let (score, justification) = self.assess(request);
        Ok(json!({ "score": score, "justification": justification }).to_string())
    }

    async fn application_domains(
        &self,
        abstract_text: &str,
        evidence: &EvidenceSet,
    ) -> Result<Vec<String>, ProviderError> {
        let mut text = abstract_text.to_lowercase();
        for item in evidence.items() {
            text.push(' ');
            text.push_str(&item.snippet.to_lowercase());
        }

        let mut domains: Vec<String> = Vec::new();
        for (keyword, domain) in DOMAIN_KEYWORDS {
            if text.contains(keyword) && !domains.iter().any(|known| known == domain) {
                domains.push((*domain).to_string());
            }
            if domains.len() == MAX_DOMAINS {
                break;
            }
        }
        Ok(domains)
    }
}

/// Maps a signal onto the bucket table. `thresholds[i]` is the lower edge of
/// bucket `i`; the value is interpolated inside the bucket's sub-range.
fn place(buckets: &[RubricBucket], thresholds: &[f64; 4], signal: f64, ceiling: f64) -> f64 {
    let mut upper = ceiling;
    for (bucket, lower) in buckets.iter().zip(thresholds.iter().copied()) {
        if signal >= lower {
            return interpolate(bucket, signal, lower, upper);
        }
        upper = lower;
    }
    let last = &buckets[buckets.len() - 1];
    interpolate(last, signal, 0.0, upper)
}

fn interpolate(bucket: &RubricBucket, signal: f64, lower: f64, upper: f64) -> f64 {
    let span = (upper - lower).max(f64::EPSILON);
    let position = ((signal - lower) / span).clamp(0.0, 1.0);
    let value = bucket.min + (bucket.max - bucket.min) * position;
    (value * 1000.0).round() / 1000.0
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\''))
                .trim_end_matches('.')
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

fn number(word: &str) -> Option<f64> {
    let cleaned: String = word
        .trim_start_matches("usd")
        .trim_start_matches(['$', '~'])
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Largest dollar magnitude in billions, e.g. `$12.5 billion`, `USD 800 million`, `$4B`.
fn largest_dollar_amount(words: &[String]) -> Option<f64> {
    let mut largest: Option<f64> = None;

    for (index, word) in words.iter().enumerate() {
        let (amount, inline_unit) = match split_unit(word) {
            Some(found) => found,
            None => continue,
        };

        let unit = inline_unit.or_else(|| words.get(index + 1).and_then(|next| scale(next)));
        let Some(multiplier) = unit else {
            continue;
        };

        let billions = amount * multiplier;
        largest = Some(largest.map_or(billions, |current| current.max(billions)));
    }

    largest
}

fn split_unit(word: &str) -> Option<(f64, Option<f64>)> {
    if let Some(amount) = number(word) {
        return Some((amount, None));
    }
    for (suffix, multiplier) in [("bn", 1.0), ("b", 1.0), ("m", 0.001), ("t", 1000.0)] {
        if let Some(stripped) = word.strip_suffix(suffix) {
            if stripped.starts_with('$') || stripped.starts_with("usd") {
                if let Some(amount) = number(stripped) {
                    return Some((amount, Some(multiplier)));
                }
            }
        }
    }
    None
}

fn scale(word: &str) -> Option<f64> {
    match word {
        "trillion" => Some(1000.0),
        "billion" | "bn" => Some(1.0),
        "million" | "mn" => Some(0.001),
        _ => None,
    }
}

/// Highest percentage appearing within four words of "cagr" or "growth".
fn highest_cagr(words: &[String]) -> Option<f64> {
    let anchors: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, word)| word.contains("cagr") || word.starts_with("growth"))
        .map(|(index, _)| index)
        .collect();

    words
        .iter()
        .enumerate()
        .filter(|(_, word)| word.ends_with('%'))
        .filter(|(index, _)| anchors.iter().any(|anchor| anchor.abs_diff(*index) <= 4))
        .filter_map(|(_, word)| number(word))
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |current| current.max(value)))
        })
}

/// Shortest time-to-market in years from "within N years", "N-year" or "by YYYY".
fn shortest_horizon(words: &[String], reference_year: i32) -> Option<f64> {
    let mut horizons = Vec::new();

    for (index, word) in words.iter().enumerate() {
        let next = words.get(index + 1).map(String::as_str);

        if matches!(word.as_str(), "within" | "in") {
            if let (Some(amount), Some(unit)) = (
                next.and_then(number),
                words.get(index + 2).map(String::as_str),
            ) {
                if unit.starts_with("year") {
                    horizons.push(amount);
                } else if unit.starts_with("month") {
                    horizons.push(amount / 12.0);
                }
            }
        }

        if let Some(amount) = word.strip_suffix("-year").and_then(number) {
            horizons.push(amount);
        }

        if matches!(word.as_str(), "by" | "in" | "from") {
            if let Some(year) = next.and_then(|candidate| candidate.parse::<i32>().ok()) {
                if (2000..=2100).contains(&year) && year >= reference_year {
                    horizons.push(f64::from(year - reference_year));
                }
            }
        }
    }

    horizons
        .into_iter()
        .filter(|years| *years >= 0.0)
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |current| current.min(value)))
        })
}
