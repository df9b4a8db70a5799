use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::insights::gap_analysis;
use super::views::{GapAnalysis, RecordView};
use crate::workflows::patents::domain::{CountryCode, Grade};
use crate::workflows::patents::pipeline::{
    BatchOutcome, CountrySearch, PipelineRecord, RecordStatus, StageName,
};

/// Record counts by terminal status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusTally {
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub failed_by_stage: BTreeMap<StageName, usize>,
}

impl StatusTally {
    fn observe(&mut self, record: &PipelineRecord) {
        self.total += 1;
        match record.status {
            RecordStatus::Done => self.done += 1,
            RecordStatus::Failed { stage } => {
                self.failed += 1;
                *self.failed_by_stage.entry(stage).or_insert(0) += 1;
            }
            RecordStatus::Cancelled { .. } => self.cancelled += 1,
            RecordStatus::Running => {}
        }
    }
}

/// Counts per grade; every grade is present, even at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GradeDistribution(BTreeMap<Grade, usize>);

impl Default for GradeDistribution {
    fn default() -> Self {
        Self(Grade::ALL.into_iter().map(|grade| (grade, 0)).collect())
    }
}

impl GradeDistribution {
    fn observe(&mut self, grade: Grade) {
        *self.0.entry(grade).or_insert(0) += 1;
    }

    fn merge(&mut self, other: &GradeDistribution) {
        for (grade, count) in &other.0 {
            *self.0.entry(*grade).or_insert(0) += count;
        }
    }

    pub fn count(&self, grade: Grade) -> usize {
        self.0.get(&grade).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// Averages are taken over Done records only; insufficient originality counts as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySummary {
    pub country: CountryCode,
    pub records: usize,
    pub successful: usize,
    pub average_originality: Option<f64>,
    pub average_market: Option<f64>,
    pub average_suitability: Option<f64>,
    pub grades: GradeDistribution,
    pub insufficient_data: usize,
    pub low_confidence: usize,
    pub judge_overrides: usize,
}

#[derive(Default)]
struct CountryAccumulator {
    records: usize,
    originality: Vec<f64>,
    market: Vec<f64>,
    suitability: Vec<f64>,
    grades: GradeDistribution,
    insufficient_data: usize,
    low_confidence: usize,
    judge_overrides: usize,
}

impl CountryAccumulator {
    fn observe(&mut self, record: &PipelineRecord) {
        self.records += 1;
        if !record.is_done() {
            return;
        }
        let Some(suitability) = &record.suitability else {
            return;
        };

        self.originality.push(suitability.originality_score);
        self.market.push(suitability.market_score);
        self.suitability.push(suitability.weighted_score);
        self.grades.observe(suitability.grade);

        if record
            .originality
            .as_ref()
            .is_some_and(|result| result.is_insufficient())
        {
            self.insufficient_data += 1;
        }
        if record.market.as_ref().is_some_and(|result| result.low_confidence) {
            self.low_confidence += 1;
        }
        if suitability.judge_override().is_some() {
            self.judge_overrides += 1;
        }
    }

    fn finish(self, country: CountryCode) -> CountrySummary {
        CountrySummary {
            country,
            records: self.records,
            successful: self.suitability.len(),
            average_originality: mean(&self.originality),
            average_market: mean(&self.market),
            average_suitability: mean(&self.suitability),
            grades: self.grades,
            insufficient_data: self.insufficient_data,
            low_confidence: self.low_confidence,
            judge_overrides: self.judge_overrides,
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Aggregate view over a finished batch. Reads stored scores; never rescored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub cancelled: bool,
    pub tally: StatusTally,
    pub searches: Vec<CountrySearch>,
    pub countries: Vec<CountrySummary>,
    pub grades: GradeDistribution,
    pub judge_overrides: usize,
    pub insufficient_data: usize,
    pub gap_analysis: Option<GapAnalysis>,
    pub records: Vec<RecordView>,
}

impl BatchReport {
    pub fn from_outcome(outcome: &BatchOutcome, baseline: &CountryCode) -> Self {
        let mut tally = StatusTally::default();
        let mut by_country: BTreeMap<CountryCode, CountryAccumulator> = BTreeMap::new();

        for search in &outcome.searches {
            by_country.entry(search.country.clone()).or_default();
        }

        for record in &outcome.records {
            tally.observe(record);
            by_country
                .entry(record.patent.country.clone())
                .or_default()
                .observe(record);
        }

        let countries: Vec<CountrySummary> = by_country
            .into_iter()
            .map(|(country, accumulator)| accumulator.finish(country))
            .collect();

        let mut grades = GradeDistribution::default();
        for summary in &countries {
            grades.merge(&summary.grades);
        }

        let mut records: Vec<RecordView> =
            outcome.records.iter().map(RecordView::from_record).collect();
        records.sort_by(|a, b| {
            b.weighted_score
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.weighted_score.unwrap_or(f64::NEG_INFINITY))
                .then_with(|| a.patent_id.cmp(&b.patent_id))
        });

        Self {
            query: outcome.query.clone(),
            generated_at: Utc::now(),
            cancelled: outcome.cancelled,
            judge_overrides: countries.iter().map(|summary| summary.judge_overrides).sum(),
            insufficient_data: countries.iter().map(|summary| summary.insufficient_data).sum(),
            gap_analysis: gap_analysis(&countries, baseline),
            tally,
            searches: outcome.searches.clone(),
            countries,
            grades,
            records,
        }
    }
}
