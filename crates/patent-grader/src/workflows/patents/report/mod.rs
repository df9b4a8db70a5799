mod insights;
mod summary;
pub mod views;

pub use summary::{BatchReport, CountrySummary, GradeDistribution, StatusTally};
pub use views::{CountryGap, GapAnalysis, GapStatus, RecordView};
