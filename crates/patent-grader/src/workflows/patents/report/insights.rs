use super::summary::CountrySummary;
use super::views::{CountryGap, GapAnalysis, GapStatus};
use crate::workflows::patents::domain::CountryCode;

/// Compares every country with successful analyses against the baseline.
/// Returns `None` when the baseline itself has no scored patents.
pub(crate) fn gap_analysis(
    countries: &[CountrySummary],
    baseline: &CountryCode,
) -> Option<GapAnalysis> {
    let reference = countries
        .iter()
        .find(|summary| &summary.country == baseline)?;
    let (base_originality, base_market, base_suitability) = averages(reference)?;

    let mut gaps: Vec<CountryGap> = countries
        .iter()
        .filter(|summary| &summary.country != baseline)
        .filter_map(|summary| {
            let (originality, market, suitability) = averages(summary)?;
            let originality_gap = originality - base_originality;
            let market_gap = market - base_market;
            let suitability_gap = suitability - base_suitability;
            let overall_gap = (originality_gap + market_gap + suitability_gap) / 3.0;

            Some(CountryGap {
                country: summary.country.clone(),
                originality_gap,
                market_gap,
                suitability_gap,
                overall_gap,
                status: if overall_gap > 0.0 {
                    GapStatus::Leading
                } else {
                    GapStatus::Behind
                },
            })
        })
        .collect();

    gaps.sort_by(|a, b| {
        b.overall_gap
            .total_cmp(&a.overall_gap)
            .then_with(|| a.country.cmp(&b.country))
    });

    Some(GapAnalysis {
        baseline: baseline.clone(),
        gaps,
    })
}

fn averages(summary: &CountrySummary) -> Option<(f64, f64, f64)> {
    Some((
        summary.average_originality?,
        summary.average_market?,
        summary.average_suitability?,
    ))
}
