use std::path::PathBuf;

use clap::Args;
use patent_grader::config::AppConfig;
use patent_grader::error::AppError;
use patent_grader::workflows::patents::pipeline::SearchStatus;
use patent_grader::workflows::patents::report::views::RecordView;
use patent_grader::workflows::patents::{BatchReport, BatchSubmission, Grade};

use crate::infra::build_service;

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Technology keyword searched in every country
    pub(crate) query: String,
    /// Country codes to search, comma separated (defaults to PIPELINE_COUNTRIES)
    #[arg(long, value_delimiter = ',')]
    pub(crate) countries: Vec<String>,
    /// Patents taken per country
    #[arg(long)]
    pub(crate) top_n: Option<usize>,
    /// Country the gap analysis compares against
    #[arg(long)]
    pub(crate) baseline: Option<String>,
    /// Patent CSV export replacing the bundled sample
    #[arg(long)]
    pub(crate) patents_csv: Option<PathBuf>,
    /// Citation classification CSV replacing the bundled sample
    #[arg(long)]
    pub(crate) citations_csv: Option<PathBuf>,
    /// Reference corpus CSV replacing the bundled sample
    #[arg(long)]
    pub(crate) corpus_csv: Option<PathBuf>,
    /// Skip the qualitative judge step
    #[arg(long)]
    pub(crate) no_judge: bool,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        query,
        countries,
        top_n,
        baseline,
        patents_csv,
        citations_csv,
        corpus_csv,
        no_judge,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if patents_csv.is_some() {
        config.fixtures.patents_csv = patents_csv;
    }
    if citations_csv.is_some() {
        config.fixtures.citations_csv = citations_csv;
    }
    if corpus_csv.is_some() {
        config.fixtures.corpus_csv = corpus_csv;
    }
    if no_judge {
        config.pipeline.judge_enabled = false;
    }

    let service = build_service(&config)?;

    let shutdown = service.shutdown_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; finishing with the records completed so far");
            shutdown.cancel();
        }
    });

    let outcome = service
        .run_batch(BatchSubmission {
            query,
            countries,
            top_n_per_country: top_n,
            baseline,
        })
        .await;
    interrupt.abort();
    let stored = outcome?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&stored.report).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        println!("Batch {}", stored.id);
        render_report(&stored.report);
    }

    Ok(())
}

pub(crate) fn render_report(report: &BatchReport) {
    println!("Patent suitability report: \"{}\"", report.query);
    if report.cancelled {
        println!("Batch was cancelled before every patent finished");
    }
    println!(
        "Records: {} total | {} done | {} failed | {} cancelled",
        report.tally.total, report.tally.done, report.tally.failed, report.tally.cancelled
    );

    println!("\nSearches");
    for search in &report.searches {
        match &search.status {
            SearchStatus::Found { patents } => {
                println!("- {}: {} patents", search.country, patents);
            }
            SearchStatus::Failed { message } => {
                println!("- {}: failed ({})", search.country, message);
            }
            SearchStatus::Cancelled => println!("- {}: cancelled", search.country),
        }
    }

    println!("\nCountry summaries");
    for summary in &report.countries {
        println!(
            "- {}: {}/{} scored | originality {} | market {} | suitability {}",
            summary.country,
            summary.successful,
            summary.records,
            score_label(summary.average_originality),
            score_label(summary.average_market),
            score_label(summary.average_suitability),
        );
        if summary.insufficient_data > 0 || summary.low_confidence > 0 {
            println!(
                "  {} without classified citations, {} with low-confidence market evidence",
                summary.insufficient_data, summary.low_confidence
            );
        }
    }

    let grades: Vec<String> = Grade::ALL
        .iter()
        .map(|grade| format!("{} {}", grade, report.grades.count(*grade)))
        .collect();
    println!("\nGrade distribution: {}", grades.join(" | "));
    if report.judge_overrides > 0 {
        println!(
            "Judge proposed a different grade for {} patents",
            report.judge_overrides
        );
    }

    match &report.gap_analysis {
        Some(analysis) if analysis.gaps.is_empty() => {
            println!("\nGap analysis vs {}: no other country scored", analysis.baseline);
        }
        Some(analysis) => {
            println!("\nGap analysis vs {}", analysis.baseline);
            for gap in &analysis.gaps {
                println!(
                    "- {}: overall {:+.3} ({}) | originality {:+.3} | market {:+.3} | suitability {:+.3}",
                    gap.country,
                    gap.overall_gap,
                    gap.status.label(),
                    gap.originality_gap,
                    gap.market_gap,
                    gap.suitability_gap,
                );
            }
        }
        None => println!("\nGap analysis: baseline country has no scored patents"),
    }

    if report.records.is_empty() {
        println!("\nRanked patents: none");
        return;
    }

    println!("\nRanked patents");
    for view in &report.records {
        render_record(view);
    }
}

fn render_record(view: &RecordView) {
    match (view.grade, view.weighted_score) {
        (Some(grade), Some(score)) => println!(
            "- [{}] {} {:.3} (originality {}, market {}) {}",
            grade,
            view.patent_id,
            score,
            score_label(view.originality),
            score_label(view.market),
            view.title
        ),
        _ => println!("- [{}] {} {}", view.status, view.patent_id, view.title),
    }

    let mut notes = Vec::new();
    if view.insufficient_data {
        notes.push("no classified citations".to_string());
    }
    if view.low_confidence {
        notes.push("low-confidence market evidence".to_string());
    }
    if let Some(revised) = view.revised_grade.filter(|revised| Some(*revised) != view.grade) {
        notes.push(format!("judge proposes {revised}"));
    }
    if let (Some(stage), Some(failure)) = (view.failed_stage, view.failure.as_deref()) {
        notes.push(format!("stopped at {stage}: {failure}"));
    }
    if !view.application_domains.is_empty() {
        notes.push(format!("domains: {}", view.application_domains.join(", ")));
    }
    if !notes.is_empty() {
        println!("  {}", notes.join("; "));
    }
}

fn score_label(score: Option<f64>) -> String {
    score
        .map(|value| format!("{value:.3}"))
        .unwrap_or_else(|| "n/a".to_string())
}
