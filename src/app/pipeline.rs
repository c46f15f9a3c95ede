//! Shared analysis pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV load -> clean -> city summaries -> per-city regression -> classify/rank
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::Path;

use tracing::info;

use crate::domain::{AnalysisConfig, CitySummary, ClassifiedCity, ReportFile, SkippedCity, Thresholds};
use crate::error::AppError;
use crate::io::ingest::Dataset;

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub thresholds: Thresholds,
    /// One per city, sorted by city name.
    pub summaries: Vec<CitySummary>,
    /// Regressed cities, ascending p-value then city name.
    pub ranked: Vec<ClassifiedCity>,
    /// Cities excluded from regression, sorted by city name.
    pub skipped: Vec<SkippedCity>,
}

impl RunOutput {
    pub fn ranked_for(&self, city: &str) -> Option<&ClassifiedCity> {
        self.ranked.iter().find(|c| c.regression.city == city)
    }

    pub fn skipped_for(&self, city: &str) -> Option<&SkippedCity> {
        self.skipped.iter().find(|s| s.city == city)
    }

    /// Portable JSON form of this run.
    pub fn to_report_file(&self, input: &Path) -> ReportFile {
        ReportFile {
            tool: "geo".to_string(),
            input: input.to_path_buf(),
            thresholds: self.thresholds,
            summaries: self.summaries.clone(),
            ranked: self.ranked.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Load the configured CSV and run the full analysis.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let dataset = crate::io::ingest::load_dataset(&config.csv_path)?;
    analyze_dataset(dataset, config.thresholds)
}

/// Run the analysis on an already-cleaned dataset.
pub fn analyze_dataset(dataset: Dataset, thresholds: Thresholds) -> Result<RunOutput, AppError> {
    // 1) City summaries + ROAS. A zero total cost aborts the run.
    let summaries = crate::analysis::summarize_cities(&dataset.records)?;

    // 2) Per-city regressions; failures are scoped to their city.
    let regressions = crate::fit::regress_cities(&dataset.records);

    // 3) Classify and rank by p-value.
    let ranked = crate::fit::rank(regressions.results, &thresholds);

    info!(
        cities = summaries.len(),
        regressed = ranked.len(),
        skipped = regressions.skipped.len(),
        "analysis complete"
    );

    Ok(RunOutput {
        dataset,
        thresholds,
        summaries,
        ranked,
        skipped: regressions.skipped,
    })
}
