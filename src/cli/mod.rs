//! Command-line parsing for the geo-experiment analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the statistics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_P_THRESHOLD, DEFAULT_R2_THRESHOLD, Palette};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "geo", version, about = "Geo-experiment analysis: ROAS, per-city regression, significance")]
pub struct Cli {
    /// Log debug detail to stderr (overrides GEO_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a CSV, summarize cities, regress response on cost, and print the full report.
    Analyze(AnalyzeArgs),
    /// Print the city summary and ROAS tables only.
    Summary(AnalyzeArgs),
    /// Print ranked regression results and interpretations only (useful for scripting).
    Rank(AnalyzeArgs),
    /// Plot a previously exported report JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same pipeline as `geo analyze`, but renders results
    /// in a terminal UI using Ratatui.
    Tui(AnalyzeArgs),
    /// Write a synthetic geo-experiment CSV.
    Sample(SampleArgs),
}

/// Common options for analysis commands.
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Input CSV with columns city, date, cost, response.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Show the top-N ranked cities.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Significance threshold on the slope p-value (exclusive).
    #[arg(long, env = "GEO_P_THRESHOLD", default_value_t = DEFAULT_P_THRESHOLD)]
    pub p_threshold: f64,

    /// R² threshold separating strong from weak effects (inclusive).
    #[arg(long = "r2-threshold", env = "GEO_R2_THRESHOLD", default_value_t = DEFAULT_R2_THRESHOLD)]
    pub r2_threshold: f64,

    /// Skip the ASCII plots (shown by default).
    #[arg(long)]
    pub no_plot: bool,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Export the city summary to CSV.
    #[arg(long)]
    pub export_summary: Option<PathBuf>,

    /// Export ranked regression results to CSV.
    #[arg(long)]
    pub export_results: Option<PathBuf>,

    /// Export the whole run (summaries, rankings, skipped cities) to JSON.
    #[arg(long)]
    pub export_report: Option<PathBuf>,

    /// Also write SVG charts into this directory.
    #[arg(long, value_name = "DIR")]
    pub svg_dir: Option<PathBuf>,
}

/// Chart geometry and colors.
#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Number of city panels per facet row.
    #[arg(long, default_value_t = 3)]
    pub facet_cols: usize,

    /// Color palette for SVG and TUI charts.
    #[arg(long, value_enum, default_value_t = Palette::Viridis)]
    pub palette: Palette,
}

/// Options for plotting a saved report.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Report JSON file produced by `geo analyze --export-report`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Also write SVG charts into this directory.
    #[arg(long, value_name = "DIR")]
    pub svg_dir: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of cities.
    #[arg(long, default_value_t = 6)]
    pub cities: usize,

    /// Number of days per city.
    #[arg(long, default_value_t = 56)]
    pub days: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First date of the experiment (YYYY-MM-DD).
    #[arg(long, default_value = "2024-01-01")]
    pub start: NaiveDate,
}
