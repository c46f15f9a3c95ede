//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation and regression
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::fit::regression::RegressionError;

/// Default significance level for the slope p-value (exclusive).
pub const DEFAULT_P_THRESHOLD: f64 = 0.05;

/// Default R² level separating strong from weak fits (inclusive).
pub const DEFAULT_R2_THRESHOLD: f64 = 0.5;

/// One cleaned observation: spend and response for a city on a date.
///
/// After ingest `cost != 0` and `response` is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub city: String,
    pub date: NaiveDate,
    pub cost: f64,
    pub response: f64,
}

/// Per-city aggregate, including return on ad spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub city: String,
    pub total_cost: f64,
    pub total_response: f64,
    pub avg_cost: f64,
    pub avg_response: f64,
    pub count: usize,
    pub roas: f64,
}

/// OLS fit of `response = intercept + slope * cost` for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRegression {
    pub city: String,
    pub n: usize,
    pub intercept: f64,
    pub slope: f64,
    /// Two-sided p-value for `slope = 0`.
    pub p_value: f64,
    pub r_squared: f64,
}

impl CityRegression {
    pub fn predict(&self, cost: f64) -> f64 {
        self.intercept + self.slope * cost
    }
}

/// Interpretation bucket for a city's regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SignificantStrong,
    SignificantWeak,
    NotSignificant,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::SignificantStrong => "significant_strong",
            Category::SignificantWeak => "significant_weak",
            Category::NotSignificant => "not_significant",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regression result with its category and a sentence for humans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCity {
    #[serde(flatten)]
    pub regression: CityRegression,
    pub category: Category,
    pub interpretation: String,
}

/// A city left out of the ranked report, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCity {
    pub city: String,
    pub reason: RegressionError,
}

/// Classification cut-offs.
///
/// `p_value` is exclusive (`p < p_value` is significant) and `r_squared` is
/// inclusive (`r2 >= r_squared` is strong).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub p_value: f64,
    pub r_squared: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            p_value: DEFAULT_P_THRESHOLD,
            r_squared: DEFAULT_R2_THRESHOLD,
        }
    }
}

/// Color palette used by the SVG and TUI renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Viridis,
    Magma,
    Mono,
}

impl Palette {
    /// Anchor colors (RGB) sampled along the palette.
    pub fn anchors(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
            Palette::Magma => &[
                (0, 0, 4),
                (81, 18, 124),
                (183, 55, 121),
                (252, 137, 97),
                (252, 253, 191),
            ],
            Palette::Mono => &[(40, 40, 40), (120, 120, 120), (190, 190, 190)],
        }
    }

    /// Color for item `i` of `n`, spread evenly across the palette.
    pub fn color(self, i: usize, n: usize) -> (u8, u8, u8) {
        let anchors = self.anchors();
        if n <= 1 {
            return anchors[anchors.len() / 2];
        }
        let u = i.min(n - 1) as f64 / (n - 1) as f64;
        let pos = u * (anchors.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(anchors.len() - 1);
        let frac = pos - lo as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (anchors[lo], anchors[hi]);
        (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

/// Styling passed explicitly to every chart renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Chart width in columns (ASCII) or pixels / 10 (SVG).
    pub width: usize,
    /// Chart height in rows (ASCII) or pixels / 10 (SVG).
    pub height: usize,
    /// Number of per-city facets per row.
    pub facet_cols: usize,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 20,
            facet_cols: 3,
            palette: Palette::Viridis,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment, and defaults.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub csv_path: PathBuf,
    pub thresholds: Thresholds,
    /// Rows shown in the ranked regression table.
    pub top_n: usize,
    pub plot: bool,
    pub render: RenderConfig,

    pub export_summary: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_report: Option<PathBuf>,
    pub svg_dir: Option<PathBuf>,
}

/// A saved analysis report (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub input: PathBuf,
    pub thresholds: Thresholds,
    pub summaries: Vec<CitySummary>,
    pub ranked: Vec<ClassifiedCity>,
    pub skipped: Vec<SkippedCity>,
}
