//! Formatted terminal output: summary, ranking, interpretation and ROAS tables.
//!
//! We keep formatting code in one place so:
//! - the aggregation/regression code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use std::path::Path;

use crate::app::pipeline::RunOutput;
use crate::domain::{CitySummary, ClassifiedCity, SkippedCity, Thresholds};
use crate::io::ingest::DatasetStats;

const CITY_W: usize = 20;

/// Format the run header (input + dataset stats + thresholds).
pub fn format_run_header(input: &Path, stats: &DatasetStats, thresholds: &Thresholds) -> String {
    let mut out = String::new();

    out.push_str("=== geo - Geo Experiment Analysis ===\n");
    out.push_str(&format!("Input: {}\n", input.display()));
    out.push_str(&format!(
        "Rows: read={} | used={} | dropped (cost=0)={}\n",
        stats.rows_read, stats.rows_used, stats.zero_cost_dropped
    ));
    out.push_str(&format!(
        "Cities: {} | dates: {} .. {}\n",
        stats.n_cities, stats.date_min, stats.date_max
    ));
    out.push_str(&format!(
        "Thresholds: p < {} | R² >= {}\n",
        thresholds.p_value, thresholds.r_squared
    ));

    out
}

/// Format the per-city summary table.
pub fn format_city_summary(summaries: &[CitySummary]) -> String {
    let mut out = String::new();
    out.push_str("City Summary:\n");
    push_row(
        &mut out,
        format!(
            "{:<CITY_W$} {:>14} {:>16} {:>12} {:>14} {:>6} {:>8}",
            "city", "total_cost", "total_response", "avg_cost", "avg_response", "count", "ROAS"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<CITY_W$} {:-<14} {:-<16} {:-<12} {:-<14} {:-<6} {:-<8}",
            "", "", "", "", "", "", ""
        ),
    );
    for s in summaries {
        push_row(
            &mut out,
            format!(
                "{:<CITY_W$} {:>14.2} {:>16.2} {:>12.2} {:>14.2} {:>6} {:>8.3}",
                truncate(&s.city, CITY_W),
                s.total_cost,
                s.total_response,
                s.avg_cost,
                s.avg_response,
                s.count,
                s.roas,
            ),
        );
    }
    out
}

/// Format the ranked regression table (top-N rows).
pub fn format_rankings(ranked: &[ClassifiedCity], top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Regression by city (top {} of {}, sorted by p-value):\n",
        top_n.min(ranked.len()),
        ranked.len()
    ));
    push_row(
        &mut out,
        format!(
            "{:<CITY_W$} {:>5} {:>10} {:>10} {:>10} {:<18}",
            "city", "n", "slope", "p_value", "r_squared", "category"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<CITY_W$} {:-<5} {:-<10} {:-<10} {:-<10} {:-<18}",
            "", "", "", "", "", ""
        ),
    );
    for c in ranked.iter().take(top_n) {
        let r = &c.regression;
        push_row(
            &mut out,
            format!(
                "{:<CITY_W$} {:>5} {:>10.4} {:>10.4} {:>10.4} {:<18}",
                truncate(&r.city, CITY_W),
                r.n,
                r.slope,
                r.p_value,
                r.r_squared,
                c.category.as_str(),
            ),
        );
    }
    out
}

/// One interpretation sentence per ranked city.
pub fn format_interpretations(ranked: &[ClassifiedCity]) -> String {
    let mut out = String::new();
    out.push_str("Interpretation:\n");
    for c in ranked {
        out.push_str(&c.interpretation);
        out.push('\n');
    }
    out
}

/// Cities excluded from regression, with reasons.
pub fn format_skipped(skipped: &[SkippedCity]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str("Excluded from regression:\n");
    for s in skipped {
        out.push_str(&format!("- {}: {}\n", s.city, s.reason));
    }
    out
}

/// ROAS per city.
pub fn format_roas(summaries: &[CitySummary]) -> String {
    let mut out = String::new();
    out.push_str("ROAS by City:\n");
    push_row(&mut out, format!("{:<CITY_W$} {:>10}", "city", "ROAS"));
    push_row(&mut out, format!("{:-<CITY_W$} {:-<10}", "", ""));
    for s in summaries {
        push_row(
            &mut out,
            format!("{:<CITY_W$} {:>10.4}", truncate(&s.city, CITY_W), s.roas),
        );
    }
    out
}

/// Everything `geo analyze` prints before charts.
pub fn format_full_report(run: &RunOutput, input: &Path, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format_run_header(input, &run.dataset.stats, &run.thresholds));
    out.push('\n');
    out.push_str(&format_city_summary(&run.summaries));
    out.push('\n');
    out.push_str(&format_rankings(&run.ranked, top_n));
    out.push('\n');
    out.push_str(&format_interpretations(&run.ranked));
    let skipped = format_skipped(&run.skipped);
    if !skipped.is_empty() {
        out.push('\n');
        out.push_str(&skipped);
    }
    out.push('\n');
    out.push_str(&format_roas(&run.summaries));
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, CityRegression};
    use crate::fit::RegressionError;

    fn summary(city: &str, roas: f64) -> CitySummary {
        CitySummary {
            city: city.to_string(),
            total_cost: 100.0,
            total_response: 100.0 * roas,
            avg_cost: 50.0,
            avg_response: 50.0 * roas,
            count: 2,
            roas,
        }
    }

    #[test]
    fn roas_table_snapshot() {
        let txt = format_roas(&[summary("Lima", 2.0), summary("Oslo", 1.25)]);
        let expected = concat!(
            "ROAS by City:\n",
            "city                       ROAS\n",
            "-------------------- ----------\n",
            "Lima                     2.0000\n",
            "Oslo                     1.2500\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn rankings_respect_top_n() {
        let ranked: Vec<ClassifiedCity> = ["A", "B", "C"]
            .iter()
            .map(|c| ClassifiedCity {
                regression: CityRegression {
                    city: c.to_string(),
                    n: 5,
                    intercept: 0.0,
                    slope: 1.0,
                    p_value: 0.5,
                    r_squared: 0.1,
                },
                category: Category::NotSignificant,
                interpretation: String::new(),
            })
            .collect();
        let txt = format_rankings(&ranked, 2);
        assert!(txt.starts_with("Regression by city (top 2 of 3"));
        assert_eq!(txt.lines().count(), 1 + 2 + 2);
        assert!(!txt.contains("\nC "));
    }

    #[test]
    fn skipped_lists_reasons() {
        let txt = format_skipped(&[SkippedCity {
            city: "C".to_string(),
            reason: RegressionError::DegenerateRegression,
        }]);
        assert_eq!(
            txt,
            "Excluded from regression:\n- C: degenerate regression: cost has zero variance\n"
        );
        assert!(format_skipped(&[]).is_empty());
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Philadelphia", 6), "Phila.");
        assert_eq!(truncate("Rome", 6), "Rome");
    }
}
