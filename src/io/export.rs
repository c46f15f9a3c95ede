//! Export city summaries and regression results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::domain::{CitySummary, ClassifiedCity};
use crate::error::AppError;

/// Write one row per city: totals, means, count and ROAS.
pub fn write_summary_csv(path: &Path, summaries: &[CitySummary]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record([
            "city",
            "total_cost",
            "total_response",
            "avg_cost",
            "avg_response",
            "count",
            "roas",
        ])
        .map_err(|e| write_err(path, e))?;

    for s in summaries {
        writer
            .write_record([
                s.city.clone(),
                format!("{:.6}", s.total_cost),
                format!("{:.6}", s.total_response),
                format!("{:.6}", s.avg_cost),
                format!("{:.6}", s.avg_response),
                s.count.to_string(),
                format!("{:.6}", s.roas),
            ])
            .map_err(|e| write_err(path, e))?;
    }

    writer.flush().map_err(|e| write_err(path, e))
}

/// Write ranked regression results, in ranked order.
pub fn write_results_csv(path: &Path, ranked: &[ClassifiedCity]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    writer
        .write_record([
            "city",
            "n",
            "intercept",
            "slope",
            "p_value",
            "r_squared",
            "category",
            "interpretation",
        ])
        .map_err(|e| write_err(path, e))?;

    for c in ranked {
        let r = &c.regression;
        writer
            .write_record([
                r.city.clone(),
                r.n.to_string(),
                format!("{:.10}", r.intercept),
                format!("{:.10}", r.slope),
                format!("{:.10}", r.p_value),
                format!("{:.10}", r.r_squared),
                c.category.as_str().to_string(),
                c.interpretation.clone(),
            ])
            .map_err(|e| write_err(path, e))?;
    }

    writer.flush().map_err(|e| write_err(path, e))
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(file))
}

fn write_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::io(format!("Failed to write export CSV '{}': {e}", path.display()))
}
