//! Read/write report JSON files.
//!
//! A report JSON is the "portable" representation of a run:
//! - thresholds used for classification
//! - city summaries with ROAS
//! - ranked regression results and excluded cities
//!
//! The schema is defined by `domain::ReportFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::ReportFile;
use crate::error::AppError;

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::io(format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile = serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::analyze_dataset;
    use crate::domain::Thresholds;
    use crate::io::ingest::read_dataset;

    #[test]
    fn report_survives_write_and_read() {
        let csv = "city,date,cost,response\nA,2024-01-01,10,20\nB,2024-01-01,10,20\nB,2024-01-02,20,38\nB,2024-01-03,30,62\n";
        let run = analyze_dataset(read_dataset(csv.as_bytes()).unwrap(), Thresholds::default()).unwrap();
        let report = run.to_report_file(Path::new("input.csv"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&path, &report).unwrap();
        let back = read_report_json(&path).unwrap();

        assert_eq!(back.summaries, report.summaries);
        assert_eq!(back.skipped, report.skipped);
        assert_eq!(back.ranked.len(), 1);
        assert_eq!(back.ranked[0].category, report.ranked[0].category);
    }

    #[test]
    fn invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_report_json(&path).unwrap_err().exit_code(), 2);
    }
}
