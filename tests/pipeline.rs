use std::fs;
use std::path::PathBuf;

use geo_lift::app::pipeline::run_analysis;
use geo_lift::domain::{AnalysisConfig, Category, RenderConfig, Thresholds};
use geo_lift::fit::RegressionError;
use geo_lift::io::{read_report_json, write_report_json, write_results_csv, write_summary_csv};
use geo_lift::plot::{SvgInput, write_svg_charts};

const CSV: &str = "\
City,Date,Cost,Response
A,2024-01-01,0,5
A,2024-01-02,10,20
B,2024-01-01,10,20
B,2024-01-02,20,38
B,2024-01-03,30,62
B,2024-01-04,40,81
C,2024-01-01,10,50
C,2024-01-02,10,12
C,2024-01-03,10,80
D,01/01/2024,\"1,234\",987
D,01/02/2024,\"2,000\",1500
D,01/03/2024,\"3,100\",1100
";

fn config(csv_path: PathBuf) -> AnalysisConfig {
    AnalysisConfig {
        csv_path,
        thresholds: Thresholds::default(),
        top_n: 10,
        plot: false,
        render: RenderConfig::default(),
        export_summary: None,
        export_results: None,
        export_report: None,
        svg_dir: None,
    }
}

#[test]
fn csv_to_exports_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("experiment.csv");
    fs::write(&csv_path, CSV).unwrap();

    let run = run_analysis(&config(csv_path.clone())).unwrap();

    assert_eq!(run.dataset.stats.rows_read, 12);
    assert_eq!(run.dataset.stats.zero_cost_dropped, 1);
    assert!(run.dataset.records.iter().all(|r| r.cost != 0.0));

    let cities: Vec<&str> = run.summaries.iter().map(|s| s.city.as_str()).collect();
    assert_eq!(cities, ["A", "B", "C", "D"]);
    let d = &run.summaries[3];
    assert_eq!(d.total_cost, 6334.0);
    assert_eq!(d.total_response, 3587.0);

    // A has one record, C has constant spend; both stay in the summary.
    assert_eq!(run.skipped.len(), 2);
    assert_eq!(run.skipped[0].city, "A");
    assert_eq!(run.skipped[0].reason, RegressionError::InsufficientData { n: 1 });
    assert_eq!(run.skipped[1].city, "C");
    assert_eq!(run.skipped[1].reason, RegressionError::DegenerateRegression);

    assert_eq!(run.ranked[0].regression.city, "B");
    assert_eq!(run.ranked[0].category, Category::SignificantStrong);
    assert!(run.ranked.iter().all(|c| (0.0..=1.0).contains(&c.regression.p_value)));

    let summary_path = dir.path().join("summary.csv");
    let results_path = dir.path().join("results.csv");
    let report_path = dir.path().join("report.json");
    write_summary_csv(&summary_path, &run.summaries).unwrap();
    write_results_csv(&results_path, &run.ranked).unwrap();
    write_report_json(&report_path, &run.to_report_file(&csv_path)).unwrap();

    assert_eq!(fs::read_to_string(&summary_path).unwrap().lines().count(), 5);
    assert_eq!(fs::read_to_string(&results_path).unwrap().lines().count(), 3);

    let report = read_report_json(&report_path).unwrap();
    assert_eq!(report.tool, "geo");
    assert_eq!(report.input, csv_path);
    assert_eq!(report.summaries, run.summaries);
    assert_eq!(report.skipped, run.skipped);
    assert_eq!(report.ranked.len(), run.ranked.len());
}

#[test]
fn svg_charts_from_saved_report() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("experiment.csv");
    fs::write(&csv_path, CSV).unwrap();
    let run = run_analysis(&config(csv_path.clone())).unwrap();
    let report = run.to_report_file(&csv_path);

    let svg_dir = dir.path().join("charts");
    let input = SvgInput {
        records: None,
        summaries: &report.summaries,
        ranked: &report.ranked,
        p_threshold: report.thresholds.p_value,
    };
    let written = write_svg_charts(&svg_dir, &input, &RenderConfig::default()).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["p_values.svg", "r_squared.svg", "roas.svg"]);
    for path in &written {
        assert!(fs::read_to_string(path).unwrap().contains("<svg"));
    }
}

#[test]
fn errors_map_to_exit_codes() {
    let dir = tempfile::tempdir().unwrap();

    let missing = run_analysis(&config(dir.path().join("nope.csv"))).unwrap_err();
    assert_eq!(missing.exit_code(), 2);

    let bad = dir.path().join("bad.csv");
    fs::write(&bad, "city,date,cost,response\nA,2024-01-01,ten,20\n").unwrap();
    let err = run_analysis(&config(bad)).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(err.message().contains("city 'A'"), "{err}");

    let empty = dir.path().join("empty.csv");
    fs::write(&empty, "city,date,cost,response\nA,2024-01-01,0,20\n").unwrap();
    assert_eq!(run_analysis(&config(empty)).unwrap_err().exit_code(), 3);

    let cancel = dir.path().join("cancel.csv");
    fs::write(&cancel, "city,date,cost,response\nA,2024-01-01,5,20\nA,2024-01-02,-5,20\n").unwrap();
    let err = run_analysis(&config(cancel)).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.message().contains('A'));
}
