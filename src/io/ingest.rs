//! CSV ingest and cleaning.
//!
//! This module turns a geo-experiment CSV (`city,date,cost,response`) into a
//! clean, typed `Dataset`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Fail fast** on the first malformed row (exit code 3, line + city in the message)
//! - **Deterministic behavior**: records keep input order
//! - **Separation of concerns**: no aggregation or regression logic here

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::Record;
use crate::error::{AppError, ErrorKind};

const REQUIRED_COLUMNS: [&str; 4] = ["city", "date", "cost", "response"];

/// Summary stats about the rows read and kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub rows_read: usize,
    pub rows_used: usize,
    /// Rows removed because `cost` was exactly zero.
    pub zero_cost_dropped: usize,
    pub n_cities: usize,
    pub date_min: NaiveDate,
    pub date_max: NaiveDate,
}

/// Cleaned records in input order plus ingest stats.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub stats: DatasetStats,
}

/// Load and clean a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    info!(path = %path.display(), "loading dataset");
    read_dataset(file)
}

/// Parse and clean CSV content from any reader.
pub fn read_dataset<R: Read>(input: R) -> Result<Dataset, AppError> {
    // Fields are trimmed, so `" A"` and `"A"` are the same city.
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut records = Vec::new();
    let mut rows_read = 0usize;
    let mut zero_cost_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let row = result.map_err(|e| AppError::parse(format!("Line {line}: CSV parse error: {e}")))?;
        let record = parse_row(&row, &header_map).map_err(|e| match e.city {
            Some(city) => AppError::parse(format!("Line {line} (city '{city}'): {}", e.message)),
            None => AppError::parse(format!("Line {line}: {}", e.message)),
        })?;

        if record.cost == 0.0 {
            zero_cost_dropped += 1;
            continue;
        }
        records.push(record);
    }

    debug!(rows_read, zero_cost_dropped, "parsed rows");

    let stats = compute_stats(&records, rows_read, zero_cost_dropped).ok_or_else(|| {
        AppError::new(
            ErrorKind::EmptyDataset,
            "No records remain after dropping zero-cost rows.",
        )
    })?;

    info!(
        rows_used = stats.rows_used,
        cities = stats.n_cities,
        "dataset cleaned"
    );

    Ok(Dataset { records, stats })
}

/// A row-level failure; `city` is filled in once the city column parsed.
#[derive(Debug)]
struct RowError {
    city: Option<String>,
    message: String,
}

impl RowError {
    fn new(city: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            city: city.map(str::to_string),
            message: message.into(),
        }
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::config(format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<Record, RowError> {
    let city = get_required(record, header_map, "city").map_err(|m| RowError::new(None, m))?;
    let ctx = Some(city);

    let date = get_required(record, header_map, "date")
        .and_then(parse_date)
        .map_err(|m| RowError::new(ctx, m))?;

    let cost = get_required(record, header_map, "cost")
        .and_then(|s| parse_number(s, "cost"))
        .map_err(|m| RowError::new(ctx, m))?;

    let response = get_required(record, header_map, "response")
        .and_then(|s| parse_number(s, "response"))
        .map_err(|m| RowError::new(ctx, m))?;
    if response < 0.0 {
        return Err(RowError::new(
            ctx,
            format!("Invalid `response` {response}: must be non-negative."),
        ));
    }

    Ok(Record {
        city: city.to_string(),
        date,
        cost,
        response,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

/// Parse a number after removing thousands separators (`1,234` → `1234`).
pub fn parse_number(s: &str, column: &str) -> Result<f64, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| !(*c == ',' || *c == '_' || c.is_whitespace()))
        .collect();
    let v = cleaned
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{column}` value '{s}': not a number."))?;
    if !v.is_finite() {
        return Err(format!("Invalid `{column}` value '{s}': not finite."));
    }
    Ok(v)
}

/// Parse a date, accepting a few common layouts and full timestamps.
///
/// Ambiguous `01/02/2024` style dates are read month-first; day-first is the
/// fallback when the first field cannot be a month (`13/02/2024`).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 6] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    const TS_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in TS_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, DD/MM/YYYY, MM-DD-YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

fn compute_stats(records: &[Record], rows_read: usize, zero_cost_dropped: usize) -> Option<DatasetStats> {
    let date_min = records.iter().map(|r| r.date).min()?;
    let date_max = records.iter().map(|r| r.date).max()?;
    let n_cities = records.iter().map(|r| r.city.as_str()).collect::<BTreeSet<_>>().len();

    Some(DatasetStats {
        rows_read,
        rows_used: records.len(),
        zero_cost_dropped,
        n_cities,
        date_min,
        date_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> Result<Dataset, AppError> {
        read_dataset(csv.as_bytes())
    }

    #[test]
    fn strips_thousands_separators() {
        let data = load("city,date,cost,response\nA,2024-01-01,10,\"1,234\"\nA,2024-01-02,5,987\n").unwrap();
        assert_eq!(data.records[0].response, 1234.0);
        assert_eq!(data.records[1].response, 987.0);
    }

    #[test]
    fn drops_zero_cost_rows() {
        let data = load("city,date,cost,response\nA,2024-01-01,0,5\nA,2024-01-02,10,20\n").unwrap();
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.stats.rows_read, 2);
        assert_eq!(data.stats.zero_cost_dropped, 1);
        assert!(data.records.iter().all(|r| r.cost != 0.0));
    }

    #[test]
    fn header_names_are_case_insensitive_and_bom_tolerant() {
        let data = load("\u{feff}City,DATE,Cost,Response,extra\nA,2024-01-01,1,2,x\n").unwrap();
        assert_eq!(data.records[0].city, "A");
        assert_eq!(data.stats.n_cities, 1);
    }

    #[test]
    fn missing_column_is_config_error() {
        let err = load("city,date,cost\nA,2024-01-01,1\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains("response"));
    }

    #[test]
    fn bad_response_fails_fast_with_line_and_city() {
        let err = load("city,date,cost,response\nA,2024-01-01,1,2\nB,2024-01-02,1,abc\nC,2024-01-03,1,2\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.message().contains("Line 3"), "{}", err.message());
        assert!(err.message().contains("'B'"), "{}", err.message());
    }

    #[test]
    fn bad_date_is_parse_error() {
        let err = load("city,date,cost,response\nA,not-a-date,1,2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn negative_response_is_rejected() {
        let err = load("city,date,cost,response\nA,2024-01-01,1,-2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn all_zero_cost_is_empty_dataset() {
        let err = load("city,date,cost,response\nA,2024-01-01,0,2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDataset);
    }

    #[test]
    fn accepts_timestamps_and_slash_dates() {
        assert_eq!(
            parse_date("2024-03-05 12:30:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        // Month-first when ambiguous, day-first when the first field exceeds 12.
        assert_eq!(
            parse_date("01/02/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(
            parse_date("13/02/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 13).unwrap()
        );
        assert_eq!(
            parse_date("03-05-2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn surrounding_whitespace_does_not_split_cities() {
        let data = load("city,date,cost,response\n A ,2024-01-01,1,2\nA,2024-01-02,3,4\n").unwrap();
        assert_eq!(data.stats.n_cities, 1);
        assert!(data.records.iter().all(|r| r.city == "A"));
    }

    #[test]
    fn date_range_in_stats() {
        let data = load("city,date,cost,response\nA,2024-01-05,1,2\nB,2024-01-01,1,2\n").unwrap();
        assert_eq!(data.stats.date_min, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(data.stats.date_max, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(data.stats.n_cities, 2);
    }
}
