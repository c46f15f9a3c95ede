//! Synthetic geo-experiment data.
//!
//! Each city gets a random baseline response and a random lift per unit of spend.
//! Two cities are special so that a generated file exercises every outcome:
//! - the second city has no lift (response is baseline + noise)
//! - the third city spends the same amount every day (regression is degenerate)
//!
//! Every seventh day is a holdout day with zero spend in every city; the loader drops those rows.

use std::fs::File;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Record;
use crate::error::{AppError, ErrorKind};

const CITY_NAMES: [&str; 12] = [
    "Austin", "Boston", "Chicago", "Denver", "Houston", "Miami", "Nashville", "Phoenix", "Portland",
    "Raleigh", "Seattle", "Tampa",
];

const NO_LIFT_CITY: usize = 1;
const CONSTANT_SPEND_CITY: usize = 2;
const HOLDOUT_EVERY: usize = 7;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub cities: usize,
    pub days: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            cities: 6,
            days: 56,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

/// Generate a deterministic set of records for `config.seed`.
pub fn generate_sample(config: &SampleConfig) -> Result<Vec<Record>, AppError> {
    if config.cities == 0 {
        return Err(AppError::config("Sample city count must be > 0."));
    }
    if config.days == 0 {
        return Err(AppError::config("Sample day count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(config.cities * config.days);

    for idx in 0..config.cities {
        let city = city_name(idx);
        let baseline: f64 = rng.gen_range(2_000.0..20_000.0);
        let lift: f64 = if idx == NO_LIFT_CITY {
            0.0
        } else {
            rng.gen_range(0.5..4.0)
        };
        let noise = Normal::new(0.0, 0.15 * baseline)
            .map_err(|e| AppError::new(ErrorKind::Config, format!("Noise distribution error: {e}")))?;
        let fixed_spend = round2(rng.gen_range(500.0..5_000.0));

        for day in 0..config.days {
            let date = config.start + Duration::days(day as i64);
            let cost = if day % HOLDOUT_EVERY == HOLDOUT_EVERY - 1 {
                0.0
            } else if idx == CONSTANT_SPEND_CITY {
                fixed_spend
            } else {
                round2(rng.gen_range(500.0..5_000.0))
            };
            let response = round2((baseline + lift * cost + noise.sample(&mut rng)).max(0.0));

            records.push(Record {
                city: city.clone(),
                date,
                cost,
                response,
            });
        }
    }

    Ok(records)
}

/// Write records as `city,date,cost,response`, responses with thousands separators.
pub fn write_sample_csv(path: &Path, records: &[Record]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    let write_err = |e: csv::Error| AppError::io(format!("Failed to write sample CSV: {e}"));

    writer
        .write_record(["city", "date", "cost", "response"])
        .map_err(write_err)?;
    for r in records {
        writer
            .write_record([
                r.city.clone(),
                r.date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", r.cost),
                format_thousands(r.response),
            ])
            .map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write sample CSV: {e}")))
}

/// Format with two decimals and `,` between thousands groups (`1234567.891` -> `1,234,567.89`).
pub fn format_thousands(value: f64) -> String {
    let digits = format!("{:.2}", value.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut out = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
    if value < 0.0 && digits != "0.00" {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('.');
    out.push_str(frac_part);
    out
}

fn city_name(idx: usize) -> String {
    match CITY_NAMES.get(idx) {
        Some(name) => (*name).to_string(),
        None => format!("City {:02}", idx + 1),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::analyze_dataset;
    use crate::domain::Thresholds;
    use crate::fit::RegressionError;
    use crate::io::ingest::load_dataset;

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(987.0), "987.00");
        assert_eq!(format_thousands(1234.0), "1,234.00");
        assert_eq!(format_thousands(1_234_567.891), "1,234,567.89");
        assert_eq!(format_thousands(-4321.5), "-4,321.50");
        assert_eq!(format_thousands(0.0), "0.00");
    }

    #[test]
    fn same_seed_same_records() {
        let config = SampleConfig::default();
        let a = generate_sample(&config).unwrap();
        let b = generate_sample(&config).unwrap();
        assert_eq!(a, b);

        let other = generate_sample(&SampleConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn holdout_days_have_zero_spend() {
        let config = SampleConfig {
            cities: 2,
            days: 14,
            ..SampleConfig::default()
        };
        let records = generate_sample(&config).unwrap();
        assert_eq!(records.len(), 28);
        let zero = records.iter().filter(|r| r.cost == 0.0).count();
        assert_eq!(zero, 4);
        assert!(records.iter().all(|r| r.response >= 0.0));
    }

    #[test]
    fn rejects_empty_config() {
        let config = SampleConfig {
            cities: 0,
            ..SampleConfig::default()
        };
        assert_eq!(generate_sample(&config).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn written_sample_loads_and_analyzes() {
        let config = SampleConfig::default();
        let records = generate_sample(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        write_sample_csv(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("city,date,cost,response\n"));
        assert!(text.contains('"'), "responses above 999 are quoted because of separators");

        let dataset = load_dataset(&path).unwrap();
        let holdout = records.iter().filter(|r| r.cost == 0.0).count();
        assert_eq!(dataset.stats.zero_cost_dropped, holdout);
        assert_eq!(dataset.stats.rows_used, records.len() - holdout);
        assert_eq!(dataset.stats.n_cities, config.cities);

        let run = analyze_dataset(dataset, Thresholds::default()).unwrap();
        assert_eq!(run.summaries.len(), config.cities);
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].city, "Chicago");
        assert_eq!(run.skipped[0].reason, RegressionError::DegenerateRegression);
        assert_eq!(run.ranked.len(), config.cities - 1);
    }
}
