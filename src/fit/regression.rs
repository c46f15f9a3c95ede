//! Per-city regression of response on cost.
//!
//! For each city we fit `response = a + b * cost` by OLS and report:
//! - R² = 1 - SS_res / SS_tot
//! - the two-sided p-value of `b` under H0: b = 0, using Student's t with
//!   `n - 2` degrees of freedom
//!
//! A city that cannot support a fit (fewer than two records, or a constant
//! cost column) is returned as a `SkippedCity`; it never aborts other cities.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, warn};

use crate::domain::{CityRegression, Record, SkippedCity};
use crate::math::{LineFit, LineFitError, fit_line};

/// Minimum records per city for a regression with intercept.
pub const MIN_RECORDS: usize = 2;

/// Why a city was excluded from the regression report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionError {
    #[error("insufficient data: {n} record(s), at least 2 required")]
    InsufficientData { n: usize },
    #[error("degenerate regression: cost has zero variance")]
    DegenerateRegression,
}

/// Regression outputs for all cities, both sorted by city name.
#[derive(Debug, Clone, Default)]
pub struct RegressionRun {
    pub results: Vec<CityRegression>,
    pub skipped: Vec<SkippedCity>,
}

/// Fit every city in the dataset.
pub fn regress_cities(records: &[Record]) -> RegressionRun {
    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in records {
        let (x, y) = groups.entry(r.city.as_str()).or_default();
        x.push(r.cost);
        y.push(r.response);
    }

    // Cities are independent; the indexed collect keeps BTreeMap order.
    let outcomes: Vec<(String, Result<CityRegression, RegressionError>)> = groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(city, (x, y))| (city.to_string(), regress_city(city, &x, &y)))
        .collect();

    let mut run = RegressionRun::default();
    for (city, outcome) in outcomes {
        match outcome {
            Ok(result) => run.results.push(result),
            Err(reason) => {
                warn!(city = %city, %reason, "city excluded from regression");
                run.skipped.push(SkippedCity { city, reason });
            }
        }
    }
    run
}

/// Fit one city given its cost (`x`) and response (`y`) columns.
pub fn regress_city(city: &str, x: &[f64], y: &[f64]) -> Result<CityRegression, RegressionError> {
    let n = x.len().min(y.len());
    if n < MIN_RECORDS {
        return Err(RegressionError::InsufficientData { n });
    }

    let fit = fit_line(x, y).map_err(|e| match e {
        LineFitError::TooFewPoints => RegressionError::InsufficientData { n },
        LineFitError::ConstantRegressor | LineFitError::NonFinite => {
            RegressionError::DegenerateRegression
        }
    })?;

    let r_squared = r_squared(&fit);
    let p_value = slope_p_value(&fit);
    debug!(
        city,
        n,
        intercept = fit.intercept,
        slope = fit.slope,
        p_value,
        r_squared,
        "fitted city"
    );

    Ok(CityRegression {
        city: city.to_string(),
        n,
        intercept: fit.intercept,
        slope: fit.slope,
        p_value,
        r_squared,
    })
}

fn r_squared(fit: &LineFit) -> f64 {
    // Constant response: nothing to explain.
    if fit.ss_tot <= 0.0 {
        return 0.0;
    }
    (1.0 - fit.ss_res / fit.ss_tot).clamp(0.0, 1.0)
}

fn slope_p_value(fit: &LineFit) -> f64 {
    let df = fit.df_resid();
    if df == 0 || fit.ss_tot <= 0.0 {
        return 1.0;
    }

    let sigma2 = fit.ss_res / df as f64;
    let se = (sigma2 / fit.sxx).sqrt();
    if se <= 0.0 {
        return if fit.slope != 0.0 { 0.0 } else { 1.0 };
    }

    let t = (fit.slope / se).abs();
    if t.is_nan() {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }

    // Upper tail via `sf`: `1 - cdf(t)` rounds to zero for large t.
    match StudentsT::new(0.0, 1.0, df as f64) {
        Ok(dist) => (2.0 * dist.sf(t)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Thresholds;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn rec(city: &str, cost: f64, response: f64) -> Record {
        Record {
            city: city.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            cost,
            response,
        }
    }

    #[test]
    fn three_point_city_fits_strongly() {
        let r = regress_city("B", &[10.0, 20.0, 30.0], &[20.0, 38.0, 62.0]).unwrap();
        assert!(r.r_squared > 0.99, "r2={}", r.r_squared);
        assert!((r.slope - 2.1).abs() < 1e-9);
        // One residual degree of freedom: t = 12.12, p = 2/pi * atan(1/t).
        let expected = 2.0 / std::f64::consts::PI * (1.0 / 12.124_355_652_982_14_f64).atan();
        assert!((r.p_value - expected).abs() < 1e-6, "p={}", r.p_value);
    }

    #[test]
    fn four_point_city_is_significant() {
        let r = regress_city("B", &[10.0, 20.0, 30.0, 40.0], &[20.0, 38.0, 62.0, 81.0]).unwrap();
        assert!(r.r_squared > 0.99);
        assert!(r.p_value < 0.01, "p={}", r.p_value);
    }

    #[test]
    fn identical_costs_are_degenerate() {
        let err = regress_city("C", &[10.0, 10.0, 10.0], &[50.0, 12.0, 80.0]).unwrap_err();
        assert_eq!(err, RegressionError::DegenerateRegression);
    }

    #[test]
    fn single_record_is_insufficient() {
        let err = regress_city("A", &[10.0], &[20.0]).unwrap_err();
        assert_eq!(err, RegressionError::InsufficientData { n: 1 });
    }

    #[test]
    fn two_points_have_no_residual_df() {
        let r = regress_city("D", &[1.0, 2.0], &[3.0, 5.0]).unwrap();
        assert!((r.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn constant_response_has_zero_r2() {
        let r = regress_city("E", &[1.0, 2.0, 3.0], &[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(r.r_squared, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn unrelated_noise_is_not_significant() {
        let r = regress_city(
            "F",
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &[10.0, 2.0, 9.0, 3.0, 8.0, 4.0],
        )
        .unwrap();
        assert!(r.p_value > 0.05, "p={}", r.p_value);
        assert!((0.0..=1.0).contains(&r.r_squared));
    }

    #[test]
    fn failures_are_scoped_to_their_city() {
        let records = vec![
            rec("A", 10.0, 20.0),
            rec("B", 10.0, 20.0),
            rec("B", 20.0, 38.0),
            rec("B", 30.0, 62.0),
            rec("C", 10.0, 50.0),
            rec("C", 10.0, 12.0),
            rec("C", 10.0, 80.0),
        ];
        let run = regress_cities(&records);
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].city, "B");
        assert_eq!(run.skipped.len(), 2);
        assert_eq!(run.skipped[0].city, "A");
        assert_eq!(run.skipped[0].reason, RegressionError::InsufficientData { n: 1 });
        assert_eq!(run.skipped[1].city, "C");
        assert_eq!(run.skipped[1].reason, RegressionError::DegenerateRegression);
    }

    /// 40 points on `response = 3 * cost + 100` plus a fixed wobble scaled by `noise`.
    fn linear_city(city: &str, noise: f64) -> Vec<Record> {
        (1..=40)
            .map(|i| {
                let cost = 10.0 * i as f64;
                let wobble = ((i * 7) % 5) as f64 - 2.0;
                rec(city, cost, 3.0 * cost + 100.0 + noise * wobble)
            })
            .collect()
    }

    #[test]
    fn tiny_p_values_stay_distinct_and_rank_by_size() {
        // t is roughly 189 for Alpha and 1512 for Zeta; both p-values are far below 1e-50.
        let mut records = linear_city("Alpha", 8.0);
        records.extend(linear_city("Zeta", 1.0));

        let run = regress_cities(&records);
        let (alpha, zeta) = (&run.results[0], &run.results[1]);
        assert!(alpha.p_value > 0.0, "alpha p={}", alpha.p_value);
        assert!(zeta.p_value > 0.0, "zeta p={}", zeta.p_value);
        assert!(zeta.p_value < alpha.p_value, "alpha p={} zeta p={}", alpha.p_value, zeta.p_value);

        let ranked = crate::fit::rank(run.results, &Thresholds::default());
        let order: Vec<&str> = ranked.iter().map(|c| c.regression.city.as_str()).collect();
        assert_eq!(order, ["Zeta", "Alpha"]);
    }

    proptest! {
        #[test]
        fn p_value_and_r2_stay_in_unit_interval(
            points in prop::collection::vec((1.0f64..1_000.0, -1.0f64..1.0), 2..120),
            slope in -10.0f64..10.0,
            intercept in -100.0f64..100.0,
            noise in prop_oneof![Just(0.0), 1e-9f64..1e-3, 0.1f64..1_000.0],
        ) {
            let x: Vec<f64> = points.iter().map(|p| p.0).collect();
            let y: Vec<f64> = points.iter().map(|p| intercept + slope * p.0 + noise * p.1).collect();

            match regress_city("P", &x, &y) {
                Ok(r) => {
                    prop_assert!(!r.p_value.is_nan());
                    prop_assert!((0.0..=1.0).contains(&r.p_value), "p={}", r.p_value);
                    prop_assert!((0.0..=1.0).contains(&r.r_squared), "r2={}", r.r_squared);
                }
                Err(e) => prop_assert_eq!(e, RegressionError::DegenerateRegression),
            }
        }
    }

    #[test]
    fn skip_reason_serializes_with_kind_tag() {
        let json = serde_json::to_string(&RegressionError::InsufficientData { n: 1 }).unwrap();
        assert_eq!(json, r#"{"kind":"insufficient_data","n":1}"#);
    }
}
