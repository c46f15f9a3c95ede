//! City-level aggregation and ROAS.
//!
//! Records are folded into an ordered map keyed by city, so summaries come
//! out sorted by city name regardless of input order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{CitySummary, Record};
use crate::error::{AppError, ErrorKind};

#[derive(Debug, Default)]
struct Totals {
    cost: f64,
    response: f64,
    count: usize,
}

/// Sum, mean, count and ROAS per city.
///
/// Fails if a city's total cost is zero: ROAS would be undefined.
pub fn summarize_cities(records: &[Record]) -> Result<Vec<CitySummary>, AppError> {
    let totals = records.iter().fold(BTreeMap::<&str, Totals>::new(), |mut acc, r| {
        let t = acc.entry(r.city.as_str()).or_default();
        t.cost += r.cost;
        t.response += r.response;
        t.count += 1;
        acc
    });

    totals
        .into_iter()
        .map(|(city, t)| -> Result<CitySummary, AppError> {
            let roas = roas(t.response, t.cost).ok_or_else(|| {
                AppError::new(
                    ErrorKind::DivisionByZero,
                    format!("City '{city}': total cost is 0, ROAS is undefined."),
                )
            })?;
            let n = t.count as f64;
            debug!(city, total_cost = t.cost, total_response = t.response, roas, "summarized city");
            Ok(CitySummary {
                city: city.to_string(),
                total_cost: t.cost,
                total_response: t.response,
                avg_cost: t.cost / n,
                avg_response: t.response / n,
                count: t.count,
                roas,
            })
        })
        .collect()
}

/// Return on ad spend, `None` when `total_cost` is zero.
pub fn roas(total_response: f64, total_cost: f64) -> Option<f64> {
    if total_cost == 0.0 {
        return None;
    }
    Some(total_response / total_cost)
}
