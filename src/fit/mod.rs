//! Per-city regression and significance classification.
//!
//! - `regression`: OLS of response on cost per city, p-value and R²
//! - `classify`: category + interpretation, ranking by p-value

pub mod classify;
pub mod regression;

pub use classify::{classify, classify_city, rank};
pub use regression::{RegressionError, RegressionRun, regress_cities, regress_city};
