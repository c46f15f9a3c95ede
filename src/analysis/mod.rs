//! Aggregate statistics over the cleaned dataset.

pub mod aggregate;

pub use aggregate::{roas, summarize_cities};
