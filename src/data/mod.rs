//! Data sources other than user CSV files.

pub mod sample;

pub use sample::{SampleConfig, format_thousands, generate_sample, write_sample_csv};
