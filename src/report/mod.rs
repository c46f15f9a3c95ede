//! Reporting utilities: formatted terminal tables for a run.

pub mod format;

pub use format::{
    format_city_summary, format_full_report, format_interpretations, format_rankings, format_roas,
    format_run_header, format_skipped,
};
