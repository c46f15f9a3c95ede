//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - cleaned observations (`Record`)
//! - derived per-city outputs (`CitySummary`, `CityRegression`, `ClassifiedCity`)
//! - run configuration (`AnalysisConfig`, `Thresholds`, `RenderConfig`)

pub mod types;

pub use types::*;
