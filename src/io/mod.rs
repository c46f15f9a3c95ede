//! Input/output helpers.
//!
//! - CSV ingest + cleaning (`ingest`)
//! - CSV table exports (`export`)
//! - report JSON read/write (`report_json`)

pub mod export;
pub mod ingest;
pub mod report_json;

pub use export::*;
pub use ingest::*;
pub use report_json::*;
