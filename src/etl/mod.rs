//! ETL pipeline: CSV ingest and batch derivation
//!
//! Two stages, mirrored by the two store tables. The loader streams the
//! health-check export into the raw table in bounded chunks; the batch
//! processor pages through the raw table, scores every record with the
//! guideline evaluator and persists the derived table page by page.

pub mod loader;
pub mod mapping;
pub mod processor;

pub use loader::{CsvLoader, LoadSummary};
pub use mapping::{COLUMN_MAPPING, HeaderMap};
pub use processor::{BatchProcessor, ProcessSummary};
