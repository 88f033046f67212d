//! Rule-based cardiovascular risk screening over national health-check
//! records: chunked CSV ingest into a raw store, deterministic guideline
//! scoring, paged batch derivation, and query/statistics over the results.

pub mod config;
pub mod error;
pub mod etl;
pub mod models;
pub mod query;
pub mod rules;
pub mod simulate;
pub mod store;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::EtlConfig;
pub use error::{Result, RiskScreenError};
pub use models::{RawMeasurement, RiskFlags, RiskGroup, RiskResult, SmokingStatus};

// Pipeline stages
pub use etl::{BatchProcessor, CsvLoader, LoadSummary, ProcessSummary};
pub use rules::{Evaluation, RULE_VERSION, evaluate};

// Storage
pub use store::{MemoryStore, RawStore, ResultStore, SqliteHealthStore};

// Consumption side
pub use query::{age_band_stats, list_records, record_detail, risk_distribution};
pub use simulate::{SimulateRequest, SimulationReport, simulate};
