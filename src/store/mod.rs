//! Storage interfaces for the raw and derived tables
//!
//! The pipeline core consumes its collaborators through these two narrow
//! traits: the loader appends to a [`RawStore`], the batch processor pages
//! through one and writes a [`ResultStore`]. The SQLite implementation
//! backs both with a single explicitly constructed connection; the memory
//! implementation exists for tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteHealthStore;

use crate::error::Result;
use crate::models::{RawMeasurement, RiskResult, StoredMeasurement};

/// Append-only store of raw health-check measurements
pub trait RawStore {
    /// Append a batch of mapped records, returning how many were written
    fn append(&mut self, rows: &[RawMeasurement]) -> Result<usize>;

    /// Read one page in insertion order
    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<StoredMeasurement>>;

    /// Total number of stored records
    fn count(&self) -> Result<u64>;

    /// Remove every record ahead of a full reload. Destructive.
    fn truncate(&mut self) -> Result<()>;
}

/// Store of derived risk results, one per raw record
pub trait ResultStore {
    /// Insert a page of results as one unit: either every row of the page
    /// is persisted or none is. The store enforces the unique constraint
    /// on the raw reference.
    fn insert_page(&mut self, rows: &[RiskResult]) -> Result<usize>;

    /// Delete every result carrying the given rule version, returning the
    /// number of deleted rows. Run before reprocessing.
    fn clear_rule_version(&mut self, rule_version: &str) -> Result<u64>;

    /// Total number of stored results
    fn count(&self) -> Result<u64>;
}
