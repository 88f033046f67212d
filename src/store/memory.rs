//! In-memory store implementation
//!
//! Backs both store traits with plain vectors. Used by tests and anywhere
//! a pipeline run should not touch disk. Mirrors the SQLite semantics:
//! insertion-ordered ids from 1, all-or-nothing page inserts, and the
//! unique constraint on the raw reference.

use chrono::{NaiveDateTime, Utc};
use rustc_hash::FxHashSet;

use crate::error::{Result, RiskScreenError};
use crate::models::{RawMeasurement, RiskResult, StoredMeasurement, StoredRiskResult};
use crate::store::{RawStore, ResultStore};

/// Vector-backed store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    measurements: Vec<StoredMeasurement>,
    results: Vec<StoredRiskResult>,
    seen_raw_ids: FxHashSet<i64>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All derived results inserted so far, in insertion order
    #[must_use]
    pub fn results(&self) -> &[StoredRiskResult] {
        &self.results
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

impl RawStore for MemoryStore {
    fn append(&mut self, rows: &[RawMeasurement]) -> Result<usize> {
        let created_at = Self::now();
        for row in rows {
            let id = self.measurements.len() as i64 + 1;
            self.measurements.push(StoredMeasurement {
                id,
                record: row.clone(),
                created_at,
            });
        }
        Ok(rows.len())
    }

    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<StoredMeasurement>> {
        Ok(self
            .measurements
            .iter()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.measurements.len() as u64)
    }

    fn truncate(&mut self) -> Result<()> {
        self.measurements.clear();
        self.results.clear();
        self.seen_raw_ids.clear();
        Ok(())
    }
}

impl ResultStore for MemoryStore {
    fn insert_page(&mut self, rows: &[RiskResult]) -> Result<usize> {
        // Check the whole page up front so a rejected page inserts nothing
        for row in rows {
            if self.seen_raw_ids.contains(&row.raw_id) {
                return Err(RiskScreenError::DuplicateResult { raw_id: row.raw_id });
            }
        }

        let created_at = Self::now();
        for row in rows {
            let id = self.results.len() as i64 + 1;
            self.seen_raw_ids.insert(row.raw_id);
            self.results.push(StoredRiskResult {
                id,
                result: row.clone(),
                created_at,
            });
        }
        Ok(rows.len())
    }

    fn clear_rule_version(&mut self, rule_version: &str) -> Result<u64> {
        let before = self.results.len();
        self.results.retain(|stored| {
            let matches = stored.result.rule_version == rule_version;
            if matches {
                self.seen_raw_ids.remove(&stored.result.raw_id);
            }
            !matches
        });
        Ok((before - self.results.len()) as u64)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.results.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::evaluate;

    #[test]
    fn page_insert_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let record = RawMeasurement::default();
        let first = evaluate(&record).into_result(1);
        store.insert_page(std::slice::from_ref(&first)).unwrap();

        let fresh = evaluate(&record).into_result(2);
        let duplicate = evaluate(&record).into_result(1);
        let err = store.insert_page(&[fresh, duplicate]).unwrap_err();
        assert!(matches!(err, RiskScreenError::DuplicateResult { raw_id: 1 }));
        assert_eq!(ResultStore::count(&store).unwrap(), 1);
    }

    #[test]
    fn duplicate_page_insert_fails_then_clear_allows_reprocessing() {
        let mut store = MemoryStore::new();
        let record = RawMeasurement::default();
        let result = evaluate(&record).into_result(7);
        store.insert_page(std::slice::from_ref(&result)).unwrap();

        assert!(store.insert_page(std::slice::from_ref(&result)).is_err());
        assert_eq!(store.clear_rule_version(&result.rule_version).unwrap(), 1);
        store.insert_page(&[result]).unwrap();
    }
}
