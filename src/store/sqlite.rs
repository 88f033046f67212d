//! SQLite-backed raw and derived stores
//!
//! One connection serves both tables. The handle is an explicitly
//! constructed, process-scoped resource: create it at startup, drop it at
//! shutdown. Page inserts run inside a transaction so a failed page leaves
//! nothing behind and can be retried wholesale.

use std::path::Path;

use rusqlite::{Connection, ErrorCode, OpenFlags, Row, params};

use crate::error::{Result, RiskScreenError};
use crate::models::{
    RawMeasurement, RiskFlags, RiskGroup, RiskResult, StoredMeasurement, StoredRiskResult,
};
use crate::store::{RawStore, ResultStore};

/// Busy timeout applied to every connection
const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS raw_health_check (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_year    INTEGER NOT NULL,
    subject_id        TEXT,
    region_code       INTEGER,
    sex_code          INTEGER,
    age_band_code     INTEGER,
    height_cm         REAL,
    weight_kg         REAL,
    waist_cm          REAL,
    systolic_bp       REAL,
    diastolic_bp      REAL,
    fasting_glucose   REAL,
    total_cholesterol REAL,
    triglycerides     REAL,
    hdl_cholesterol   REAL,
    ldl_cholesterol   REAL,
    smoking_code      INTEGER,
    created_at        TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_raw_age_band ON raw_health_check (age_band_code);
CREATE INDEX IF NOT EXISTS idx_raw_sex ON raw_health_check (sex_code);

CREATE TABLE IF NOT EXISTS risk_result (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    raw_id                 INTEGER NOT NULL UNIQUE
                               REFERENCES raw_health_check (id) ON DELETE CASCADE,
    bmi                    REAL,
    flag_hypertension      INTEGER NOT NULL DEFAULT 0,
    flag_diabetes          INTEGER NOT NULL DEFAULT 0,
    flag_tc_high           INTEGER NOT NULL DEFAULT 0,
    flag_tg_high           INTEGER NOT NULL DEFAULT 0,
    flag_hdl_low           INTEGER NOT NULL DEFAULT 0,
    flag_obesity           INTEGER NOT NULL DEFAULT 0,
    flag_smoking           INTEGER NOT NULL DEFAULT 0,
    risk_factor_count      INTEGER NOT NULL DEFAULT 0,
    risk_group             TEXT NOT NULL,
    rule_version           TEXT NOT NULL,
    evaluation_time_ms     INTEGER NOT NULL DEFAULT 0,
    invalid_flag           INTEGER NOT NULL DEFAULT 0,
    created_at             TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_result_risk_group ON risk_result (risk_group);
CREATE INDEX IF NOT EXISTS idx_result_risk_count ON risk_result (risk_factor_count);
CREATE INDEX IF NOT EXISTS idx_result_invalid ON risk_result (invalid_flag);
CREATE INDEX IF NOT EXISTS idx_result_group_invalid ON risk_result (risk_group, invalid_flag);
";

/// SQLite store backing both pipeline tables
pub struct SqliteHealthStore {
    conn: Connection,
}

impl SqliteHealthStore {
    /// Open (creating if needed) the store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::initialize(conn)
    }

    /// Open a private in-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        // WAL keeps readers (stats queries) unblocked during page writes.
        // On an in-memory database the pragma is a no-op.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "normal")?;
        conn.pragma_update(None, "foreign_keys", "on")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMeasurement> {
        Ok(StoredMeasurement {
            id: row.get("id")?,
            record: RawMeasurement {
                reference_year: row.get("reference_year")?,
                subject_id: row.get("subject_id")?,
                region_code: row.get("region_code")?,
                sex_code: row.get("sex_code")?,
                age_band_code: row.get("age_band_code")?,
                height_cm: row.get("height_cm")?,
                weight_kg: row.get("weight_kg")?,
                waist_cm: row.get("waist_cm")?,
                systolic_bp: row.get("systolic_bp")?,
                diastolic_bp: row.get("diastolic_bp")?,
                fasting_glucose: row.get("fasting_glucose")?,
                total_cholesterol: row.get("total_cholesterol")?,
                triglycerides: row.get("triglycerides")?,
                hdl_cholesterol: row.get("hdl_cholesterol")?,
                ldl_cholesterol: row.get("ldl_cholesterol")?,
                smoking_code: row.get("smoking_code")?,
            },
            created_at: row.get("created_at")?,
        })
    }

    pub(crate) fn result_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRiskResult> {
        let group_raw: String = row.get("risk_group")?;
        let risk_group = RiskGroup::from_str_opt(&group_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown risk_group value: {group_raw}").into(),
            )
        })?;

        Ok(StoredRiskResult {
            id: row.get("id")?,
            result: RiskResult {
                raw_id: row.get("raw_id")?,
                bmi: row.get("bmi")?,
                flags: RiskFlags {
                    hypertension: row.get("flag_hypertension")?,
                    diabetes: row.get("flag_diabetes")?,
                    high_total_cholesterol: row.get("flag_tc_high")?,
                    high_triglycerides: row.get("flag_tg_high")?,
                    low_hdl: row.get("flag_hdl_low")?,
                    obesity: row.get("flag_obesity")?,
                    smoking: row.get("flag_smoking")?,
                },
                risk_factor_count: row.get::<_, i64>("risk_factor_count")? as u8,
                risk_group,
                rule_version: row.get("rule_version")?,
                evaluation_time_ms: row.get::<_, i64>("evaluation_time_ms")? as u32,
                invalid: row.get("invalid_flag")?,
            },
            created_at: row.get("created_at")?,
        })
    }
}

impl RawStore for SqliteHealthStore {
    fn append(&mut self, rows: &[RawMeasurement]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO raw_health_check (
                     reference_year, subject_id, region_code, sex_code, age_band_code,
                     height_cm, weight_kg, waist_cm, systolic_bp, diastolic_bp,
                     fasting_glucose, total_cholesterol, triglycerides,
                     hdl_cholesterol, ldl_cholesterol, smoking_code
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.reference_year,
                    row.subject_id,
                    row.region_code,
                    row.sex_code,
                    row.age_band_code,
                    row.height_cm,
                    row.weight_kg,
                    row.waist_cm,
                    row.systolic_bp,
                    row.diastolic_bp,
                    row.fasting_glucose,
                    row.total_cholesterol,
                    row.triglycerides,
                    row.hdl_cholesterol,
                    row.ldl_cholesterol,
                    row.smoking_code,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<StoredMeasurement>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT * FROM raw_health_check ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| {
                Self::measurement_from_row(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM raw_health_check", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn truncate(&mut self) -> Result<()> {
        // Derived rows cascade with the raw table they reference
        self.conn.execute("DELETE FROM raw_health_check", [])?;
        // The sequence table only exists once a row has been inserted
        let _ = self.conn.execute(
            "DELETE FROM sqlite_sequence WHERE name = 'raw_health_check'",
            [],
        );
        Ok(())
    }
}

impl ResultStore for SqliteHealthStore {
    fn insert_page(&mut self, rows: &[RiskResult]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO risk_result (
                     raw_id, bmi,
                     flag_hypertension, flag_diabetes, flag_tc_high, flag_tg_high,
                     flag_hdl_low, flag_obesity, flag_smoking,
                     risk_factor_count, risk_group, rule_version,
                     evaluation_time_ms, invalid_flag
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.raw_id,
                    row.bmi,
                    row.flags.hypertension,
                    row.flags.diabetes,
                    row.flags.high_total_cholesterol,
                    row.flags.high_triglycerides,
                    row.flags.low_hdl,
                    row.flags.obesity,
                    row.flags.smoking,
                    row.risk_factor_count as i64,
                    row.risk_group.as_str(),
                    row.rule_version,
                    row.evaluation_time_ms as i64,
                    row.invalid,
                ])
                .map_err(|e| {
                    if constraint_violation(&e) {
                        RiskScreenError::DuplicateResult { raw_id: row.raw_id }
                    } else {
                        RiskScreenError::Store(e)
                    }
                })?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn clear_rule_version(&mut self, rule_version: &str) -> Result<u64> {
        let deleted = self.conn.execute(
            "DELETE FROM risk_result WHERE rule_version = ?1",
            params![rule_version],
        )?;
        Ok(deleted as u64)
    }

    fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM risk_result", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RawMeasurement {
        RawMeasurement {
            reference_year: 2024,
            subject_id: Some("S-0001".to_string()),
            age_band_code: Some(12),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            systolic_bp: Some(120.0),
            diastolic_bp: Some(80.0),
            fasting_glucose: Some(100.0),
            total_cholesterol: Some(200.0),
            hdl_cholesterol: Some(50.0),
            ..RawMeasurement::default()
        }
    }

    #[test]
    fn append_and_page_round_trip() {
        let mut store = SqliteHealthStore::open_in_memory().unwrap();
        let rows = vec![sample_record(); 5];
        assert_eq!(store.append(&rows).unwrap(), 5);
        assert_eq!(RawStore::count(&store).unwrap(), 5);

        let page = store.fetch_page(0, 3).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].id, 1);
        assert_eq!(page[0].record, sample_record());

        let tail = store.fetch_page(3, 3).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(store.fetch_page(5, 3).unwrap().is_empty());
    }

    #[test]
    fn duplicate_raw_reference_is_rejected() {
        let mut store = SqliteHealthStore::open_in_memory().unwrap();
        store.append(&[sample_record()]).unwrap();

        let result = crate::rules::evaluate(&sample_record()).into_result(1);
        store.insert_page(std::slice::from_ref(&result)).unwrap();

        let err = store.insert_page(&[result]).unwrap_err();
        assert!(matches!(
            err,
            RiskScreenError::DuplicateResult { raw_id: 1 }
        ));
        // The failed page left nothing behind
        assert_eq!(ResultStore::count(&store).unwrap(), 1);
    }

    #[test]
    fn clear_rule_version_only_hits_matching_rows() {
        let mut store = SqliteHealthStore::open_in_memory().unwrap();
        store.append(&[sample_record(), sample_record()]).unwrap();

        let mut first = crate::rules::evaluate(&sample_record()).into_result(1);
        first.rule_version = "guideline-v0".to_string();
        let second = crate::rules::evaluate(&sample_record()).into_result(2);
        store.insert_page(&[first, second]).unwrap();

        assert_eq!(store.clear_rule_version("guideline-v0").unwrap(), 1);
        assert_eq!(ResultStore::count(&store).unwrap(), 1);
    }
}
