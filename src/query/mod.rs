//! Read-only queries and statistics over the derived store
//!
//! The consumption side of the pipeline: per-record lookups, filtered
//! pagination and the aggregate distributions served to reporting
//! collaborators. Everything here reads committed rows only; the wire
//! framing around these shapes is a collaborator concern.

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::Result;
use crate::models::{RiskGroup, StoredMeasurement, StoredRiskResult};
use crate::store::SqliteHealthStore;

/// Filter and paging options for record listings
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Restrict to one age band
    pub age_band: Option<i16>,
    /// Restrict to one risk group
    pub risk_group: Option<RiskGroup>,
    /// 1-based page number; values below 1 are treated as 1
    pub page: u32,
    /// Rows per page, clamped to [1, 100]
    pub limit: u32,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            age_band: None,
            risk_group: None,
            page: 1,
            limit: 20,
        }
    }
}

/// Paging metadata returned with a record listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number served
    pub page: u32,
    /// Rows per page after clamping
    pub limit: u32,
    /// Total rows matching the filter
    pub total_items: u64,
    /// Total pages at this limit
    pub total_pages: u64,
}

/// One row of a record listing
#[derive(Debug, Clone)]
pub struct RecordSummary {
    /// The derived result
    pub result: StoredRiskResult,
    /// Age band of the underlying measurement
    pub age_band_code: Option<i16>,
    /// Sex code of the underlying measurement
    pub sex_code: Option<i16>,
}

/// A derived result joined with the full measurement behind it
#[derive(Debug, Clone)]
pub struct RecordDetail {
    /// The derived result
    pub result: StoredRiskResult,
    /// The raw measurement it was derived from
    pub measurement: StoredMeasurement,
}

/// Count and share of one risk group
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupShare {
    /// Valid rows in the group
    pub count: u64,
    /// Share of valid rows, percent, one decimal
    pub percentage: f64,
}

/// Distribution of valid rows across risk groups
#[derive(Debug, Clone, Serialize)]
pub struct RiskDistribution {
    /// Share per risk group
    pub groups: FxHashMap<RiskGroup, GroupShare>,
    /// All derived rows, valid and invalid
    pub total_records: u64,
    /// Rows that passed the validity gate
    pub valid_records: u64,
    /// Rows rejected by the validity gate
    pub invalid_records: u64,
}

/// Aggregates for one age band over valid rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBandStats {
    /// Age band code, 5-year bands
    pub age_band_code: i16,
    /// Lower bound of the band in years
    pub age_years: i16,
    /// Valid rows in the band
    pub count: u64,
    /// Share of valid rows, percent, one decimal
    pub percentage: f64,
    /// Mean risk factor count, one decimal
    pub avg_risk_factor_count: f64,
    /// Rows classified as CHD risk equivalent
    pub high_risk_count: u64,
}

const RESULT_COLUMNS: &str = "r.id, r.raw_id, r.bmi, \
     r.flag_hypertension, r.flag_diabetes, r.flag_tc_high, r.flag_tg_high, \
     r.flag_hdl_low, r.flag_obesity, r.flag_smoking, \
     r.risk_factor_count, r.risk_group, r.rule_version, \
     r.evaluation_time_ms, r.invalid_flag, r.created_at";

/// Fetch one derived result by its id, joined with its measurement
pub fn record_detail(store: &SqliteHealthStore, id: i64) -> Result<Option<RecordDetail>> {
    let conn = store.connection();

    let sql = format!("SELECT {RESULT_COLUMNS} FROM risk_result r WHERE r.id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    let Some(result) = stmt
        .query_map([id], |row| SqliteHealthStore::result_from_row(row))?
        .next()
        .transpose()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare_cached("SELECT * FROM raw_health_check WHERE id = ?1")?;
    let Some(measurement) = stmt
        .query_map([result.result.raw_id], |row| {
            SqliteHealthStore::measurement_from_row(row)
        })?
        .next()
        .transpose()?
    else {
        return Ok(None);
    };

    Ok(Some(RecordDetail {
        result,
        measurement,
    }))
}

/// List valid derived rows matching the filter, ordered by id
pub fn list_records(
    store: &SqliteHealthStore,
    filter: &RecordFilter,
) -> Result<(Vec<RecordSummary>, Pagination)> {
    let conn = store.connection();

    let page = filter.page.max(1);
    let limit = filter.limit.clamp(1, 100);

    let mut conditions = String::from("r.invalid_flag = 0");
    let mut values: Vec<Value> = Vec::new();
    if let Some(age_band) = filter.age_band {
        conditions.push_str(" AND m.age_band_code = ?");
        values.push(Value::Integer(i64::from(age_band)));
    }
    if let Some(group) = filter.risk_group {
        conditions.push_str(" AND r.risk_group = ?");
        values.push(Value::Text(group.as_str().to_string()));
    }

    let count_sql = format!(
        "SELECT COUNT(*) FROM risk_result r \
         JOIN raw_health_check m ON m.id = r.raw_id WHERE {conditions}"
    );
    let total_items: i64 =
        conn.query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;
    let total_items = total_items as u64;

    let list_sql = format!(
        "SELECT {RESULT_COLUMNS}, m.age_band_code AS age_band_code, m.sex_code AS sex_code \
         FROM risk_result r JOIN raw_health_check m ON m.id = r.raw_id \
         WHERE {conditions} ORDER BY r.id LIMIT ? OFFSET ?"
    );
    values.push(Value::Integer(i64::from(limit)));
    values.push(Value::Integer(i64::from(page - 1) * i64::from(limit)));

    let mut stmt = conn.prepare_cached(&list_sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok(RecordSummary {
                result: SqliteHealthStore::result_from_row(row)?,
                age_band_code: row.get("age_band_code")?,
                sex_code: row.get("sex_code")?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let total_pages = total_items.div_ceil(u64::from(limit));
    Ok((
        rows,
        Pagination {
            page,
            limit,
            total_items,
            total_pages,
        },
    ))
}

/// Distribution of valid rows across the three risk groups
pub fn risk_distribution(store: &SqliteHealthStore) -> Result<RiskDistribution> {
    let conn = store.connection();

    let mut stmt = conn.prepare_cached(
        "SELECT risk_group, COUNT(*) FROM risk_result \
         WHERE invalid_flag = 0 GROUP BY risk_group",
    )?;
    let counts = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let valid_records: u64 = counts.iter().map(|(_, count)| count).sum();
    let invalid_records: i64 = conn.query_row(
        "SELECT COUNT(*) FROM risk_result WHERE invalid_flag = 1",
        [],
        |row| row.get(0),
    )?;
    let invalid_records = invalid_records as u64;

    let mut groups = FxHashMap::default();
    for (raw_group, count) in counts {
        if let Some(group) = RiskGroup::from_str_opt(&raw_group) {
            groups.insert(
                group,
                GroupShare {
                    count,
                    percentage: percentage(count, valid_records),
                },
            );
        }
    }

    Ok(RiskDistribution {
        groups,
        total_records: valid_records + invalid_records,
        valid_records,
        invalid_records,
    })
}

/// Per-age-band aggregates over valid rows, ordered by band
pub fn age_band_stats(store: &SqliteHealthStore) -> Result<Vec<AgeBandStats>> {
    let conn = store.connection();

    let mut stmt = conn.prepare_cached(
        "SELECT m.age_band_code, COUNT(*), AVG(r.risk_factor_count), \
                SUM(CASE WHEN r.risk_group = 'CHD_RISK_EQUIVALENT' THEN 1 ELSE 0 END) \
         FROM raw_health_check m \
         JOIN risk_result r ON r.raw_id = m.id \
         WHERE r.invalid_flag = 0 AND m.age_band_code IS NOT NULL \
         GROUP BY m.age_band_code ORDER BY m.age_band_code",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i16>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                row.get::<_, i64>(3)? as u64,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let total: u64 = rows.iter().map(|(_, count, _, _)| count).sum();

    Ok(rows
        .into_iter()
        .map(|(age_band_code, count, avg, high_risk_count)| AgeBandStats {
            age_band_code,
            age_years: age_band_code * 5,
            count,
            percentage: percentage(count, total),
            avg_risk_factor_count: (avg * 10.0).round() / 10.0,
            high_risk_count,
        })
        .collect())
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}
