//! Query and statistics integration tests

mod common;

use common::{all_flags_record, healthy_record};
use risk_screen::query::{self, RecordFilter};
use risk_screen::store::RawStore;
use risk_screen::{BatchProcessor, EtlConfig, RiskGroup, SqliteHealthStore};

fn quiet_config() -> EtlConfig {
    EtlConfig {
        show_progress: false,
        ..EtlConfig::default()
    }
}

/// 4 valid low-risk rows in band 9, 4 CHD rows in band 12, 2 invalid rows
fn seeded_store() -> SqliteHealthStore {
    let mut store = SqliteHealthStore::open_in_memory().unwrap();

    let mut rows = Vec::new();
    for _ in 0..4 {
        let mut record = healthy_record();
        record.age_band_code = Some(9);
        rows.push(record);
    }
    for _ in 0..4 {
        let mut record = all_flags_record();
        record.age_band_code = Some(12);
        rows.push(record);
    }
    for _ in 0..2 {
        let mut record = healthy_record();
        record.hdl_cholesterol = None;
        rows.push(record);
    }
    store.append(&rows).unwrap();

    BatchProcessor::new(&quiet_config()).run(&mut store).unwrap();
    store
}

#[test]
fn risk_distribution_reports_counts_and_percentages() {
    let store = seeded_store();
    let distribution = query::risk_distribution(&store).unwrap();

    assert_eq!(distribution.total_records, 10);
    assert_eq!(distribution.valid_records, 8);
    assert_eq!(distribution.invalid_records, 2);

    let low = &distribution.groups[&RiskGroup::ZeroToOneRiskFactor];
    assert_eq!(low.count, 4);
    assert_eq!(low.percentage, 50.0);

    let chd = &distribution.groups[&RiskGroup::ChdRiskEquivalent];
    assert_eq!(chd.count, 4);
    assert_eq!(chd.percentage, 50.0);

    assert!(!distribution.groups.contains_key(&RiskGroup::MultipleRiskFactors));
}

#[test]
fn age_band_stats_aggregate_per_band() {
    let store = seeded_store();
    let stats = query::age_band_stats(&store).unwrap();

    assert_eq!(stats.len(), 2);

    assert_eq!(stats[0].age_band_code, 9);
    assert_eq!(stats[0].age_years, 45);
    assert_eq!(stats[0].count, 4);
    assert_eq!(stats[0].percentage, 50.0);
    assert_eq!(stats[0].avg_risk_factor_count, 0.0);
    assert_eq!(stats[0].high_risk_count, 0);

    assert_eq!(stats[1].age_band_code, 12);
    assert_eq!(stats[1].count, 4);
    assert_eq!(stats[1].avg_risk_factor_count, 7.0);
    assert_eq!(stats[1].high_risk_count, 4);
}

#[test]
fn list_records_excludes_invalid_rows_and_paginates() {
    let store = seeded_store();

    let (rows, pagination) = query::list_records(
        &store,
        &RecordFilter {
            limit: 3,
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert_eq!(pagination.total_items, 8);
    assert_eq!(pagination.total_pages, 3);
    assert_eq!(rows.len(), 3);

    let (last_page, _) = query::list_records(
        &store,
        &RecordFilter {
            page: 3,
            limit: 3,
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert_eq!(last_page.len(), 2);
}

#[test]
fn list_records_filters_by_band_and_group() {
    let store = seeded_store();

    let (rows, pagination) = query::list_records(
        &store,
        &RecordFilter {
            age_band: Some(12),
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert_eq!(pagination.total_items, 4);
    assert!(rows.iter().all(|r| r.age_band_code == Some(12)));
    assert!(
        rows.iter()
            .all(|r| r.result.result.risk_group == RiskGroup::ChdRiskEquivalent)
    );

    let (none, pagination) = query::list_records(
        &store,
        &RecordFilter {
            age_band: Some(9),
            risk_group: Some(RiskGroup::ChdRiskEquivalent),
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert!(none.is_empty());
    assert_eq!(pagination.total_items, 0);
}

#[test]
fn record_detail_joins_the_measurement() {
    let store = seeded_store();

    let (rows, _) = query::list_records(&store, &RecordFilter::default()).unwrap();
    let id = rows[0].result.id;

    let detail = query::record_detail(&store, id).unwrap().expect("present");
    assert_eq!(detail.result.id, id);
    assert_eq!(detail.measurement.id, detail.result.result.raw_id);
    assert_eq!(detail.measurement.record.height_cm, Some(170.0));

    assert!(query::record_detail(&store, 9_999).unwrap().is_none());
}

#[test]
fn list_limit_is_clamped() {
    let store = seeded_store();
    let (_, pagination) = query::list_records(
        &store,
        &RecordFilter {
            limit: 1_000,
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert_eq!(pagination.limit, 100);

    let (_, pagination) = query::list_records(
        &store,
        &RecordFilter {
            page: 0,
            limit: 0,
            ..RecordFilter::default()
        },
    )
    .unwrap();
    assert_eq!(pagination.page, 1);
    assert_eq!(pagination.limit, 1);
}
