//! Shared fixtures for the integration tests

use std::path::Path;

use risk_screen::RawMeasurement;
use risk_screen::etl::COLUMN_MAPPING;

/// A record that passes the validity gate with no flags set
#[must_use]
pub fn healthy_record() -> RawMeasurement {
    RawMeasurement {
        reference_year: 2024,
        subject_id: Some("S-0000001".to_string()),
        region_code: Some(11),
        sex_code: Some(1),
        age_band_code: Some(12),
        height_cm: Some(170.0),
        weight_kg: Some(65.0),
        waist_cm: Some(80.0),
        systolic_bp: Some(120.0),
        diastolic_bp: Some(80.0),
        fasting_glucose: Some(95.0),
        total_cholesterol: Some(190.0),
        triglycerides: Some(120.0),
        hdl_cholesterol: Some(55.0),
        ldl_cholesterol: Some(110.0),
        smoking_code: Some(1),
    }
}

/// A record tripping all seven guideline rules at once
#[must_use]
pub fn all_flags_record() -> RawMeasurement {
    RawMeasurement {
        height_cm: Some(170.0),
        weight_kg: Some(85.0),
        systolic_bp: Some(150.0),
        diastolic_bp: Some(95.0),
        fasting_glucose: Some(130.0),
        total_cholesterol: Some(250.0),
        triglycerides: Some(220.0),
        hdl_cholesterol: Some(35.0),
        smoking_code: Some(3),
        ..healthy_record()
    }
}

/// Write a source CSV with the mapped header row and the given data rows.
/// Flexible so fixtures can contain deliberately short rows.
pub fn write_source_csv(path: &Path, rows: &[Vec<&str>]) {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .expect("create csv");
    writer
        .write_record(COLUMN_MAPPING.iter().map(|m| m.source))
        .expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush csv");
}

/// Render a measurement as a source CSV row in mapped-column order
#[must_use]
pub fn csv_row(record: &RawMeasurement) -> Vec<String> {
    fn cell(value: Option<f64>) -> String {
        value.map_or_else(String::new, |v| format!("{v}"))
    }
    fn code(value: Option<i16>) -> String {
        value.map_or_else(String::new, |v| v.to_string())
    }

    vec![
        record.reference_year.to_string(),
        record.subject_id.clone().unwrap_or_default(),
        code(record.region_code),
        code(record.sex_code),
        code(record.age_band_code),
        cell(record.height_cm),
        cell(record.weight_kg),
        cell(record.waist_cm),
        cell(record.systolic_bp),
        cell(record.diastolic_bp),
        cell(record.fasting_glucose),
        cell(record.total_cholesterol),
        cell(record.triglycerides),
        cell(record.hdl_cholesterol),
        cell(record.ldl_cholesterol),
        code(record.smoking_code),
    ]
}
