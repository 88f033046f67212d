//! Fixed column mapping for the health-check export
//!
//! The 16 mapped source columns of the national health-check CSV and their
//! conversion into [`RawMeasurement`] fields. The mapping is a static
//! table, never inferred from the file; columns outside the table are
//! dropped. A blank cell maps to the field's null value, not to zero.

use csv::StringRecord;
use itertools::Itertools;

use crate::models::RawMeasurement;

/// A mapped field of the raw measurement record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Reference year of the checkup round
    ReferenceYear,
    /// Opaque subject identifier
    SubjectId,
    /// Administrative region code
    RegionCode,
    /// Sex code
    SexCode,
    /// Age band code, 5-year bands
    AgeBandCode,
    /// Height, cm
    HeightCm,
    /// Weight, kg
    WeightKg,
    /// Waist circumference, cm
    WaistCm,
    /// Systolic blood pressure, mmHg
    SystolicBp,
    /// Diastolic blood pressure, mmHg
    DiastolicBp,
    /// Fasting glucose, mg/dL
    FastingGlucose,
    /// Total cholesterol, mg/dL
    TotalCholesterol,
    /// Triglycerides, mg/dL
    Triglycerides,
    /// HDL cholesterol, mg/dL
    HdlCholesterol,
    /// LDL cholesterol, mg/dL
    LdlCholesterol,
    /// Smoking survey code
    SmokingCode,
}

/// One source-column-to-field assignment
pub struct ColumnMapping {
    /// Exact header of the source column
    pub source: &'static str,
    /// Field the column maps to
    pub field: Field,
}

/// The fixed header-to-field table of the health-check export
pub const COLUMN_MAPPING: [ColumnMapping; 16] = [
    ColumnMapping { source: "기준년도", field: Field::ReferenceYear },
    ColumnMapping { source: "가입자일련번호", field: Field::SubjectId },
    ColumnMapping { source: "시도코드", field: Field::RegionCode },
    ColumnMapping { source: "성별코드", field: Field::SexCode },
    ColumnMapping { source: "연령대코드(5세단위)", field: Field::AgeBandCode },
    ColumnMapping { source: "신장(5cm단위)", field: Field::HeightCm },
    ColumnMapping { source: "체중(5kg단위)", field: Field::WeightKg },
    ColumnMapping { source: "허리둘레", field: Field::WaistCm },
    ColumnMapping { source: "수축기혈압", field: Field::SystolicBp },
    ColumnMapping { source: "이완기혈압", field: Field::DiastolicBp },
    ColumnMapping { source: "식전혈당(공복혈당)", field: Field::FastingGlucose },
    ColumnMapping { source: "총콜레스테롤", field: Field::TotalCholesterol },
    ColumnMapping { source: "트리글리세라이드", field: Field::Triglycerides },
    ColumnMapping { source: "HDL콜레스테롤", field: Field::HdlCholesterol },
    ColumnMapping { source: "LDL콜레스테롤", field: Field::LdlCholesterol },
    ColumnMapping { source: "흡연상태", field: Field::SmokingCode },
];

/// A single row that failed to map; the loader skips and counts these
#[derive(Debug)]
pub struct RowMappingError {
    /// 1-based line number in the source file
    pub line: u64,
    /// What made the row unmappable
    pub reason: String,
}

/// Resolved positions of the mapped columns within a concrete header row
#[derive(Debug)]
pub struct HeaderMap {
    positions: Vec<(usize, Field)>,
    min_arity: usize,
}

impl HeaderMap {
    /// Resolve the fixed mapping against a header row.
    ///
    /// Every mapped column must be present; anything else in the header is
    /// ignored. Returns the names of the missing columns on failure.
    pub fn from_headers(headers: &StringRecord) -> std::result::Result<Self, String> {
        let mut positions = Vec::with_capacity(COLUMN_MAPPING.len());
        let mut missing = Vec::new();

        for mapping in &COLUMN_MAPPING {
            match headers.iter().position(|h| h.trim() == mapping.source) {
                Some(index) => positions.push((index, mapping.field)),
                None => missing.push(mapping.source),
            }
        }

        if !missing.is_empty() {
            return Err(format!(
                "missing mapped column(s): {}",
                missing.iter().join(", ")
            ));
        }

        let min_arity = positions
            .iter()
            .map(|(index, _)| index + 1)
            .max()
            .unwrap_or(0);

        Ok(Self {
            positions,
            min_arity,
        })
    }

    /// Map one source row into a raw measurement.
    ///
    /// Fails on wrong arity or an unparseable cell; the failure is local to
    /// this row and never affects its neighbours.
    pub fn map_row(
        &self,
        line: u64,
        row: &StringRecord,
    ) -> std::result::Result<RawMeasurement, RowMappingError> {
        if row.len() < self.min_arity {
            return Err(RowMappingError {
                line,
                reason: format!(
                    "expected at least {} fields, found {}",
                    self.min_arity,
                    row.len()
                ),
            });
        }

        let mut record = RawMeasurement::default();
        for (index, field) in &self.positions {
            let cell = row.get(*index).unwrap_or("").trim();
            apply_cell(&mut record, *field, cell).map_err(|reason| RowMappingError {
                line,
                reason,
            })?;
        }
        Ok(record)
    }
}

fn apply_cell(
    record: &mut RawMeasurement,
    field: Field,
    cell: &str,
) -> std::result::Result<(), String> {
    match field {
        Field::ReferenceYear => {
            // The only non-nullable source field
            record.reference_year = parse_cell(cell, "reference year")?
                .ok_or_else(|| "blank reference year".to_string())?;
        }
        Field::SubjectId => {
            record.subject_id = (!cell.is_empty()).then(|| cell.to_string());
        }
        Field::RegionCode => record.region_code = parse_cell(cell, "region code")?,
        Field::SexCode => record.sex_code = parse_cell(cell, "sex code")?,
        Field::AgeBandCode => record.age_band_code = parse_cell(cell, "age band code")?,
        Field::HeightCm => record.height_cm = parse_cell(cell, "height")?,
        Field::WeightKg => record.weight_kg = parse_cell(cell, "weight")?,
        Field::WaistCm => record.waist_cm = parse_cell(cell, "waist circumference")?,
        Field::SystolicBp => record.systolic_bp = parse_cell(cell, "systolic bp")?,
        Field::DiastolicBp => record.diastolic_bp = parse_cell(cell, "diastolic bp")?,
        Field::FastingGlucose => record.fasting_glucose = parse_cell(cell, "fasting glucose")?,
        Field::TotalCholesterol => {
            record.total_cholesterol = parse_cell(cell, "total cholesterol")?;
        }
        Field::Triglycerides => record.triglycerides = parse_cell(cell, "triglycerides")?,
        Field::HdlCholesterol => record.hdl_cholesterol = parse_cell(cell, "hdl cholesterol")?,
        Field::LdlCholesterol => record.ldl_cholesterol = parse_cell(cell, "ldl cholesterol")?,
        Field::SmokingCode => record.smoking_code = parse_cell(cell, "smoking code")?,
    }
    Ok(())
}

fn parse_cell<T: std::str::FromStr>(
    cell: &str,
    label: &str,
) -> std::result::Result<Option<T>, String> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse()
        .map(Some)
        .map_err(|_| format!("unparseable {label}: {cell:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_header() -> StringRecord {
        StringRecord::from(
            COLUMN_MAPPING
                .iter()
                .map(|m| m.source)
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn resolves_all_mapped_columns() {
        let map = HeaderMap::from_headers(&full_header()).unwrap();
        let row = StringRecord::from(vec![
            "2024", "S-001", "11", "1", "12", "170", "65", "82.0", "120", "80", "95", "198",
            "150", "55", "110", "1",
        ]);
        let record = map.map_row(2, &row).unwrap();
        assert_eq!(record.reference_year, 2024);
        assert_eq!(record.subject_id.as_deref(), Some("S-001"));
        assert_eq!(record.height_cm, Some(170.0));
        assert_eq!(record.smoking_code, Some(1));
    }

    #[test]
    fn blank_cells_map_to_none_not_zero() {
        let map = HeaderMap::from_headers(&full_header()).unwrap();
        let row = StringRecord::from(vec![
            "2024", "", "", "1", "12", "", "65", "", "120", "80", "95", "198", "", "55", "",
            "3",
        ]);
        let record = map.map_row(2, &row).unwrap();
        assert_eq!(record.subject_id, None);
        assert_eq!(record.height_cm, None);
        assert_eq!(record.triglycerides, None);
        assert_eq!(record.weight_kg, Some(65.0));
    }

    #[test]
    fn unmapped_columns_are_dropped() {
        let mut headers: Vec<&str> = COLUMN_MAPPING.iter().map(|m| m.source).collect();
        headers.push("구강검진수검여부");
        let map = HeaderMap::from_headers(&StringRecord::from(headers)).unwrap();

        let mut cells = vec![
            "2024", "S-001", "11", "1", "12", "170", "65", "82.0", "120", "80", "95", "198",
            "150", "55", "110", "1",
        ];
        cells.push("Y");
        let record = map.map_row(2, &StringRecord::from(cells)).unwrap();
        assert_eq!(record.hdl_cholesterol, Some(55.0));
    }

    #[test]
    fn missing_mapped_column_is_reported_by_name() {
        let headers: Vec<&str> = COLUMN_MAPPING
            .iter()
            .filter(|m| m.field != Field::SystolicBp)
            .map(|m| m.source)
            .collect();
        let err = HeaderMap::from_headers(&StringRecord::from(headers)).unwrap_err();
        assert!(err.contains("수축기혈압"));
    }

    #[test]
    fn short_and_garbled_rows_fail_locally() {
        let map = HeaderMap::from_headers(&full_header()).unwrap();

        let short = StringRecord::from(vec!["2024", "S-001"]);
        assert!(map.map_row(3, &short).is_err());

        let garbled = StringRecord::from(vec![
            "2024", "S-001", "11", "1", "12", "tall", "65", "", "120", "80", "95", "198", "150",
            "55", "110", "1",
        ]);
        let err = map.map_row(4, &garbled).unwrap_err();
        assert_eq!(err.line, 4);
        assert!(err.reason.contains("height"));
    }
}
