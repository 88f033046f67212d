//! Synchronous single-record scoring
//!
//! Scores one measurement payload against the guideline rule set and
//! returns the full derived shape plus one explanation line per triggered
//! factor. Input ranges are validated up front with a field-level detail
//! map naming every offending field in one response.
//!
//! The bounds here are an input-validation policy and deliberately not the
//! evaluator's plausibility gate: the two tables evolved separately (hdl
//! and triglyceride widths differ, and the gate knows nothing about age
//! bands). Keep them separate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{RawMeasurement, RiskFlags, RiskGroup, SmokingStatus};
use crate::rules::{self, GUIDELINE_RULES, RULE_VERSION, RuleInput};

/// One measurement payload submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateRequest {
    /// Age band code, 5-year bands
    pub age_band: i16,
    /// Sex code (1 male, 2 female)
    pub sex_code: i16,
    /// Height in cm
    pub height_cm: f64,
    /// Weight in kg
    pub weight_kg: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,
    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: f64,
    /// Fasting glucose in mg/dL
    pub fasting_glucose: f64,
    /// Total cholesterol in mg/dL
    pub total_cholesterol: f64,
    /// Triglycerides in mg/dL
    pub triglycerides: f64,
    /// HDL cholesterol in mg/dL
    pub hdl_cholesterol: f64,
    /// Smoking status
    pub smoking: SmokingStatus,
}

/// An inclusive input bound on one request field
pub struct InputBound {
    /// Field name as reported in the detail map
    pub field: &'static str,
    /// Minimum accepted value
    pub min: f64,
    /// Maximum accepted value
    pub max: f64,
    value: fn(&SimulateRequest) -> f64,
}

/// Accepted ranges for the scoring request, checked before any scoring
pub const INPUT_BOUNDS: [InputBound; 10] = [
    InputBound { field: "age_band", min: 5.0, max: 18.0, value: |r| f64::from(r.age_band) },
    InputBound { field: "sex_code", min: 1.0, max: 2.0, value: |r| f64::from(r.sex_code) },
    InputBound { field: "height_cm", min: 140.0, max: 200.0, value: |r| r.height_cm },
    InputBound { field: "weight_kg", min: 30.0, max: 150.0, value: |r| r.weight_kg },
    InputBound { field: "systolic_bp", min: 70.0, max: 250.0, value: |r| r.systolic_bp },
    InputBound { field: "diastolic_bp", min: 40.0, max: 150.0, value: |r| r.diastolic_bp },
    InputBound { field: "fasting_glucose", min: 50.0, max: 400.0, value: |r| r.fasting_glucose },
    InputBound { field: "total_cholesterol", min: 100.0, max: 400.0, value: |r| r.total_cholesterol },
    InputBound { field: "triglycerides", min: 30.0, max: 500.0, value: |r| r.triglycerides },
    InputBound { field: "hdl_cholesterol", min: 20.0, max: 100.0, value: |r| r.hdl_cholesterol },
];

/// Field-level rejection of a scoring request
///
/// Carries every offending field at once, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    /// Field name to rejection message
    pub details: BTreeMap<&'static str, String>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input data for {} field(s)", self.details.len())
    }
}

impl std::error::Error for ValidationErrors {}

/// Full scoring outcome for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    /// BMI rounded to one decimal, when defined
    pub bmi: Option<f64>,
    /// The seven risk-factor flags
    pub flags: RiskFlags,
    /// Number of set flags
    pub risk_factor_count: u8,
    /// Aggregate classification
    pub risk_group: RiskGroup,
    /// One line per triggered factor, in guideline order
    pub explanations: Vec<String>,
    /// Version tag of the rule set
    pub rule_version: &'static str,
    /// Wall-clock scoring latency, whole milliseconds
    pub evaluation_time_ms: u32,
}

/// Validate the request bounds, naming every offending field at once
pub fn validate(request: &SimulateRequest) -> std::result::Result<(), ValidationErrors> {
    let mut details = BTreeMap::new();
    for bound in &INPUT_BOUNDS {
        let value = (bound.value)(request);
        if !(bound.min..=bound.max).contains(&value) {
            details.insert(
                bound.field,
                format!("Must be between {} and {}", bound.min, bound.max),
            );
        }
    }
    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { details })
    }
}

/// Score one request, or reject it with the full field-level detail map
pub fn simulate(request: &SimulateRequest) -> std::result::Result<SimulationReport, ValidationErrors> {
    validate(request)?;

    let record = measurement_from_request(request);
    let evaluation = rules::evaluate(&record);

    let input = RuleInput {
        record: &record,
        bmi: evaluation.bmi,
    };
    let explanations = GUIDELINE_RULES
        .iter()
        .filter(|rule| evaluation.triggered.contains(&rule.factor))
        .map(|rule| rule.explanation(&input))
        .collect();

    Ok(SimulationReport {
        bmi: evaluation.bmi,
        flags: evaluation.flags,
        risk_factor_count: evaluation.risk_factor_count,
        risk_group: evaluation.risk_group,
        explanations,
        rule_version: RULE_VERSION,
        evaluation_time_ms: evaluation.evaluation_time_ms,
    })
}

fn measurement_from_request(request: &SimulateRequest) -> RawMeasurement {
    RawMeasurement {
        sex_code: Some(request.sex_code),
        age_band_code: Some(request.age_band),
        height_cm: Some(request.height_cm),
        weight_kg: Some(request.weight_kg),
        systolic_bp: Some(request.systolic_bp),
        diastolic_bp: Some(request.diastolic_bp),
        fasting_glucose: Some(request.fasting_glucose),
        total_cholesterol: Some(request.total_cholesterol),
        triglycerides: Some(request.triglycerides),
        hdl_cholesterol: Some(request.hdl_cholesterol),
        smoking_code: Some(request.smoking.as_code()),
        ..RawMeasurement::default()
    }
}
