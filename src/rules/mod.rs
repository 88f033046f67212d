//! Guideline rule set for cardiovascular risk factors
//!
//! The rule set is expressed as data rather than branching code: an ordered
//! table of risk rules, each with a predicate and an explanation template,
//! plus the plausibility bands of the validity gate. Results carry the
//! [`RULE_VERSION`] tag so the table can evolve without rewriting history.

pub mod evaluator;

pub use evaluator::{Evaluation, compute_bmi, evaluate, validity_failure};

use crate::models::{RawMeasurement, RiskFactor};

/// Version tag stored alongside every derived result
pub const RULE_VERSION: &str = "guideline-v1";

/// Inputs a rule predicate may consult: the raw record plus the derived BMI
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// The raw measurement being scored
    pub record: &'a RawMeasurement,
    /// BMI computed for the record, when defined
    pub bmi: Option<f64>,
}

/// A single guideline rule: one risk factor with its trigger condition
pub struct RiskRule {
    /// The factor this rule sets
    pub factor: RiskFactor,
    /// Human-readable trigger criterion
    pub criterion: &'static str,
    applies: fn(&RuleInput) -> bool,
    explain: fn(&RuleInput) -> String,
}

impl RiskRule {
    /// Whether the rule triggers for the given input
    #[must_use]
    pub fn applies(&self, input: &RuleInput) -> bool {
        (self.applies)(input)
    }

    /// Explanation line naming the threshold and the observed value
    #[must_use]
    pub fn explanation(&self, input: &RuleInput) -> String {
        (self.explain)(input)
    }
}

/// The guideline-v1 decision table, in factor order.
///
/// Predicates treat a missing measurement as not triggering; the validity
/// gate has already guaranteed presence of everything except triglycerides,
/// BMI and the smoking code, which default to false here.
pub const GUIDELINE_RULES: [RiskRule; 7] = [
    RiskRule {
        factor: RiskFactor::Hypertension,
        criterion: "SBP>=140 or DBP>=90",
        applies: |input| {
            input.record.systolic_bp.is_some_and(|v| v >= 140.0)
                || input.record.diastolic_bp.is_some_and(|v| v >= 90.0)
        },
        explain: |input| {
            format!(
                "Hypertension: SBP>=140 or DBP>=90 ({}/{})",
                fmt_measure(input.record.systolic_bp),
                fmt_measure(input.record.diastolic_bp)
            )
        },
    },
    RiskRule {
        factor: RiskFactor::Diabetes,
        criterion: "fasting glucose>=126",
        applies: |input| input.record.fasting_glucose.is_some_and(|v| v >= 126.0),
        explain: |input| {
            format!(
                "Diabetes: fasting glucose>=126 ({})",
                fmt_measure(input.record.fasting_glucose)
            )
        },
    },
    RiskRule {
        factor: RiskFactor::HighTotalCholesterol,
        criterion: "total cholesterol>=240",
        applies: |input| input.record.total_cholesterol.is_some_and(|v| v >= 240.0),
        explain: |input| {
            format!(
                "High TC: total cholesterol>=240 ({})",
                fmt_measure(input.record.total_cholesterol)
            )
        },
    },
    RiskRule {
        factor: RiskFactor::HighTriglycerides,
        criterion: "triglycerides>=200",
        applies: |input| input.record.triglycerides.is_some_and(|v| v >= 200.0),
        explain: |input| {
            format!(
                "High TG: triglycerides>=200 ({})",
                fmt_measure(input.record.triglycerides)
            )
        },
    },
    RiskRule {
        factor: RiskFactor::LowHdl,
        criterion: "HDL<40",
        applies: |input| input.record.hdl_cholesterol.is_some_and(|v| v < 40.0),
        explain: |input| {
            format!(
                "Low HDL: hdl<40 ({})",
                fmt_measure(input.record.hdl_cholesterol)
            )
        },
    },
    RiskRule {
        factor: RiskFactor::Obesity,
        criterion: "BMI>=25",
        applies: |input| input.bmi.is_some_and(|v| v >= 25.0),
        explain: |input| {
            format!(
                "Obesity(Asia): BMI>=25 ({})",
                input
                    .bmi
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
            )
        },
    },
    RiskRule {
        factor: RiskFactor::Smoking,
        criterion: "current smoker",
        applies: |input| input.record.smoking_code == Some(3),
        explain: |_| "Smoking: current smoker".to_string(),
    },
];

/// One presence/plausibility requirement of the validity gate
pub struct RequiredMeasure {
    /// Field name used in log lines
    pub name: &'static str,
    /// Accessor into the raw record
    pub value: fn(&RawMeasurement) -> Option<f64>,
    /// Inclusive biological plausibility band, when one applies
    pub band: Option<(f64, f64)>,
}

/// Measurements the validity gate requires, with their plausibility bands.
///
/// Height and weight only need to be present here; their working ranges are
/// enforced by the BMI computation. HDL must be present but carries no band
/// at this layer; triglycerides are absent from the table entirely because
/// a missing value is tolerated.
pub const REQUIRED_MEASURES: [RequiredMeasure; 7] = [
    RequiredMeasure {
        name: "height_cm",
        value: |r| r.height_cm,
        band: None,
    },
    RequiredMeasure {
        name: "weight_kg",
        value: |r| r.weight_kg,
        band: None,
    },
    RequiredMeasure {
        name: "systolic_bp",
        value: |r| r.systolic_bp,
        band: Some((70.0, 250.0)),
    },
    RequiredMeasure {
        name: "diastolic_bp",
        value: |r| r.diastolic_bp,
        band: Some((40.0, 150.0)),
    },
    RequiredMeasure {
        name: "fasting_glucose",
        value: |r| r.fasting_glucose,
        band: Some((50.0, 400.0)),
    },
    RequiredMeasure {
        name: "total_cholesterol",
        value: |r| r.total_cholesterol,
        band: Some((100.0, 400.0)),
    },
    RequiredMeasure {
        name: "hdl_cholesterol",
        value: |r| r.hdl_cholesterol,
        band: None,
    },
];

fn fmt_measure(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}
