//! The pure risk evaluator
//!
//! `evaluate` maps one raw measurement to a derived outcome with no side
//! effects: identical input always yields identical BMI, flags and group.
//! The only non-deterministic field is the wall-clock scoring latency,
//! which is recorded for observability and has no effect on classification.

use std::time::Instant;

use smallvec::SmallVec;

use crate::models::{RawMeasurement, RiskFactor, RiskFlags, RiskGroup, RiskResult};
use crate::rules::{GUIDELINE_RULES, REQUIRED_MEASURES, RULE_VERSION, RuleInput};

/// Inclusive working range for height measurements, cm
pub const HEIGHT_RANGE_CM: (f64, f64) = (140.0, 200.0);
/// Inclusive working range for weight measurements, kg
pub const WEIGHT_RANGE_KG: (f64, f64) = (30.0, 150.0);

/// Outcome of scoring a single record, before it is tied to a raw id
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// BMI rounded to one decimal, when defined
    pub bmi: Option<f64>,
    /// The seven risk-factor flags
    pub flags: RiskFlags,
    /// Number of set flags
    pub risk_factor_count: u8,
    /// Aggregate classification
    pub risk_group: RiskGroup,
    /// Record failed the plausibility gate
    pub invalid: bool,
    /// Wall-clock scoring latency, whole milliseconds
    pub evaluation_time_ms: u32,
    /// Factors that triggered, in guideline order
    pub triggered: SmallVec<[RiskFactor; 7]>,
}

impl Evaluation {
    /// Attach the raw record reference, producing a persistable result
    #[must_use]
    pub fn into_result(self, raw_id: i64) -> RiskResult {
        RiskResult {
            raw_id,
            bmi: self.bmi,
            flags: self.flags,
            risk_factor_count: self.risk_factor_count,
            risk_group: self.risk_group,
            rule_version: RULE_VERSION.to_string(),
            evaluation_time_ms: self.evaluation_time_ms,
            invalid: self.invalid,
        }
    }
}

/// Compute BMI from height and weight, rounded to one decimal.
///
/// Defined only when height is within [140, 200] cm and weight within
/// [30, 150] kg, both inclusive. Values outside these ranges indicate
/// measurement error and yield `None` rather than a clamped figure.
/// Rounding is half-away-from-zero (the `f64::round` convention).
#[must_use]
pub fn compute_bmi(height_cm: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    let height = height_cm.filter(|h| (HEIGHT_RANGE_CM.0..=HEIGHT_RANGE_CM.1).contains(h))?;
    let weight = weight_kg.filter(|w| (WEIGHT_RANGE_KG.0..=WEIGHT_RANGE_KG.1).contains(w))?;

    let height_m = height / 100.0;
    Some(round1(weight / (height_m * height_m)))
}

/// First validity-gate requirement the record violates, if any.
///
/// A record is invalid when a required measurement is missing or a present
/// value falls outside its biological plausibility band. Triglycerides are
/// exempt: a missing value is tolerated and the flag defaults to false.
#[must_use]
pub fn validity_failure(record: &RawMeasurement) -> Option<&'static str> {
    for measure in &REQUIRED_MEASURES {
        match (measure.value)(record) {
            None => return Some(measure.name),
            Some(value) => {
                if let Some((min, max)) = measure.band {
                    if value < min || value > max {
                        return Some(measure.name);
                    }
                }
            }
        }
    }
    None
}

/// Score one raw measurement against the guideline rule set.
///
/// Invalid records short-circuit to the documented default outcome: all
/// flags false, count zero, zero-to-one group, no BMI.
#[must_use]
pub fn evaluate(record: &RawMeasurement) -> Evaluation {
    let started = Instant::now();

    if validity_failure(record).is_some() {
        return Evaluation {
            bmi: None,
            flags: RiskFlags::default(),
            risk_factor_count: 0,
            risk_group: RiskGroup::ZeroToOneRiskFactor,
            invalid: true,
            evaluation_time_ms: 0,
            triggered: SmallVec::new(),
        };
    }

    let bmi = compute_bmi(record.height_cm, record.weight_kg);
    let input = RuleInput { record, bmi };

    let mut flags = RiskFlags::default();
    let mut triggered = SmallVec::new();
    for rule in &GUIDELINE_RULES {
        if rule.applies(&input) {
            flags.set(rule.factor);
            triggered.push(rule.factor);
        }
    }

    let risk_factor_count = flags.count();
    let risk_group = RiskGroup::classify(flags.diabetes, risk_factor_count);

    Evaluation {
        bmi,
        flags,
        risk_factor_count,
        risk_group,
        invalid: false,
        evaluation_time_ms: started.elapsed().as_millis() as u32,
        triggered,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
