//! Derived risk classification results
//!
//! One result per raw measurement, produced by the evaluator and persisted
//! by the batch processor. Results are never updated in place: reprocessing
//! clears the derived table for a rule version and recreates it.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The seven guideline risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFactor {
    /// Systolic >= 140 or diastolic >= 90
    Hypertension = 1,
    /// Fasting glucose >= 126
    Diabetes = 2,
    /// Total cholesterol >= 240
    HighTotalCholesterol = 3,
    /// Triglycerides >= 200
    HighTriglycerides = 4,
    /// HDL cholesterol < 40
    LowHdl = 5,
    /// BMI >= 25 (Asia-Pacific threshold)
    Obesity = 6,
    /// Current smoker
    Smoking = 7,
}

impl RiskFactor {
    /// Stable snake_case label used in serialized flag maps
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hypertension => "hypertension",
            Self::Diabetes => "diabetes",
            Self::HighTotalCholesterol => "high_total_cholesterol",
            Self::HighTriglycerides => "high_triglycerides",
            Self::LowHdl => "low_hdl",
            Self::Obesity => "obesity",
            Self::Smoking => "smoking",
        }
    }

    /// All factors in guideline order
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Hypertension,
            Self::Diabetes,
            Self::HighTotalCholesterol,
            Self::HighTriglycerides,
            Self::LowHdl,
            Self::Obesity,
            Self::Smoking,
        ]
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The seven boolean risk-factor flags of a derived result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlags {
    /// Systolic >= 140 or diastolic >= 90
    pub hypertension: bool,
    /// Fasting glucose >= 126
    pub diabetes: bool,
    /// Total cholesterol >= 240
    pub high_total_cholesterol: bool,
    /// Triglycerides present and >= 200
    pub high_triglycerides: bool,
    /// HDL cholesterol < 40
    pub low_hdl: bool,
    /// BMI present and >= 25
    pub obesity: bool,
    /// Current smoker
    pub smoking: bool,
}

impl RiskFlags {
    /// Whether the given factor flag is set
    #[must_use]
    pub const fn is_set(&self, factor: RiskFactor) -> bool {
        match factor {
            RiskFactor::Hypertension => self.hypertension,
            RiskFactor::Diabetes => self.diabetes,
            RiskFactor::HighTotalCholesterol => self.high_total_cholesterol,
            RiskFactor::HighTriglycerides => self.high_triglycerides,
            RiskFactor::LowHdl => self.low_hdl,
            RiskFactor::Obesity => self.obesity,
            RiskFactor::Smoking => self.smoking,
        }
    }

    /// Set the given factor flag
    pub fn set(&mut self, factor: RiskFactor) {
        match factor {
            RiskFactor::Hypertension => self.hypertension = true,
            RiskFactor::Diabetes => self.diabetes = true,
            RiskFactor::HighTotalCholesterol => self.high_total_cholesterol = true,
            RiskFactor::HighTriglycerides => self.high_triglycerides = true,
            RiskFactor::LowHdl => self.low_hdl = true,
            RiskFactor::Obesity => self.obesity = true,
            RiskFactor::Smoking => self.smoking = true,
        }
    }

    /// Number of set flags, 0 to 7
    #[must_use]
    pub fn count(&self) -> u8 {
        RiskFactor::all()
            .iter()
            .filter(|factor| self.is_set(**factor))
            .count() as u8
    }
}

/// Aggregate risk classification over the flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskGroup {
    /// Zero or one risk factor
    ZeroToOneRiskFactor,
    /// Two or more risk factors without diabetes
    MultipleRiskFactors,
    /// Diabetes present, coronary heart disease risk equivalent
    ChdRiskEquivalent,
}

impl RiskGroup {
    /// Classify a flag outcome into a risk group.
    ///
    /// Diabetes is checked before the count: diabetes alone, even with
    /// fewer than two factors set, still classifies as CHD risk equivalent.
    #[must_use]
    pub const fn classify(diabetes: bool, risk_factor_count: u8) -> Self {
        if diabetes {
            Self::ChdRiskEquivalent
        } else if risk_factor_count >= 2 {
            Self::MultipleRiskFactors
        } else {
            Self::ZeroToOneRiskFactor
        }
    }

    /// Stable storage string for this group
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroToOneRiskFactor => "ZERO_TO_ONE_RISK_FACTOR",
            Self::MultipleRiskFactors => "MULTIPLE_RISK_FACTORS",
            Self::ChdRiskEquivalent => "CHD_RISK_EQUIVALENT",
        }
    }

    /// Parse a storage string back into a group
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "ZERO_TO_ONE_RISK_FACTOR" => Some(Self::ZeroToOneRiskFactor),
            "MULTIPLE_RISK_FACTORS" => Some(Self::MultipleRiskFactors),
            "CHD_RISK_EQUIVALENT" => Some(Self::ChdRiskEquivalent),
            _ => None,
        }
    }

    /// All groups in ascending severity order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [
            Self::ZeroToOneRiskFactor,
            Self::MultipleRiskFactors,
            Self::ChdRiskEquivalent,
        ]
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A derived risk result ready for persistence
///
/// Invariants, upheld by the evaluator and asserted in tests:
/// - `invalid` implies all flags false, count 0, group zero-to-one, no BMI
/// - `risk_factor_count` always equals the number of set flags
/// - group is CHD risk equivalent exactly when the diabetes flag is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Raw record this result was derived from (unique, 1:1)
    pub raw_id: i64,
    /// Body mass index rounded to one decimal, when computable
    pub bmi: Option<f64>,
    /// The seven risk-factor flags
    pub flags: RiskFlags,
    /// Number of set flags
    pub risk_factor_count: u8,
    /// Aggregate classification
    pub risk_group: RiskGroup,
    /// Version tag of the rule set that produced this result
    pub rule_version: String,
    /// Wall-clock cost of scoring this record, whole milliseconds
    pub evaluation_time_ms: u32,
    /// Record failed the plausibility gate and was not scored
    pub invalid: bool,
}

/// A derived result together with its store-assigned identity
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRiskResult {
    /// Surrogate id assigned on insert
    pub id: i64,
    /// The derived result fields
    pub result: RiskResult,
    /// Insert timestamp assigned by the store
    pub created_at: NaiveDateTime,
}
