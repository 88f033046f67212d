//! Raw health-check measurement records
//!
//! One record per subject per reference year, mapped field-for-field from
//! the national health-check export. Every measurement is nullable because
//! survey and sensor gaps are common in the source data; a blank cell maps
//! to `None`, never to zero.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Smoking status codes used by the health-check survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmokingStatus {
    /// Never smoked
    Never = 1,
    /// Former smoker
    Former = 2,
    /// Current smoker
    Current = 3,
}

impl SmokingStatus {
    /// Convert a survey code to a smoking status, `None` for unknown codes
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Never),
            2 => Some(Self::Former),
            3 => Some(Self::Current),
            _ => None,
        }
    }

    /// Get the numeric survey code for this status
    #[must_use]
    pub const fn as_code(self) -> i16 {
        self as i16
    }

    /// Get a descriptive name for this status
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Former => "former",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for SmokingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A raw health-check record as appended to the raw store
///
/// Owned by the loader and immutable once written. The surrogate id is
/// assigned by the store on append, see [`StoredMeasurement`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    /// Reference year of the checkup round
    pub reference_year: i16,
    /// Opaque subject identifier from the source export
    pub subject_id: Option<String>,
    /// Administrative region code
    pub region_code: Option<i16>,
    /// Sex code (1 male, 2 female)
    pub sex_code: Option<i16>,
    /// Age band code in 5-year bands
    pub age_band_code: Option<i16>,
    /// Height in cm
    pub height_cm: Option<f64>,
    /// Weight in kg
    pub weight_kg: Option<f64>,
    /// Waist circumference in cm
    pub waist_cm: Option<f64>,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: Option<f64>,
    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: Option<f64>,
    /// Fasting glucose in mg/dL
    pub fasting_glucose: Option<f64>,
    /// Total cholesterol in mg/dL
    pub total_cholesterol: Option<f64>,
    /// Triglycerides in mg/dL
    pub triglycerides: Option<f64>,
    /// HDL cholesterol in mg/dL
    pub hdl_cholesterol: Option<f64>,
    /// LDL cholesterol in mg/dL, informational only
    pub ldl_cholesterol: Option<f64>,
    /// Smoking survey code (1 never, 2 former, 3 current)
    pub smoking_code: Option<i16>,
}

impl RawMeasurement {
    /// Smoking status decoded from the survey code
    #[must_use]
    pub fn smoking_status(&self) -> Option<SmokingStatus> {
        self.smoking_code.and_then(SmokingStatus::from_code)
    }
}

/// A raw measurement together with its store-assigned identity
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMeasurement {
    /// Surrogate id assigned on append, unique and insertion-ordered
    pub id: i64,
    /// The measurement fields
    pub record: RawMeasurement,
    /// Append timestamp assigned by the store
    pub created_at: NaiveDateTime,
}
