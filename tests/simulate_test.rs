//! Simulate entry-point tests: input validation and scoring

use risk_screen::simulate::{SimulateRequest, simulate, validate};
use risk_screen::{RULE_VERSION, RiskGroup, SmokingStatus};

fn baseline_request() -> SimulateRequest {
    SimulateRequest {
        age_band: 12,
        sex_code: 1,
        height_cm: 170.0,
        weight_kg: 80.0,
        systolic_bp: 145.0,
        diastolic_bp: 92.0,
        fasting_glucose: 110.0,
        total_cholesterol: 250.0,
        triglycerides: 180.0,
        hdl_cholesterol: 38.0,
        smoking: SmokingStatus::Current,
    }
}

#[test]
fn scores_a_valid_request() {
    let report = simulate(&baseline_request()).unwrap();

    assert_eq!(report.bmi, Some(27.7));
    assert!(report.flags.hypertension);
    assert!(!report.flags.diabetes);
    assert!(report.flags.high_total_cholesterol);
    assert!(!report.flags.high_triglycerides);
    assert!(report.flags.low_hdl);
    assert!(report.flags.obesity);
    assert!(report.flags.smoking);
    assert_eq!(report.risk_factor_count, 5);
    assert_eq!(report.risk_group, RiskGroup::MultipleRiskFactors);
    assert_eq!(report.rule_version, RULE_VERSION);
}

#[test]
fn explanations_cover_every_triggered_flag() {
    let report = simulate(&baseline_request()).unwrap();

    assert_eq!(report.explanations.len(), usize::from(report.risk_factor_count));
    assert_eq!(
        report.explanations[0],
        "Hypertension: SBP>=140 or DBP>=90 (145/92)"
    );
    assert!(
        report
            .explanations
            .iter()
            .any(|line| line == "Smoking: current smoker")
    );
    assert!(
        report
            .explanations
            .iter()
            .any(|line| line.contains("BMI>=25 (27.7)"))
    );
}

#[test]
fn no_explanations_without_flags() {
    let request = SimulateRequest {
        weight_kg: 65.0,
        systolic_bp: 120.0,
        diastolic_bp: 80.0,
        fasting_glucose: 95.0,
        total_cholesterol: 190.0,
        triglycerides: 120.0,
        hdl_cholesterol: 55.0,
        smoking: SmokingStatus::Never,
        ..baseline_request()
    };
    let report = simulate(&request).unwrap();
    assert_eq!(report.risk_factor_count, 0);
    assert!(report.explanations.is_empty());
    assert_eq!(report.risk_group, RiskGroup::ZeroToOneRiskFactor);
}

#[test]
fn diabetes_overrides_the_count_in_simulation_too() {
    let request = SimulateRequest {
        weight_kg: 65.0,
        systolic_bp: 120.0,
        diastolic_bp: 80.0,
        fasting_glucose: 130.0,
        total_cholesterol: 190.0,
        triglycerides: 120.0,
        hdl_cholesterol: 55.0,
        smoking: SmokingStatus::Never,
        ..baseline_request()
    };
    let report = simulate(&request).unwrap();
    assert_eq!(report.risk_factor_count, 1);
    assert_eq!(report.risk_group, RiskGroup::ChdRiskEquivalent);
}

#[test]
fn every_offending_field_is_reported_at_once() {
    let request = SimulateRequest {
        age_band: 2,
        height_cm: 130.0,
        hdl_cholesterol: 10.0,
        triglycerides: 900.0,
        ..baseline_request()
    };

    let errors = simulate(&request).unwrap_err();
    let fields: Vec<&str> = errors.details.keys().copied().collect();
    assert_eq!(
        fields,
        vec!["age_band", "hdl_cholesterol", "height_cm", "triglycerides"]
    );
    assert_eq!(
        errors.details["height_cm"],
        "Must be between 140 and 200"
    );
}

#[test]
fn simulate_bounds_are_narrower_than_the_batch_gate() {
    // hdl 15 is within no band the batch evaluator checks, but the input
    // layer rejects it; the two validation tables are deliberately separate
    let request = SimulateRequest {
        hdl_cholesterol: 15.0,
        ..baseline_request()
    };
    assert!(validate(&request).is_err());

    let mut record = risk_screen::RawMeasurement {
        reference_year: 2024,
        height_cm: Some(170.0),
        weight_kg: Some(65.0),
        systolic_bp: Some(120.0),
        diastolic_bp: Some(80.0),
        fasting_glucose: Some(95.0),
        total_cholesterol: Some(190.0),
        hdl_cholesterol: Some(15.0),
        ..risk_screen::RawMeasurement::default()
    };
    record.triglycerides = Some(120.0);
    let outcome = risk_screen::evaluate(&record);
    assert!(!outcome.invalid);
    assert!(outcome.flags.low_hdl);
}

#[test]
fn report_serializes_with_the_collaborator_field_names() {
    let report = simulate(&baseline_request()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["risk_group"], "MULTIPLE_RISK_FACTORS");
    assert_eq!(json["rule_version"], "guideline-v1");
    assert_eq!(json["flags"]["hypertension"], true);
    assert_eq!(json["flags"]["high_triglycerides"], false);
    assert_eq!(json["risk_factor_count"], 5);

    let errors = simulate(&SimulateRequest {
        height_cm: 130.0,
        ..baseline_request()
    })
    .unwrap_err();
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json["details"]["height_cm"], "Must be between 140 and 200");
}

#[test]
fn boundary_values_pass_validation() {
    let request = SimulateRequest {
        age_band: 5,
        sex_code: 2,
        height_cm: 200.0,
        weight_kg: 30.0,
        systolic_bp: 70.0,
        diastolic_bp: 150.0,
        fasting_glucose: 50.0,
        total_cholesterol: 400.0,
        triglycerides: 30.0,
        hdl_cholesterol: 100.0,
        smoking: SmokingStatus::Former,
    };
    assert!(validate(&request).is_ok());
}
