//! Generate a synthetic health-check CSV shaped like the national export.
//!
//! Emits the 16 mapped columns with realistic value distributions, survey
//! gaps (blank cells) and a small share of implausible measurements so a
//! generated file exercises both sides of the validity gate.

use std::path::PathBuf;

use anyhow::{Context, bail};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use risk_screen::etl::COLUMN_MAPPING;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(output) = args.next().map(PathBuf::from) else {
        bail!("usage: generate_checkups <output-csv> [rows] [seed]");
    };
    let rows: u64 = args
        .next()
        .map_or(Ok(10_000), |raw| raw.parse())
        .context("rows must be an integer")?;
    let seed: u64 = args
        .next()
        .map_or(Ok(42), |raw| raw.parse())
        .context("seed must be an integer")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("creating {}", output.display()))?;

    writer.write_record(COLUMN_MAPPING.iter().map(|m| m.source))?;

    for subject in 0..rows {
        writer.write_record(generate_row(&mut rng, subject))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows, output.display());
    Ok(())
}

fn generate_row(rng: &mut StdRng, subject: u64) -> Vec<String> {
    // Source anthropometry comes binned to 5cm / 5kg steps
    let height = 140 + rng.random_range(0..=12) * 5;
    let weight = 40 + rng.random_range(0..=18) * 5;

    let waist = rng.random_range(60..=110);
    // A thin tail of sensor glitches lands outside the plausibility bands
    let systolic = rng.random_range(95..=185);
    let systolic = glitch(rng, systolic, 300);
    let diastolic = rng.random_range(55..=110);
    let glucose = rng.random_range(70..=190);
    let glucose = glitch(rng, glucose, 20);
    let total_cholesterol = rng.random_range(120..=320);
    let triglycerides = rng.random_range(40..=380);
    let hdl = rng.random_range(25..=95);
    let ldl = rng.random_range(50..=220);
    let smoking = rng.random_range(1..=3);

    let region = rng.random_range(11..=50);
    let sex = rng.random_range(1..=2);
    let age_band = rng.random_range(5..=18);

    vec![
        "2024".to_string(),
        format!("S-{subject:07}"),
        region.to_string(),
        sex.to_string(),
        age_band.to_string(),
        maybe_blank(rng, 0.02, height),
        maybe_blank(rng, 0.02, weight),
        maybe_blank(rng, 0.05, waist),
        maybe_blank(rng, 0.03, systolic),
        maybe_blank(rng, 0.03, diastolic),
        maybe_blank(rng, 0.04, glucose),
        maybe_blank(rng, 0.04, total_cholesterol),
        maybe_blank(rng, 0.08, triglycerides),
        maybe_blank(rng, 0.04, hdl),
        maybe_blank(rng, 0.10, ldl),
        maybe_blank(rng, 0.02, smoking),
    ]
}

fn maybe_blank(rng: &mut StdRng, gap_rate: f64, value: i64) -> String {
    if rng.random_bool(gap_rate) {
        String::new()
    } else {
        value.to_string()
    }
}

fn glitch(rng: &mut StdRng, value: i64, glitched: i64) -> i64 {
    if rng.random_bool(0.01) { glitched } else { value }
}
