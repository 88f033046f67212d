use std::path::PathBuf;

use anyhow::{Context, bail};
use log::{info, warn};

use risk_screen::query;
use risk_screen::store::RawStore;
use risk_screen::{BatchProcessor, CsvLoader, EtlConfig, RiskGroup, SqliteHealthStore};

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(source) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: risk-screen <health-check-csv>");
    };

    let config = EtlConfig::from_env();
    info!(
        "Opening store at {} (chunk size {}, batch size {})",
        config.database_path.display(),
        config.chunk_size,
        config.batch_size
    );

    let mut store = SqliteHealthStore::open(&config.database_path)
        .with_context(|| format!("opening store at {}", config.database_path.display()))?;

    // A load is a full reload: raw rows are append-only, so leftovers from
    // a previous run would double-count.
    let existing = store.count()?;
    if existing > 0 {
        warn!("Clearing {existing} existing raw record(s) before reload");
        store.truncate()?;
    }

    let load = CsvLoader::new(&config)
        .load(&source, &mut store)
        .with_context(|| format!("loading {}", source.display()))?;

    let process = BatchProcessor::new(&config)
        .run(&mut store)
        .context("deriving risk results")?;

    let distribution = query::risk_distribution(&store).context("reading risk distribution")?;

    info!("==================== Performance Report ====================");
    info!(
        "Load:    {} rows ({} skipped) in {:.2}s | {:.0} rows/s",
        load.rows_loaded,
        load.rows_skipped,
        load.elapsed.as_secs_f64(),
        load.rows_per_sec()
    );
    info!(
        "Derive:  {} rows ({} valid {:.1}% / {} invalid {:.1}%) in {:.2}s | {:.0} rows/s",
        process.rows_processed,
        process.valid_rows,
        process.valid_percentage(),
        process.invalid_rows,
        process.invalid_percentage(),
        process.elapsed.as_secs_f64(),
        process.rows_per_sec()
    );
    for group in RiskGroup::all() {
        if let Some(share) = distribution.groups.get(&group) {
            info!("  {:30} {:>8} ({:>5.1}%)", group.as_str(), share.count, share.percentage);
        }
    }
    info!("=============================================================");

    Ok(())
}
