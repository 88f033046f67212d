//! Configuration for the ETL pipeline.

use std::env;
use std::path::PathBuf;

/// Configuration for the loader and batch processor
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Path of the SQLite database holding both tables
    pub database_path: PathBuf,
    /// Maximum rows per append chunk during CSV ingest
    pub chunk_size: usize,
    /// Rows per page during batch derivation
    pub batch_size: usize,
    /// Field delimiter of the source file
    pub delimiter: u8,
    /// Fraction of unmappable rows tolerated before the load aborts
    pub row_error_threshold: f64,
    /// Wholesale retries for a failed page write
    pub max_page_retries: u32,
    /// Render progress bars on long operations
    pub show_progress: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("risk_screen.db"),
            chunk_size: 10_000,
            batch_size: 1_000,
            delimiter: b',',
            row_error_threshold: 0.05,
            max_page_retries: 3,
            show_progress: true,
        }
    }
}

impl EtlConfig {
    /// Build a configuration from `RISK_SCREEN_*` environment variables,
    /// falling back to the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_path: env::var("RISK_SCREEN_DB")
                .map_or(defaults.database_path, PathBuf::from),
            chunk_size: parse_env("RISK_SCREEN_CHUNK_SIZE", defaults.chunk_size),
            batch_size: parse_env("RISK_SCREEN_BATCH_SIZE", defaults.batch_size),
            delimiter: env::var("RISK_SCREEN_DELIMITER")
                .ok()
                .and_then(|v| v.into_bytes().first().copied())
                .unwrap_or(defaults.delimiter),
            row_error_threshold: parse_env(
                "RISK_SCREEN_ROW_ERROR_THRESHOLD",
                defaults.row_error_threshold,
            ),
            max_page_retries: parse_env("RISK_SCREEN_PAGE_RETRIES", defaults.max_page_retries),
            show_progress: defaults.show_progress,
        }
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring unparseable {name}={raw}, using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_baseline() {
        let config = EtlConfig::default();
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.batch_size, 1_000);
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.max_page_retries, 3);
    }
}
