//! Chunked CSV ingest into the raw store
//!
//! Streams the health-check export into the raw table in bounded chunks,
//! tracking throughput per chunk and overall. A malformed row is skipped
//! and counted without touching its neighbours; the load only aborts when
//! the source itself is unusable or the row error rate crosses the
//! configured threshold.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::config::EtlConfig;
use crate::error::{Result, RiskScreenError};
use crate::etl::mapping::HeaderMap;
use crate::models::RawMeasurement;
use crate::store::RawStore;
use crate::utils::progress;

/// Minimum rows seen before the error-rate threshold is enforced
const ERROR_RATE_MIN_ROWS: u64 = 1_000;

/// Outcome of one load run
#[derive(Debug, Clone)]
pub struct LoadSummary {
    /// Rows appended to the raw store
    pub rows_loaded: u64,
    /// Rows skipped by the row-mapping policy
    pub rows_skipped: u64,
    /// Number of append chunks written
    pub chunks: u64,
    /// Wall-clock duration of the whole load
    pub elapsed: Duration,
}

impl LoadSummary {
    /// Overall throughput in rows per second
    #[must_use]
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows_loaded as f64 / secs
        } else {
            0.0
        }
    }
}

/// Streaming CSV loader for the raw store
pub struct CsvLoader {
    chunk_size: usize,
    delimiter: u8,
    row_error_threshold: f64,
    show_progress: bool,
}

impl CsvLoader {
    /// Build a loader from the pipeline configuration
    #[must_use]
    pub fn new(config: &EtlConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            delimiter: config.delimiter,
            row_error_threshold: config.row_error_threshold,
            show_progress: config.show_progress,
        }
    }

    /// Load a source file into the raw store.
    ///
    /// Fails fatally when the file is missing or its header lacks mapped
    /// columns; individual bad rows are skipped and counted unless their
    /// share exceeds the configured threshold.
    pub fn load(&self, path: &Path, store: &mut dyn RawStore) -> Result<LoadSummary> {
        let metadata = fs::metadata(path).map_err(|e| RiskScreenError::SourceFormat {
            path: path.to_path_buf(),
            message: format!("cannot stat source file: {e}"),
        })?;
        if !metadata.is_file() {
            return Err(RiskScreenError::SourceFormat {
                path: path.to_path_buf(),
                message: "source path is not a file".to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(path)?;

        let header_map = HeaderMap::from_headers(reader.headers()?).map_err(|message| {
            RiskScreenError::SourceFormat {
                path: path.to_path_buf(),
                message,
            }
        })?;

        info!(
            "Loading {} (chunk size {})",
            path.display(),
            self.chunk_size
        );

        let pb = if self.show_progress {
            progress::create_byte_progress_bar(metadata.len(), Some("loading raw records"))
        } else {
            progress::hidden()
        };

        let started = Instant::now();
        let mut summary = LoadSummary {
            rows_loaded: 0,
            rows_skipped: 0,
            chunks: 0,
            elapsed: Duration::ZERO,
        };

        let mut buffer: Vec<RawMeasurement> = Vec::with_capacity(self.chunk_size);
        let records = reader.into_records();

        for chunk in &records.chunks(self.chunk_size) {
            let chunk_started = Instant::now();
            buffer.clear();

            for record in chunk {
                match record {
                    Ok(row) => {
                        let (line, byte) = row
                            .position()
                            .map_or((0, 0), |pos| (pos.line(), pos.byte()));
                        pb.set_position(byte);

                        match header_map.map_row(line, &row) {
                            Ok(mapped) => buffer.push(mapped),
                            Err(err) => {
                                summary.rows_skipped += 1;
                                debug!("Skipping line {}: {}", err.line, err.reason);
                            }
                        }
                    }
                    Err(e) => {
                        if e.is_io_error() {
                            return Err(e.into());
                        }
                        // Record-local decode problem, same policy as a bad row
                        summary.rows_skipped += 1;
                        debug!("Skipping undecodable record: {e}");
                    }
                }
            }

            if buffer.is_empty() {
                continue;
            }

            let appended = store.append(&buffer)? as u64;
            summary.rows_loaded += appended;
            summary.chunks += 1;

            let chunk_secs = chunk_started.elapsed().as_secs_f64();
            let rate = if chunk_secs > 0.0 {
                appended as f64 / chunk_secs
            } else {
                0.0
            };
            info!(
                "Chunk {}: {} rows | {:.2}s | {:.0} rows/s",
                summary.chunks, appended, chunk_secs, rate
            );

            self.check_error_rate(path, &summary)?;
        }

        summary.elapsed = started.elapsed();
        progress::finish_progress_bar(&pb, Some("load complete"));

        if summary.rows_skipped > 0 {
            warn!(
                "Skipped {} unmappable row(s) out of {}",
                summary.rows_skipped,
                summary.rows_loaded + summary.rows_skipped
            );
        }
        self.check_error_rate(path, &summary)?;

        info!(
            "Load complete: {} rows in {} chunk(s), {:.2}s, {:.0} rows/s",
            summary.rows_loaded,
            summary.chunks,
            summary.elapsed.as_secs_f64(),
            summary.rows_per_sec()
        );

        Ok(summary)
    }

    fn check_error_rate(&self, path: &Path, summary: &LoadSummary) -> Result<()> {
        let seen = summary.rows_loaded + summary.rows_skipped;
        if seen < ERROR_RATE_MIN_ROWS {
            return Ok(());
        }
        let rate = summary.rows_skipped as f64 / seen as f64;
        if rate > self.row_error_threshold {
            return Err(RiskScreenError::SourceFormat {
                path: path.to_path_buf(),
                message: format!(
                    "row error rate {:.1}% exceeds threshold {:.1}%",
                    rate * 100.0,
                    self.row_error_threshold * 100.0
                ),
            });
        }
        Ok(())
    }
}
