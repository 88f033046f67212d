//! Paged batch derivation of risk results
//!
//! Pages through the raw store in insertion order, scores every record of
//! a page with the pure evaluator (fanned out across worker threads) and
//! persists the page as a single unit. Before a run the derived table is
//! cleared wholesale for the active rule version, which makes reprocessing
//! idempotent with respect to rule changes.

use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;

use crate::config::EtlConfig;
use crate::error::{Result, RiskScreenError};
use crate::models::{RiskResult, StoredMeasurement};
use crate::rules::{self, RULE_VERSION};
use crate::store::{RawStore, ResultStore};
use crate::utils::progress;

/// Outcome of one batch derivation run
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    /// Rows read from the raw store and scored
    pub rows_processed: u64,
    /// Rows that passed the validity gate
    pub valid_rows: u64,
    /// Rows rejected by the validity gate
    pub invalid_rows: u64,
    /// Pages persisted
    pub pages: u64,
    /// Derived rows cleared before the run
    pub cleared: u64,
    /// Wall-clock duration of the whole run
    pub elapsed: Duration,
}

impl ProcessSummary {
    /// Overall throughput in rows per second
    #[must_use]
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows_processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of valid rows, percent
    #[must_use]
    pub fn valid_percentage(&self) -> f64 {
        percentage(self.valid_rows, self.rows_processed)
    }

    /// Share of invalid rows, percent
    #[must_use]
    pub fn invalid_percentage(&self) -> f64 {
        percentage(self.invalid_rows, self.rows_processed)
    }
}

/// Drives the evaluator over the raw store page by page
pub struct BatchProcessor {
    batch_size: usize,
    max_page_retries: u32,
    workers: usize,
    show_progress: bool,
}

impl BatchProcessor {
    /// Build a processor from the pipeline configuration, sized to the
    /// available cores
    #[must_use]
    pub fn new(config: &EtlConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_page_retries: config.max_page_retries.max(1),
            workers: num_cpus::get(),
            show_progress: config.show_progress,
        }
    }

    /// Override the evaluation worker count
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run a full derivation pass over the raw store.
    ///
    /// Clears the derived table for the active rule version first, then
    /// processes pages until the raw store is exhausted. Callers must
    /// serialize full runs per rule version; concurrent runs over the same
    /// version race on the reprocessing window.
    pub fn run<S>(&self, store: &mut S) -> Result<ProcessSummary>
    where
        S: RawStore + ResultStore,
    {
        let started = Instant::now();

        let cleared = store.clear_rule_version(RULE_VERSION)?;
        if cleared > 0 {
            info!("Cleared {cleared} derived row(s) for rule version {RULE_VERSION}");
        }

        let total = RawStore::count(store)?;
        info!(
            "Processing {} raw record(s) in pages of {} ({} workers)",
            total, self.batch_size, self.workers
        );

        let pb = if self.show_progress {
            progress::create_row_progress_bar(total, Some("deriving risk results"))
        } else {
            progress::hidden()
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .ok();
        if pool.is_none() {
            warn!("Falling back to the global thread pool for evaluation");
        }

        let mut summary = ProcessSummary {
            rows_processed: 0,
            valid_rows: 0,
            invalid_rows: 0,
            pages: 0,
            cleared,
            elapsed: Duration::ZERO,
        };

        let mut offset = 0u64;
        loop {
            let page = store.fetch_page(offset, self.batch_size)?;
            if page.is_empty() {
                break;
            }
            let page_started = Instant::now();

            let results = match &pool {
                Some(pool) => pool.install(|| score_page(&page)),
                None => score_page(&page),
            };

            self.persist_page(store, &results, summary.pages)?;

            let page_rows = results.len() as u64;
            let page_invalid = results.iter().filter(|r| r.invalid).count() as u64;
            summary.rows_processed += page_rows;
            summary.invalid_rows += page_invalid;
            summary.valid_rows += page_rows - page_invalid;
            summary.pages += 1;
            offset += page_rows;
            pb.inc(page_rows);

            let page_secs = page_started.elapsed().as_secs_f64();
            let rate = if page_secs > 0.0 {
                page_rows as f64 / page_secs
            } else {
                0.0
            };
            info!(
                "Batch {}: {} rows | {:.2}s | {:.0} rows/s",
                summary.pages, page_rows, page_secs, rate
            );
        }

        summary.elapsed = started.elapsed();
        progress::finish_progress_bar(&pb, Some("processing complete"));

        info!(
            "Processing complete: {} rows ({} valid / {} invalid) in {:.2}s, {:.0} rows/s",
            summary.rows_processed,
            summary.valid_rows,
            summary.invalid_rows,
            summary.elapsed.as_secs_f64(),
            summary.rows_per_sec()
        );

        Ok(summary)
    }

    /// Write one page, retrying wholesale on transient store failures.
    ///
    /// The page's rows carry stable raw references and the insert is
    /// transactional, so a retry never observes a half-written page.
    fn persist_page<S: ResultStore>(
        &self,
        store: &mut S,
        results: &[RiskResult],
        page: u64,
    ) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match store.insert_page(results) {
                Ok(_) => return Ok(()),
                // A duplicate reference cannot succeed on retry
                Err(e @ RiskScreenError::DuplicateResult { .. }) => return Err(e),
                Err(e) if attempts >= self.max_page_retries => {
                    return Err(RiskScreenError::Persistence {
                        page,
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!("Page {page} write failed on attempt {attempts}, retrying: {e}");
                }
            }
        }
    }
}

fn score_page(page: &[StoredMeasurement]) -> Vec<RiskResult> {
    page.par_iter()
        .map(|stored| rules::evaluate(&stored.record).into_result(stored.id))
        .collect()
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}
