//! Progress reporting utilities for long-running operations
//!
//! Standardized progress bars for the loader and batch processor, using
//! the indicatif crate.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for a row-oriented progress bar
pub const ROW_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}) {msg}";

/// Default style for a byte-oriented progress bar
pub const BYTE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {msg}";

/// Create a progress bar tracking a known number of rows
///
/// # Arguments
/// * `total_rows` - Total length for the progress bar
/// * `description` - Optional description to display as the initial message
#[must_use]
pub fn create_row_progress_bar(total_rows: u64, description: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_rows);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(ROW_TEMPLATE)
            .unwrap()
            .progress_chars("#>-"),
    );

    if let Some(desc) = description {
        pb.set_message(desc.to_string());
    }

    pb
}

/// Create a progress bar tracking bytes consumed from a source file
#[must_use]
pub fn create_byte_progress_bar(total_bytes: u64, description: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BYTE_TEMPLATE)
            .unwrap()
            .progress_chars("#>-"),
    );

    if let Some(desc) = description {
        pb.set_message(desc.to_string());
    }

    pb
}

/// Create a hidden bar for runs with progress display disabled
#[must_use]
pub fn hidden() -> ProgressBar {
    ProgressBar::hidden()
}

/// Finish a progress bar with a completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
