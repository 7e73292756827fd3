//! Consolidated PDF export
//!
//! - `exporter`: orchestrates charts, raw tables and the output file
//! - `pdf`: page layout

mod exporter;
mod pdf;

pub use exporter::{ExportSummary, ReportExporter};
pub use pdf::{compose, ChartPage, PageKind, ReportContent};

use std::path::PathBuf;
use thiserror::Error;

use crate::analytics::AnalyticsError;
use crate::category::Category;
use crate::store::StoreError;

/// Errors that can occur while exporting a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error("Failed to fetch {category} for the report: {source}")]
    Fetch {
        category: Category,
        #[source]
        source: StoreError,
    },

    #[error("PDF composition failed: {0}")]
    Pdf(String),

    #[error("Failed to write report {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
