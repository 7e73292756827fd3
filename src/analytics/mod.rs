//! Analytics generation
//!
//! `AnalyticsEngine::generate` runs the fetch-and-chart pipeline for one
//! user and returns an `AnalyticsResult` with one outcome per category.

mod engine;
mod result;

pub use engine::{validate_user_id, AnalyticsEngine};
pub use result::{AnalyticsResult, CategoryOutcome};

use thiserror::Error;

use crate::category::Category;
use crate::charts::RenderError;
use crate::store::StoreError;

/// Errors that can abort an analytics run
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid user id: {0}")]
    InvalidUser(String),

    #[error("Document store unreachable: {0}")]
    Connectivity(#[source] StoreError),

    #[error("Failed to fetch {category}: {source}")]
    Fetch {
        category: Category,
        #[source]
        source: StoreError,
    },

    #[error("Failed to render {category} chart: {source}")]
    Render {
        category: Category,
        #[source]
        source: RenderError,
    },
}

impl AnalyticsError {
    /// Errors that end the run even when failures are isolated
    pub fn is_fatal(&self) -> bool {
        match self {
            AnalyticsError::InvalidUser(_) | AnalyticsError::Connectivity(_) => true,
            AnalyticsError::Fetch { source, .. } => source.is_connectivity(),
            AnalyticsError::Render { .. } => false,
        }
    }
}
