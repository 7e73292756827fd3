//! Report export
//!
//! Runs the analytics pipeline, re-fetches the raw tables and writes one
//! PDF per user.

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

use super::pdf::{compose, ChartPage, PageKind, ReportContent};
use super::ReportError;
use crate::analytics::{AnalyticsEngine, AnalyticsResult};
use crate::category::Category;
use crate::config::AnalyticsConfig;

/// What an export produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub pages: Vec<PageKind>,
    #[serde(skip)]
    pub analytics: AnalyticsResult,
}

impl ExportSummary {
    pub fn chart_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p, PageKind::Chart(_)))
            .count()
    }
}

/// Writes the consolidated PDF export for a user
pub struct ReportExporter {
    engine: Arc<AnalyticsEngine>,
    product_name: String,
    row_limit: usize,
}

impl ReportExporter {
    pub fn new(engine: Arc<AnalyticsEngine>, config: &AnalyticsConfig) -> Self {
        Self {
            engine,
            product_name: config.product_name.clone(),
            row_limit: config.report_row_limit,
        }
    }

    /// Generate charts, fetch raw data and write `export_{user}.pdf`
    pub async fn export(&self, user_id: &str) -> Result<ExportSummary, ReportError> {
        let span = tracing::info_span!("export", user = %user_id);
        self.run(user_id).instrument(span).await
    }

    async fn run(&self, user_id: &str) -> Result<ExportSummary, ReportError> {
        tracing::info!("Starting PDF export for '{}'", user_id);

        let analytics = self.engine.generate(user_id).await?;

        let mut charts = Vec::new();
        for (category, artifact) in analytics.charts() {
            match tokio::fs::read_to_string(&artifact.path).await {
                Ok(svg) => charts.push(ChartPage {
                    category,
                    chart: &artifact.chart,
                    svg,
                }),
                Err(e) => tracing::warn!(
                    "{} chart unreadable at {:?}, skipping page: {}",
                    category,
                    artifact.path,
                    e
                ),
            }
        }

        let mut tables = Vec::with_capacity(4);
        for category in Category::all() {
            let table = self
                .engine
                .fetcher()
                .fetch(category, user_id)
                .await
                .map_err(|source| ReportError::Fetch { category, source })?;
            tables.push((category, table));
        }

        let (bytes, pages) = compose(&ReportContent {
            product_name: &self.product_name,
            user_id,
            generated_at: Local::now(),
            charts,
            tables: tables.iter().map(|(c, t)| (*c, t)).collect(),
            row_limit: self.row_limit,
        })?;

        let path = self.engine.artifacts().report_path(user_id);
        self.engine
            .artifacts()
            .write(&path, &bytes)
            .await
            .map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!(pages = pages.len(), "PDF created: {:?}", path);
        Ok(ExportSummary {
            path,
            pages,
            analytics,
        })
    }
}
