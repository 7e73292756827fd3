//! Analytics orchestration
//!
//! For one user: check the store, then fetch and chart each category in
//! fixed order. Connectivity failures abort the run; other per-category
//! failures are recorded and skipped when isolation is enabled.

use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::result::{AnalyticsResult, CategoryOutcome};
use super::AnalyticsError;
use crate::artifacts::ArtifactStore;
use crate::category::Category;
use crate::charts::{ChartArtifact, ChartSynthesizer};
use crate::config::AnalyticsConfig;
use crate::store::{DocumentStore, RecordFetcher};

/// Reject ids that cannot name a user document
pub fn validate_user_id(user_id: &str) -> Result<(), AnalyticsError> {
    if user_id.trim().is_empty() {
        return Err(AnalyticsError::InvalidUser("user id is empty".to_string()));
    }
    if user_id.contains('/') {
        return Err(AnalyticsError::InvalidUser(format!(
            "user id '{}' contains '/'",
            user_id
        )));
    }
    Ok(())
}

/// Generates the chart set for a user
pub struct AnalyticsEngine {
    fetcher: RecordFetcher,
    synthesizer: ChartSynthesizer,
    isolate_failures: bool,
}

impl AnalyticsEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        artifacts: Arc<ArtifactStore>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            fetcher: RecordFetcher::new(store),
            synthesizer: ChartSynthesizer::new(artifacts, config),
            isolate_failures: config.isolate_failures,
        }
    }

    pub fn fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        self.synthesizer.artifacts()
    }

    pub fn isolates_failures(&self) -> bool {
        self.isolate_failures
    }

    /// Produce every category's chart for `user_id`
    pub async fn generate(&self, user_id: &str) -> Result<AnalyticsResult, AnalyticsError> {
        validate_user_id(user_id)?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("analytics", user = %user_id, run_id = %run_id);
        self.run(user_id, run_id).instrument(span).await
    }

    async fn run(&self, user_id: &str, run_id: Uuid) -> Result<AnalyticsResult, AnalyticsError> {
        let store = self.fetcher.store();
        store
            .health_check(user_id)
            .await
            .map_err(AnalyticsError::Connectivity)?;
        tracing::debug!(backend = store.name(), "Store reachable");

        let mut result = AnalyticsResult::new(user_id, run_id);
        for category in Category::all() {
            let outcome = match self.run_category(category, user_id).await {
                Ok(Some(artifact)) => CategoryOutcome::Rendered(artifact),
                Ok(None) => CategoryOutcome::Absent,
                Err(e) if self.isolate_failures && !e.is_fatal() => {
                    tracing::warn!("{} failed, continuing: {}", category, e);
                    CategoryOutcome::Failed(e.to_string())
                }
                Err(e) => return Err(e),
            };
            result.set(category, outcome);
        }

        let rendered = result.charts().count();
        tracing::info!(
            rendered,
            failed = result.failures().len(),
            "Analytics complete for '{}'",
            user_id
        );
        Ok(result)
    }

    async fn run_category(
        &self,
        category: Category,
        user_id: &str,
    ) -> Result<Option<ChartArtifact>, AnalyticsError> {
        let table = self
            .fetcher
            .fetch(category, user_id)
            .await
            .map_err(|source| AnalyticsError::Fetch { category, source })?;

        self.synthesizer
            .render(category, &table, user_id)
            .await
            .map_err(|source| AnalyticsError::Render { category, source })
    }
}
