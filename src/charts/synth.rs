//! Per-category chart synthesis
//!
//! Turns one category's table into a `Chart` and writes it as an SVG
//! artifact. Missing data never raises an error; the synthesizer simply
//! produces no chart.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use super::model::{Chart, ChartData, ChartPoint, DailyCount};
use super::render::ChartRenderer;
use super::RenderError;
use crate::artifacts::ArtifactStore;
use crate::category::Category;
use crate::config::AnalyticsConfig;
use crate::table::{Column, ColumnDetector, Table, TimeParsing};

/// A chart written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub chart: Chart,
}

/// Builds and renders category charts
pub struct ChartSynthesizer {
    detector: ColumnDetector,
    /// Meal rows with a broken time are dropped, not fatal to the chart
    meal_detector: ColumnDetector,
    preferred: HashMap<Category, Vec<String>>,
    renderer: ChartRenderer,
    artifacts: Arc<ArtifactStore>,
}

impl ChartSynthesizer {
    pub fn new(artifacts: Arc<ArtifactStore>, config: &AnalyticsConfig) -> Self {
        let preferred = Category::all()
            .into_iter()
            .map(|c| (c, config.preferred_columns_for(c)))
            .collect();

        let detector = ColumnDetector::with_time_fragments(&config.time_fragments);
        Self {
            meal_detector: detector.clone().with_time_parsing(TimeParsing::Lenient),
            detector,
            preferred,
            renderer: ChartRenderer::new(config.chart_width, config.chart_height),
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    fn preferred_columns(&self, category: Category) -> &[String] {
        self.preferred.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chart model for a category's table, or `None` when there is nothing
    /// to plot
    pub fn build(&self, category: Category, table: &Table, user_id: &str) -> Option<Chart> {
        if table.is_empty() {
            tracing::info!("No {} entries for '{}'", category, user_id);
            return None;
        }

        let chart = match category {
            Category::BowelMovement => self.bowel_movement_chart(table, user_id),
            Category::Mood => self.mood_chart(table, user_id),
            Category::Symptom => self.symptom_chart(table, user_id),
            Category::Meal => self.meal_chart(table, user_id),
        };

        match chart {
            Some(chart) if !chart.is_empty() => Some(chart),
            Some(_) => {
                tracing::warn!("{}: no plottable rows for '{}'", category, user_id);
                None
            }
            None => None,
        }
    }

    /// Build, render and save the chart for one category
    pub async fn render(
        &self,
        category: Category,
        table: &Table,
        user_id: &str,
    ) -> Result<Option<ChartArtifact>, RenderError> {
        let Some(chart) = self.build(category, table, user_id) else {
            return Ok(None);
        };

        let svg = self.renderer.render_svg(&chart)?;
        let path = self.artifacts.chart_path(category, user_id);
        self.artifacts
            .write(&path, svg.as_bytes())
            .await
            .map_err(|source| RenderError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Saved {} chart to {:?}", category, path);
        Ok(Some(ChartArtifact { path, chart }))
    }

    fn bowel_movement_chart(&self, table: &Table, user_id: &str) -> Option<Chart> {
        let (time, value) = self.time_and_value(Category::BowelMovement, table)?;
        Some(Chart {
            category: Category::BowelMovement,
            policy: Category::BowelMovement.chart_policy(),
            title: format!("Stuhlgang - {}", user_id),
            x_label: "Zeit".to_string(),
            y_label: value.name.clone(),
            data: ChartData::Points(collect_points(time, value)),
        })
    }

    fn mood_chart(&self, table: &Table, user_id: &str) -> Option<Chart> {
        let (time, value) = self.time_and_value(Category::Mood, table)?;
        let sorted = table.sorted_by_time(&time.name);
        let time = sorted.column(&time.name)?;
        let value = sorted.column(&value.name)?;

        Some(Chart {
            category: Category::Mood,
            policy: Category::Mood.chart_policy(),
            title: format!("Stimmung - {}", user_id),
            x_label: "Zeit".to_string(),
            y_label: "Stimmungswert".to_string(),
            data: ChartData::Points(collect_points(time, value)),
        })
    }

    fn symptom_chart(&self, table: &Table, user_id: &str) -> Option<Chart> {
        let (time, value) = self.time_and_value(Category::Symptom, table)?;
        Some(Chart {
            category: Category::Symptom,
            policy: Category::Symptom.chart_policy(),
            title: format!("Symptome - {}", user_id),
            x_label: "Zeit".to_string(),
            y_label: "Symptomstärke".to_string(),
            data: ChartData::Points(collect_points(time, value)),
        })
    }

    fn meal_chart(&self, table: &Table, user_id: &str) -> Option<Chart> {
        let Some(time) = self.meal_detector.detect_time_column(table) else {
            tracing::warn!("{}: no time column found", Category::Meal);
            return None;
        };

        Some(Chart {
            category: Category::Meal,
            policy: Category::Meal.chart_policy(),
            title: format!("Mahlzeiten pro Tag - {}", user_id),
            x_label: "Datum".to_string(),
            y_label: "Anzahl Mahlzeiten".to_string(),
            data: ChartData::DailyCounts(count_per_day(time)),
        })
    }

    fn time_and_value<'t>(
        &self,
        category: Category,
        table: &'t Table,
    ) -> Option<(&'t Column, &'t Column)> {
        let time = self.detector.detect_time_column(table);
        let value = self
            .detector
            .detect_value_column(table, self.preferred_columns(category));

        match (time, value) {
            (Some(time), Some(value)) => Some((time, value)),
            _ => {
                tracing::warn!("{}: no usable time/value column found", category);
                None
            }
        }
    }
}

/// Rows with both a parseable time and a finite value, in row order
fn collect_points(time: &Column, value: &Column) -> Vec<ChartPoint> {
    time.values
        .iter()
        .zip(&value.values)
        .filter_map(|(t, v)| {
            let time = t.to_datetime()?;
            let value = v.as_f64().filter(|v| v.is_finite())?;
            Some(ChartPoint { time, value })
        })
        .collect()
}

/// Rows per UTC calendar day; rows whose time does not parse are dropped
fn count_per_day(time: &Column) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for dt in time.values.iter().filter_map(|v| v.to_datetime()) {
        *counts.entry(dt.date_naive()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}
