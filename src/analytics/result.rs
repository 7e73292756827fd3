//! Outcome of one analytics run

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::category::Category;
use crate::charts::ChartArtifact;

/// What happened to one category during a run
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryOutcome {
    /// A chart was written
    Rendered(ChartArtifact),
    /// No data, or no usable columns
    Absent,
    /// The category failed and the run continued
    Failed(String),
}

impl CategoryOutcome {
    pub fn artifact(&self) -> Option<&ChartArtifact> {
        match self {
            CategoryOutcome::Rendered(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CategoryOutcome::Failed(_))
    }
}

/// Per-category outcomes of a run, one entry for every category
#[derive(Debug, Clone)]
pub struct AnalyticsResult {
    user_id: String,
    run_id: Uuid,
    outcomes: BTreeMap<Category, CategoryOutcome>,
}

impl AnalyticsResult {
    /// A result with every category absent
    pub fn new(user_id: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            run_id,
            outcomes: Category::all()
                .into_iter()
                .map(|c| (c, CategoryOutcome::Absent))
                .collect(),
        }
    }

    pub(crate) fn set(&mut self, category: Category, outcome: CategoryOutcome) {
        self.outcomes.insert(category, outcome);
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn outcome(&self, category: Category) -> &CategoryOutcome {
        static ABSENT: CategoryOutcome = CategoryOutcome::Absent;
        self.outcomes.get(&category).unwrap_or(&ABSENT)
    }

    /// Chart path for a category; absent and failed both read as `None`
    pub fn path(&self, category: Category) -> Option<&Path> {
        self.outcome(category).artifact().map(|a| a.path.as_path())
    }

    /// Outcomes in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryOutcome)> {
        self.outcomes.iter().map(|(c, o)| (*c, o))
    }

    /// Written charts in category order
    pub fn charts(&self) -> impl Iterator<Item = (Category, &ChartArtifact)> {
        self.iter()
            .filter_map(|(c, o)| o.artifact().map(|artifact| (c, artifact)))
    }

    /// Category to path mapping
    pub fn paths(&self) -> BTreeMap<Category, Option<PathBuf>> {
        self.iter()
            .map(|(c, o)| (c, o.artifact().map(|a| a.path.clone())))
            .collect()
    }

    pub fn failures(&self) -> Vec<(Category, &str)> {
        self.iter()
            .filter_map(|(c, o)| match o {
                CategoryOutcome::Failed(reason) => Some((c, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// `{"bowel-movement": "<path>" | null, ...}`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (category, outcome) in self.iter() {
            let value = match outcome.artifact() {
                Some(artifact) => json!(artifact.path.to_string_lossy()),
                None => Value::Null,
            };
            map.insert(category.tag().to_string(), value);
        }
        Value::Object(map)
    }
}
