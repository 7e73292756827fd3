//! The four health-log categories tracked per user

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a category is charted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPolicy {
    /// Time on x, value on y, colour from value
    Scatter,
    /// Time on x, value on y, rows sorted by time
    Line,
    /// Events counted per calendar day
    DailyBars,
}

impl ChartPolicy {
    /// Short name used in artifact file names
    pub fn file_tag(&self) -> &'static str {
        match self {
            ChartPolicy::Scatter => "scatter",
            ChartPolicy::Line => "line",
            ChartPolicy::DailyBars => "bars",
        }
    }
}

/// A health-log category
///
/// Ordering follows the fixed processing order: bowel movement, mood,
/// symptom, meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BowelMovement,
    Mood,
    Symptom,
    Meal,
}

impl Category {
    /// All categories in processing order
    pub fn all() -> [Category; 4] {
        [
            Category::BowelMovement,
            Category::Mood,
            Category::Symptom,
            Category::Meal,
        ]
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::BowelMovement => "bowel-movement",
            Category::Mood => "mood",
            Category::Symptom => "symptom",
            Category::Meal => "meal",
        }
    }

    /// Store sub-collection under `users/{uid}/`
    pub fn subcollection(&self) -> &'static str {
        match self {
            Category::BowelMovement => "stuhlgaenge",
            Category::Mood => "stimmungen",
            Category::Symptom => "symptoms",
            Category::Meal => "mahlzeiten",
        }
    }

    pub fn chart_policy(&self) -> ChartPolicy {
        match self {
            Category::BowelMovement | Category::Symptom => ChartPolicy::Scatter,
            Category::Mood => ChartPolicy::Line,
            Category::Meal => ChartPolicy::DailyBars,
        }
    }

    /// Value column names to try first, highest priority first
    pub fn preferred_value_columns(&self) -> &'static [&'static str] {
        match self {
            Category::BowelMovement => &[
                "konsistenz",
                "consistency",
                "bristol",
                "typ",
                "type",
                "score",
                "wert",
                "value",
                "level",
                "intensitaet",
                "intensität",
                "intensity",
                "staerke",
                "stärke",
                "strength",
            ],
            Category::Mood => &["wert", "value", "score", "level"],
            Category::Symptom => &[
                "intensitaet",
                "intensität",
                "intensity",
                "staerke",
                "stärke",
                "strength",
                "wert",
                "value",
                "score",
                "level",
                "schmerz",
                "pain",
                "severity",
            ],
            Category::Meal => &[],
        }
    }

    /// Human readable heading
    pub fn title(&self) -> &'static str {
        match self {
            Category::BowelMovement => "Stuhlgang",
            Category::Mood => "Stimmung",
            Category::Symptom => "Symptome",
            Category::Meal => "Mahlzeiten",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Category::all()
            .into_iter()
            .find(|c| c.tag() == lowered || c.subcollection() == lowered)
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected one of: bowel-movement, mood, symptom, meal)",
                    s
                )
            })
    }
}
