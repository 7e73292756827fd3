//! Heuristic column detection
//!
//! Field names differ between categories and between app versions (German
//! and English synonyms, `zeit` vs `timestamp` vs `mahlzeitzeitpunkt`), so
//! the chart synthesizer asks the detector which columns to plot.
//!
//! Detection is an ordered list of rules; the first rule that produces a
//! column wins. The same table always yields the same columns.

use super::types::{Column, Table};

/// Default name fragments that mark a time column, in priority order
pub const TIME_NAME_FRAGMENTS: &[&str] = &[
    "zeit",
    "time",
    "datum",
    "date",
    "timestamp",
    "startzeit",
    "endzeit",
    "mahlzeitzeitpunkt",
];

/// One step of time-column detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRule {
    /// First column whose values are all timestamps
    DateTimeTyped,
    /// First column whose lowercased name contains the fragment, accepted only
    /// if its values parse as date/time
    NameFragment(String),
}

/// How much of a name-matched column must parse as date/time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeParsing {
    /// Every non-null value parses
    #[default]
    Strict,
    /// At least one value parses; the caller drops the rest
    Lenient,
}

/// One step of value-column detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRule {
    /// First column whose lowercased name equals the name, accepted only if
    /// numeric
    PreferredName(String),
    /// First numeric column
    AnyNumeric,
}

impl TimeRule {
    fn apply<'t>(&self, table: &'t Table, parsing: TimeParsing) -> Option<&'t Column> {
        match self {
            TimeRule::DateTimeTyped => table.columns().iter().find(|c| c.is_datetime()),
            TimeRule::NameFragment(fragment) => table
                .columns()
                .iter()
                .find(|c| c.name.to_lowercase().contains(fragment.as_str()))
                .filter(|c| match parsing {
                    TimeParsing::Strict => c.parses_as_datetime(),
                    TimeParsing::Lenient => c.any_parses_as_datetime(),
                }),
        }
    }
}

impl ValueRule {
    fn apply<'t>(&self, table: &'t Table) -> Option<&'t Column> {
        match self {
            ValueRule::PreferredName(name) => table
                .columns()
                .iter()
                .find(|c| c.name.to_lowercase() == *name)
                .filter(|c| c.is_numeric()),
            ValueRule::AnyNumeric => table.columns().iter().find(|c| c.is_numeric()),
        }
    }
}

/// Ordered time rules plus the value-rule template
#[derive(Debug, Clone)]
pub struct ColumnDetector {
    time_rules: Vec<TimeRule>,
    time_parsing: TimeParsing,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnDetector {
    /// Detector using the default time-name fragments
    pub fn new() -> Self {
        Self::with_time_fragments(TIME_NAME_FRAGMENTS.iter().copied())
    }

    /// Detector using a custom fragment list, in priority order
    pub fn with_time_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut time_rules = vec![TimeRule::DateTimeTyped];
        time_rules.extend(
            fragments
                .into_iter()
                .map(|f| TimeRule::NameFragment(f.as_ref().to_lowercase())),
        );
        Self {
            time_rules,
            time_parsing: TimeParsing::Strict,
        }
    }

    /// Builder method: set how name-matched time columns are accepted
    pub fn with_time_parsing(mut self, parsing: TimeParsing) -> Self {
        self.time_parsing = parsing;
        self
    }

    pub fn time_rules(&self) -> &[TimeRule] {
        &self.time_rules
    }

    /// Value rules for a preferred-name list
    pub fn value_rules<S: AsRef<str>>(preferred: &[S]) -> Vec<ValueRule> {
        preferred
            .iter()
            .map(|n| ValueRule::PreferredName(n.as_ref().to_lowercase()))
            .chain(std::iter::once(ValueRule::AnyNumeric))
            .collect()
    }

    /// Find the column to use as the x axis
    pub fn detect_time_column<'t>(&self, table: &'t Table) -> Option<&'t Column> {
        for rule in &self.time_rules {
            if let Some(column) = rule.apply(table, self.time_parsing) {
                tracing::debug!(column = %column.name, rule = ?rule, "Detected time column");
                return Some(column);
            }
        }
        None
    }

    /// Find the column to use as the y axis, trying `preferred` names first
    pub fn detect_value_column<'t, S: AsRef<str>>(
        &self,
        table: &'t Table,
        preferred: &[S],
    ) -> Option<&'t Column> {
        for rule in Self::value_rules(preferred) {
            if let Some(column) = rule.apply(table) {
                tracing::debug!(column = %column.name, rule = ?rule, "Detected value column");
                return Some(column);
            }
        }
        None
    }
}

/// Find the time column with the default fragments
pub fn detect_time_column(table: &Table) -> Option<&Column> {
    ColumnDetector::new().detect_time_column(table)
}

/// Find the value column, trying `preferred` names first
pub fn detect_value_column<'t, S: AsRef<str>>(
    table: &'t Table,
    preferred: &[S],
) -> Option<&'t Column> {
    ColumnDetector::new().detect_value_column(table, preferred)
}
