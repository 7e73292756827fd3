//! Core data types for normalized health-log tables
//!
//! This module defines the fundamental types used throughout the pipeline:
//! - `Scalar`: A single field value from a store document
//! - `Document`: One record from the external store
//! - `Column` and `ColumnKind`: A named column and its inferred type
//! - `Table`: The columnar view of one category for one user

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use super::datetime::{epoch_millis_to_datetime, parse_datetime};

/// Name of the column that carries the document identifier
pub const ID_COLUMN: &str = "id";

/// A single field value
///
/// Store documents are schema-less, so every cell of a table is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// True for integer and floating point values (booleans are not numeric)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret this value as a point in time
    ///
    /// Timestamps pass through, text is parsed with the supported formats,
    /// numbers are read as Unix epoch milliseconds.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Scalar::Timestamp(ts) => Some(*ts),
            Scalar::Text(s) => parse_datetime(s),
            Scalar::Int(v) => epoch_millis_to_datetime(*v),
            Scalar::Float(v) if v.is_finite() => epoch_millis_to_datetime(v.round() as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(v) => write!(f, "{}", v),
            Scalar::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::Timestamp(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// One document from the external store
///
/// Field order is preserved; it decides column order when documents are
/// assembled into a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Opaque document identifier
    pub id: String,
    /// Field name to value, in document order
    pub fields: Vec<(String, Scalar)>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Builder method: set a field, replacing an existing value in place
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by exact name
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Inferred type of a column, from its non-null values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every value is null
    Empty,
    /// Every non-null value is a timestamp
    DateTime,
    /// Every non-null value is an integer or float
    Numeric,
    /// Every non-null value is a boolean
    Boolean,
    /// Every non-null value is text
    Text,
    /// Anything else
    Mixed,
}

/// A named column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Infer the column type
    pub fn kind(&self) -> ColumnKind {
        let mut kind = ColumnKind::Empty;

        for value in &self.values {
            let value_kind = match value {
                Scalar::Null => continue,
                Scalar::Bool(_) => ColumnKind::Boolean,
                Scalar::Int(_) | Scalar::Float(_) => ColumnKind::Numeric,
                Scalar::Text(_) => ColumnKind::Text,
                Scalar::Timestamp(_) => ColumnKind::DateTime,
            };

            kind = match kind {
                ColumnKind::Empty => value_kind,
                k if k == value_kind => k,
                _ => return ColumnKind::Mixed,
            };
        }

        kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn is_datetime(&self) -> bool {
        self.kind() == ColumnKind::DateTime
    }

    /// True if at least one value exists and every non-null value parses as a
    /// date/time
    pub fn parses_as_datetime(&self) -> bool {
        let mut seen = false;
        for value in self.values.iter().filter(|v| !v.is_null()) {
            if value.to_datetime().is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// True if at least one value parses as a date/time
    pub fn any_parses_as_datetime(&self) -> bool {
        self.values.iter().any(|v| v.to_datetime().is_some())
    }

    /// Number of non-null values
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }
}

/// Columnar view of one category's documents for one user
///
/// Columns are the union of document field names in order of first
/// appearance. Missing fields are `Scalar::Null`. The `id` column always
/// exists for non-empty tables and is unique per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// A table with no rows and no columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble documents into a table
    ///
    /// The document identifier is written into the `id` column, overwriting
    /// a document field of the same name. A repeated identifier replaces the
    /// earlier row in place.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut rows: Vec<Document> = Vec::new();
        let mut row_by_id: HashMap<String, usize> = HashMap::new();

        for mut doc in documents {
            let id = doc.id.clone();
            doc.set(ID_COLUMN, id.clone());

            match row_by_id.get(&id) {
                Some(&idx) => {
                    tracing::warn!(id = %id, "Duplicate document id, keeping the later document");
                    rows[idx] = doc;
                }
                None => {
                    row_by_id.insert(id, rows.len());
                    rows.push(doc);
                }
            }
        }

        let mut names: Vec<String> = Vec::new();
        let mut name_index: HashMap<String, usize> = HashMap::new();
        for doc in &rows {
            for (name, _) in &doc.fields {
                if !name_index.contains_key(name) {
                    name_index.insert(name.clone(), names.len());
                    names.push(name.clone());
                }
            }
        }

        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, vec![Scalar::Null; rows.len()]))
            .collect();

        for (row, doc) in rows.iter_mut().enumerate() {
            for (name, value) in doc.fields.drain(..) {
                columns[name_index[&name]].values[row] = value;
            }
        }

        Self {
            columns,
            row_count: rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Borrow one row as a vector of cells in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Scalar>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate over rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Scalar>> + '_ {
        (0..self.row_count).map(move |i| self.columns.iter().map(|c| &c.values[i]).collect())
    }

    /// First `n` rows, all columns
    pub fn head(&self, n: usize) -> Table {
        let take = n.min(self.row_count);
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[..take].to_vec()))
                .collect(),
            row_count: take,
        }
    }

    /// Copy of this table with rows sorted ascending by the date/time value of
    /// `column`
    ///
    /// The sort is stable. Rows whose value does not parse sort last.
    pub fn sorted_by_time(&self, column: &str) -> Table {
        let Some(key_column) = self.column(column) else {
            return self.clone();
        };

        let keys: Vec<Option<DateTime<Utc>>> =
            key_column.values.iter().map(Scalar::to_datetime).collect();

        let mut order: Vec<usize> = (0..self.row_count).collect();
        order.sort_by(|&a, &b| match (keys[a], keys[b]) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Table {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        order.iter().map(|&i| c.values[i].clone()).collect(),
                    )
                })
                .collect(),
            row_count: self.row_count,
        }
    }

    /// Write the table as CSV, header row first
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.columns.is_empty() {
            csv_writer.flush()?;
            return Ok(());
        }

        csv_writer.write_record(self.column_names())?;
        for row in self.rows() {
            csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_document_builder_replaces_in_place() {
        let doc = Document::new("a")
            .field("wert", 3i64)
            .field("notiz", "ok")
            .field("wert", 5i64);

        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields[0].0, "wert");
        assert_eq!(doc.get("wert"), Some(&Scalar::Int(5)));
    }

    #[test]
    fn test_table_union_of_columns() {
        let docs = vec![
            Document::new("a").field("zeit", ts(1, 8)).field("wert", 3i64),
            Document::new("b").field("wert", 4i64).field("notiz", "müde"),
        ];

        let table = Table::from_documents(docs);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["zeit", "wert", "id", "notiz"]);
        assert_eq!(table.column("notiz").unwrap().values[0], Scalar::Null);
        assert_eq!(table.column("zeit").unwrap().values[1], Scalar::Null);
        assert_eq!(
            table.column(ID_COLUMN).unwrap().values,
            vec![Scalar::from("a"), Scalar::from("b")]
        );
    }

    #[test]
    fn test_document_id_overrides_id_field() {
        let docs = vec![Document::new("doc-1").field("id", 99i64).field("wert", 1i64)];
        let table = Table::from_documents(docs);

        assert_eq!(table.column_names(), vec!["id", "wert"]);
        assert_eq!(table.column("id").unwrap().values[0], Scalar::from("doc-1"));
    }

    #[test]
    fn test_duplicate_ids_keep_one_row() {
        let docs = vec![
            Document::new("a").field("wert", 1i64),
            Document::new("b").field("wert", 2i64),
            Document::new("a").field("wert", 3i64),
        ];
        let table = Table::from_documents(docs);

        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("wert").unwrap().values,
            vec![Scalar::Int(3), Scalar::Int(2)]
        );
    }

    #[test]
    fn test_empty_table() {
        let table = Table::from_documents(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 0);
        assert_eq!(table, Table::empty());
    }

    #[test]
    fn test_column_kind() {
        let col = Column::new("x", vec![Scalar::Int(1), Scalar::Null, Scalar::Float(2.5)]);
        assert_eq!(col.kind(), ColumnKind::Numeric);

        let col = Column::new("x", vec![Scalar::Int(1), Scalar::from("2")]);
        assert_eq!(col.kind(), ColumnKind::Mixed);

        let col = Column::new("x", vec![Scalar::Bool(true), Scalar::Bool(false)]);
        assert_eq!(col.kind(), ColumnKind::Boolean);
        assert!(!col.is_numeric());

        let col = Column::new("x", vec![Scalar::Null, Scalar::Null]);
        assert_eq!(col.kind(), ColumnKind::Empty);
        assert!(!col.parses_as_datetime());
    }

    #[test]
    fn test_sorted_by_time_puts_unparseable_last() {
        let docs = vec![
            Document::new("c").field("zeit", ts(3, 0)),
            Document::new("x").field("zeit", "kaputt"),
            Document::new("a").field("zeit", ts(1, 0)),
            Document::new("b").field("zeit", ts(2, 0)),
        ];
        let table = Table::from_documents(docs).sorted_by_time("zeit");

        let ids: Vec<String> = table
            .column("id")
            .unwrap()
            .values
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "x"]);
    }

    #[test]
    fn test_head_truncates() {
        let docs = (0..50).map(|i| Document::new(format!("d{}", i)).field("wert", i as i64));
        let table = Table::from_documents(docs);

        let head = table.head(30);
        assert_eq!(head.row_count(), 30);
        assert_eq!(head.column_count(), table.column_count());
        assert_eq!(table.head(100).row_count(), 50);
    }

    #[test]
    fn test_write_csv() {
        let docs = vec![
            Document::new("a").field("wert", 3i64),
            Document::new("b").field("notiz", "x, y"),
        ];
        let table = Table::from_documents(docs);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "wert,id,notiz\n3,a,\n,b,\"x, y\"\n");
    }
}
