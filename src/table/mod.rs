//! Normalized tables built from schema-less store documents
//!
//! - `types`: `Scalar`, `Document`, `Column`, `Table`
//! - `datetime`: parsing of loosely formatted time values
//! - `detect`: heuristic time/value column detection

pub mod datetime;
pub mod detect;
pub mod types;

pub use datetime::{epoch_millis_to_datetime, parse_datetime};
pub use detect::{
    detect_time_column, detect_value_column, ColumnDetector, TimeParsing, TimeRule, ValueRule,
    TIME_NAME_FRAGMENTS,
};
pub use types::{Column, ColumnKind, Document, Scalar, Table, ID_COLUMN};
