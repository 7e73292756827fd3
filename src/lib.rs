//! # CEDmate Analytics
//!
//! Chart and report generation for per-user health logs. Records of four
//! categories (bowel movements, mood, symptoms, meals) are read from a
//! document store, normalized into tables, charted as SVG and merged into a
//! PDF export.
//!
//! ## Features
//!
//! - **Schema-tolerant tables**: documents with German/English field names
//!   are coerced into columns of tagged scalars
//! - **Column detection**: ordered rules pick the time and value columns
//! - **Charts**: scatter, line and daily bar charts rendered with plotters
//! - **Reports**: title page, chart pages and raw-data pages in one PDF
//! - **Store backends**: Firestore REST, JSON snapshots, in-memory
//!
//! ## Modules
//!
//! - [`table`]: `Scalar`, `Table`, date parsing and column detection
//! - [`store`]: document store adapters and the record fetcher
//! - [`charts`]: chart model, synthesis and SVG rendering
//! - [`analytics`]: per-user orchestration
//! - [`report`]: PDF export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cedmate_analytics::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let store = build_store(&config.store).await?;
//!     let artifacts = Arc::new(ArtifactStore::new(&config.output.dir));
//!
//!     let engine = Arc::new(AnalyticsEngine::new(store, artifacts, &config.analytics));
//!     let result = engine.generate("some-uid").await?;
//!     println!("{}", result.to_json());
//!
//!     let exporter = ReportExporter::new(engine, &config.analytics);
//!     let summary = exporter.export("some-uid").await?;
//!     println!("Report written to {:?}", summary.path);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod artifacts;
pub mod category;
pub mod charts;
pub mod config;
pub mod report;
pub mod store;
pub mod table;

// Re-export top-level types for convenience
pub use analytics::{AnalyticsEngine, AnalyticsError, AnalyticsResult, CategoryOutcome};

pub use artifacts::{sanitize_user_id, ArtifactStore};

pub use category::{Category, ChartPolicy};

pub use charts::{Chart, ChartArtifact, ChartRenderer, ChartSynthesizer, RenderError};

pub use config::{
    AnalyticsConfig, Config, ConfigError, LoggingConfig, OutputConfig, StoreBackend, StoreConfig,
};

pub use report::{ExportSummary, PageKind, ReportError, ReportExporter};

pub use store::{
    build_store, CollectionPath, DocumentStore, FirestoreStore, MemoryStore, RecordFetcher,
    SnapshotStore, StoreError,
};

pub use table::{Column, ColumnDetector, ColumnKind, Document, Scalar, Table};
