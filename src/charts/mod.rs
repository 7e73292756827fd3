//! Chart synthesis
//!
//! - `model`: the `Chart` description shared by SVG output and report pages
//! - `synth`: per-category chart building and artifact writing
//! - `render`: SVG drawing

mod model;
mod render;
mod synth;

pub use model::{viridis, Chart, ChartData, ChartPoint, DailyCount};
pub use render::ChartRenderer;
pub use synth::{ChartArtifact, ChartSynthesizer};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while drawing or saving a chart
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to draw for chart '{0}'")]
    Empty(String),

    #[error("Chart drawing failed: {0}")]
    Draw(String),

    #[error("Failed to write chart {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
