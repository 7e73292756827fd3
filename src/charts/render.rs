//! SVG chart rendering with plotters

use chrono::{DateTime, Utc};
use plotters::prelude::*;

use super::model::{Chart, ChartData, ChartPoint, DailyCount};
use super::RenderError;
use crate::category::ChartPolicy;

const FONT: &str = "sans-serif";
const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const BAR_COLOR: RGBColor = RGBColor(100, 149, 237);

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Draws `Chart`s as SVG documents
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(1000, 500)
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render to SVG text; identical charts give identical output
    pub fn render_svg(&self, chart: &Chart) -> Result<String, RenderError> {
        if chart.is_empty() {
            return Err(RenderError::Empty(chart.title.clone()));
        }

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            match (&chart.data, chart.policy) {
                (ChartData::Points(points), ChartPolicy::Line) => {
                    draw_time_series(&root, chart, points, true)?
                }
                (ChartData::Points(points), _) => draw_time_series(&root, chart, points, false)?,
                (ChartData::DailyCounts(counts), _) => draw_daily_bars(&root, chart, counts)?,
            }

            root.present().map_err(draw_err)?;
        }
        Ok(svg)
    }
}

fn draw_time_series<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    chart: &Chart,
    points: &[ChartPoint],
    as_line: bool,
) -> Result<(), RenderError>
where
    DB::ErrorType: 'static,
{
    let (start, end) = chart
        .time_range()
        .ok_or_else(|| RenderError::Empty(chart.title.clone()))?;
    let (lo, hi) = chart
        .value_range()
        .ok_or_else(|| RenderError::Empty(chart.title.clone()))?;

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (FONT, 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(start..end, lo..hi)
        .map_err(draw_err)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(8)
        .x_label_formatter(&|t: &DateTime<Utc>| t.format("%d.%m.%y").to_string())
        .label_style((FONT, 13))
        .draw()
        .map_err(draw_err)?;

    if as_line {
        ctx.draw_series(LineSeries::new(
            points.iter().map(|p| (p.time, p.value)),
            LINE_COLOR.stroke_width(2),
        ))
        .map_err(draw_err)?;
        ctx.draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.time, p.value), 3, LINE_COLOR.filled())),
        )
        .map_err(draw_err)?;
    } else {
        ctx.draw_series(points.iter().map(|p| {
            let (r, g, b) = chart.point_color(p.value);
            Circle::new((p.time, p.value), 5, RGBColor(r, g, b).filled())
        }))
        .map_err(draw_err)?;
    }

    Ok(())
}

fn draw_daily_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    chart: &Chart,
    counts: &[DailyCount],
) -> Result<(), RenderError>
where
    DB::ErrorType: 'static,
{
    let labels: Vec<String> = counts
        .iter()
        .map(|d| d.date.format("%d.%m.%Y").to_string())
        .collect();
    let y_max = chart.max_count() + 1;

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, (FONT, 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0usize..y_max)
        .map_err(draw_err)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels((counts.len() + 1).min(16))
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .label_style((FONT, 13))
        .draw()
        .map_err(draw_err)?;

    ctx.draw_series(counts.iter().enumerate().map(|(i, d)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), d.count)],
            BAR_COLOR.filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))
    .map_err(draw_err)?;

    Ok(())
}
