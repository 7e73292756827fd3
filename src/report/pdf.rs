//! PDF composition
//!
//! Lays out the export document on A4 pages with printpdf: a title page,
//! one page per chart artifact and one grid page per raw table.
//!
//! Chart pages embed the SVG artifact scaled to the page. Should the SVG not
//! parse, the page is drawn from the chart model instead.

use chrono::{DateTime, Duration, Local};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb, Svg, SvgTransform,
};
use serde::Serialize;
use std::io::BufWriter;

use super::ReportError;
use crate::category::{Category, ChartPolicy};
use crate::charts::{Chart, ChartData};
use crate::table::Table;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;

/// Average glyph width of Helvetica, as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

/// Resolution used to size embedded SVGs before scaling
const SVG_DPI: f32 = 96.0;
const MM_PER_INCH: f32 = 25.4;

/// One page of the export, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "page", content = "category", rename_all = "snake_case")]
pub enum PageKind {
    Title,
    Chart(Category),
    Table(Category),
}

/// A generated chart with the SVG text of its artifact
pub struct ChartPage<'a> {
    pub category: Category,
    pub chart: &'a Chart,
    pub svg: String,
}

/// Everything that goes into one export document
pub struct ReportContent<'a> {
    pub product_name: &'a str,
    pub user_id: &'a str,
    pub generated_at: DateTime<Local>,
    /// Charts in category order
    pub charts: Vec<ChartPage<'a>>,
    /// Raw tables in category order
    pub tables: Vec<(Category, &'a Table)>,
    /// Rows shown per table
    pub row_limit: usize,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn pdf_err(context: &str) -> impl Fn(printpdf::Error) -> ReportError + '_ {
    move |e| ReportError::Pdf(format!("{}: {}", context, e))
}

/// Compose the document and return its bytes and page list
pub fn compose(content: &ReportContent<'_>) -> Result<(Vec<u8>, Vec<PageKind>), ReportError> {
    let title = format!("{} - Datenexport", content.product_name);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_err("PDF font error"))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err("PDF font error"))?,
    };

    let mut pages = vec![PageKind::Title];
    draw_title_page(&doc.get_page(page).get_layer(layer), &fonts, content, &title);

    for chart in &content.charts {
        let layer = new_page(&doc, &format!("chart-{}", chart.category));
        draw_chart_page(&layer, &fonts, chart);
        pages.push(PageKind::Chart(chart.category));
    }

    for (category, table) in &content.tables {
        let layer = new_page(&doc, &format!("table-{}", category));
        draw_table_page(&layer, &fonts, *category, table, content.row_limit);
        pages.push(PageKind::Table(*category));
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_err("PDF save error"))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Pdf(format!("PDF buffer error: {}", e)))?;

    Ok((bytes, pages))
}

fn new_page(doc: &PdfDocumentReference, name: &str) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), name);
    doc.get_page(page).get_layer(layer)
}

/// Builtin fonts only cover Latin-1
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM
}

/// Cut `text` so it fits `width` mm at `size` pt
fn truncate_to_width(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * GLYPH_WIDTH * PT_TO_MM)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn text(layer: &PdfLayerReference, value: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
    layer.use_text(pdf_text(value), size, Mm(x), Mm(y), font);
}

fn centered(layer: &PdfLayerReference, value: &str, size: f32, y: f32, font: &IndirectFontRef) {
    let x = ((PAGE_WIDTH - text_width(value, size)) / 2.0).max(MARGIN);
    text(layer, value, size, x, y, font);
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn line(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}

fn filled_rect(layer: &PdfLayerReference, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
    layer.set_fill_color(color);
    layer.add_rect(Rect::new(Mm(x0), Mm(y0), Mm(x1), Mm(y1)));
}

fn stroked_rect(layer: &PdfLayerReference, x0: f32, y0: f32, x1: f32, y1: f32) {
    layer.add_rect(Rect::new(Mm(x0), Mm(y0), Mm(x1), Mm(y1)).with_mode(PaintMode::Stroke));
}

// ============================================
// Title page
// ============================================

fn draw_title_page(layer: &PdfLayerReference, fonts: &Fonts, content: &ReportContent<'_>, title: &str) {
    centered(layer, title, 24.0, 220.0, &fonts.bold);
    centered(
        layer,
        &format!("Benutzer: {}", content.user_id),
        16.0,
        193.0,
        &fonts.regular,
    );
    centered(
        layer,
        &format!(
            "Erstellt am: {}",
            content.generated_at.format("%d.%m.%Y - %H:%M")
        ),
        12.0,
        178.0,
        &fonts.regular,
    );
}

// ============================================
// Chart pages
// ============================================

/// Plot area in page coordinates (mm, origin bottom left)
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f32,
    bottom: f32,
    width: f32,
    height: f32,
}

impl Frame {
    fn x(&self, fraction: f64) -> f32 {
        self.left + self.width * fraction.clamp(0.0, 1.0) as f32
    }

    fn y(&self, fraction: f64) -> f32 {
        self.bottom + self.height * fraction.clamp(0.0, 1.0) as f32
    }

    fn right(&self) -> f32 {
        self.left + self.width
    }

    fn top(&self) -> f32 {
        self.bottom + self.height
    }
}

fn draw_chart_page(layer: &PdfLayerReference, fonts: &Fonts, page: &ChartPage<'_>) {
    text(layer, page.category.title(), 18.0, MARGIN, 270.0, &fonts.bold);

    match Svg::parse(&page.svg) {
        Ok(svg) => {
            let frame = Frame {
                left: MARGIN,
                bottom: 130.0,
                width: PAGE_WIDTH - 2.0 * MARGIN,
                height: 132.0,
            };
            embed_svg(layer, svg, frame);
        }
        Err(e) => {
            tracing::warn!(
                "{} chart artifact is not usable SVG, drawing from data: {}",
                page.category,
                e
            );
            draw_chart_model(layer, fonts, page.chart);
        }
    }
}

/// Place `svg` in `frame`, keeping its aspect ratio, aligned to the top
fn embed_svg(layer: &PdfLayerReference, svg: Svg, frame: Frame) {
    let width_mm = svg.width.0.max(1) as f32 / SVG_DPI * MM_PER_INCH;
    let height_mm = svg.height.0.max(1) as f32 / SVG_DPI * MM_PER_INCH;
    let scale = (frame.width / width_mm).min(frame.height / height_mm);

    svg.into_xobject(layer).add_to_layer(
        layer,
        SvgTransform {
            translate_x: Some(Mm(frame.left).into()),
            translate_y: Some(Mm(frame.top() - height_mm * scale).into()),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(SVG_DPI),
            ..Default::default()
        },
    );
}

fn draw_chart_model(layer: &PdfLayerReference, fonts: &Fonts, chart: &Chart) {
    text(layer, &chart.title, 11.0, MARGIN, 262.0, &fonts.regular);

    let frame = Frame {
        left: MARGIN + 12.0,
        bottom: 150.0,
        width: PAGE_WIDTH - 2.0 * MARGIN - 12.0,
        height: 95.0,
    };

    layer.set_outline_color(rgb(0, 0, 0));
    layer.set_outline_thickness(0.5);
    stroked_rect(layer, frame.left, frame.bottom, frame.right(), frame.top());

    match &chart.data {
        ChartData::Points(_) => draw_points(layer, fonts, chart, frame),
        ChartData::DailyCounts(_) => draw_bars(layer, fonts, chart, frame),
    }

    text(layer, &chart.x_label, 9.0, frame.left + frame.width / 2.0 - 8.0, frame.bottom - 14.0, &fonts.regular);
    text(layer, &chart.y_label, 9.0, MARGIN, frame.top() + 3.0, &fonts.regular);
}

fn draw_points(layer: &PdfLayerReference, fonts: &Fonts, chart: &Chart, frame: Frame) {
    let (Some((start, end)), Some((lo, hi))) = (chart.time_range(), chart.value_range()) else {
        return;
    };
    let span = (end - start).num_milliseconds().max(1) as f64;
    let to_xy = |time: DateTime<chrono::Utc>, value: f64| {
        let fx = (time - start).num_milliseconds() as f64 / span;
        let fy = (value - lo) / (hi - lo);
        (frame.x(fx), frame.y(fy))
    };

    let points = chart.points();
    if chart.policy == ChartPolicy::Line && points.len() > 1 {
        layer.set_outline_color(rgb(31, 119, 180));
        layer.set_outline_thickness(1.0);
        layer.add_line(Line {
            points: points
                .iter()
                .map(|p| {
                    let (x, y) = to_xy(p.time, p.value);
                    (Point::new(Mm(x), Mm(y)), false)
                })
                .collect(),
            is_closed: false,
        });
    }

    for p in points {
        let (x, y) = to_xy(p.time, p.value);
        let (r, g, b) = if chart.policy == ChartPolicy::Line {
            (31, 119, 180)
        } else {
            chart.point_color(p.value)
        };
        filled_rect(layer, x - 0.9, y - 0.9, x + 0.9, y + 0.9, rgb(r, g, b));
    }

    layer.set_fill_color(rgb(0, 0, 0));
    let ticks = 4;
    for i in 0..=ticks {
        let f = i as f64 / ticks as f64;
        let t = start + Duration::milliseconds((span * f) as i64);
        let label = t.format("%d.%m.%y").to_string();
        let x = frame.x(f) - text_width(&label, 7.0) / 2.0;
        text(layer, &label, 7.0, x, frame.bottom - 6.0, &fonts.regular);

        let v = lo + (hi - lo) * f;
        let label = format_value(v);
        text(layer, &label, 7.0, frame.left - text_width(&label, 7.0) - 2.0, frame.y(f) - 1.0, &fonts.regular);
    }
}

fn draw_bars(layer: &PdfLayerReference, fonts: &Fonts, chart: &Chart, frame: Frame) {
    let counts = chart.daily_counts();
    if counts.is_empty() {
        return;
    }
    let y_max = (chart.max_count() + 1) as f64;
    let slot = frame.width / counts.len() as f32;
    let label_every = (counts.len() + 11) / 12;

    for (i, day) in counts.iter().enumerate() {
        let x0 = frame.left + slot * i as f32 + slot * 0.15;
        let x1 = x0 + slot * 0.7;
        let top = frame.y(day.count as f64 / y_max);
        filled_rect(layer, x0, frame.bottom, x1, top, rgb(100, 149, 237));

        layer.set_fill_color(rgb(0, 0, 0));
        let count = day.count.to_string();
        text(layer, &count, 7.0, (x0 + x1) / 2.0 - text_width(&count, 7.0) / 2.0, top + 1.5, &fonts.regular);

        if i % label_every == 0 {
            let label = day.date.format("%d.%m.").to_string();
            text(layer, &label, 7.0, (x0 + x1) / 2.0 - text_width(&label, 7.0) / 2.0, frame.bottom - 6.0, &fonts.regular);
        }
    }
}

fn format_value(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{:.1}", v)
    }
}

// ============================================
// Table pages
// ============================================

const ROW_HEIGHT: f32 = 5.5;
const CELL_FONT: f32 = 7.0;

fn draw_table_page(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    category: Category,
    table: &Table,
    row_limit: usize,
) {
    text(
        layer,
        &format!("Rohdaten - {}", category.subcollection()),
        16.0,
        MARGIN,
        270.0,
        &fonts.bold,
    );

    if table.is_empty() {
        text(layer, "Keine Daten vorhanden.", 12.0, MARGIN, 255.0, &fonts.regular);
        return;
    }

    let shown = table.head(row_limit);
    let width = PAGE_WIDTH - 2.0 * MARGIN;
    let col_width = width / shown.column_count().max(1) as f32;
    let top = 260.0;
    let bottom = top - ROW_HEIGHT * (shown.row_count() + 1) as f32;

    layer.set_outline_color(rgb(0, 0, 0));
    layer.set_outline_thickness(0.3);
    layer.set_fill_color(rgb(0, 0, 0));

    let baseline = |row: usize| top - ROW_HEIGHT * (row as f32 + 1.0) + 1.6;

    for (c, name) in shown.column_names().iter().enumerate() {
        let x = MARGIN + col_width * c as f32 + 1.0;
        let cell = truncate_to_width(name, col_width - 2.0, CELL_FONT);
        text(layer, &cell, CELL_FONT, x, baseline(0), &fonts.bold);
    }

    for (r, row) in shown.rows().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let x = MARGIN + col_width * c as f32 + 1.0;
            let cell = truncate_to_width(&value.to_string(), col_width - 2.0, CELL_FONT);
            text(layer, &cell, CELL_FONT, x, baseline(r + 1), &fonts.regular);
        }
    }

    for r in 0..=shown.row_count() + 1 {
        let y = top - ROW_HEIGHT * r as f32;
        line(layer, (MARGIN, y), (MARGIN + width, y));
    }
    for c in 0..=shown.column_count() {
        let x = MARGIN + col_width * c as f32;
        line(layer, (x, top), (x, bottom));
    }

    if table.row_count() > shown.row_count() {
        text(
            layer,
            &format!("{} von {} Zeilen", shown.row_count(), table.row_count()),
            8.0,
            MARGIN,
            bottom - 6.0,
            &fonts.regular,
        );
    }
}
