//! Chart model shared by the SVG renderer and the report pages

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::category::{Category, ChartPolicy};

/// One plotted observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Number of events on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Time/value points, in plotting order
    Points(Vec<ChartPoint>),
    /// Per-day counts, days ascending
    DailyCounts(Vec<DailyCount>),
}

/// Everything needed to draw one category's chart
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub category: Category,
    pub policy: ChartPolicy,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

impl Chart {
    pub fn points(&self) -> &[ChartPoint] {
        match &self.data {
            ChartData::Points(points) => points,
            ChartData::DailyCounts(_) => &[],
        }
    }

    pub fn daily_counts(&self) -> &[DailyCount] {
        match &self.data {
            ChartData::DailyCounts(counts) => counts,
            ChartData::Points(_) => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.data {
            ChartData::Points(points) => points.is_empty(),
            ChartData::DailyCounts(counts) => counts.is_empty(),
        }
    }

    /// Time axis range; a single instant is widened by an hour each side
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let points = self.points();
        let min = points.iter().map(|p| p.time).min()?;
        let max = points.iter().map(|p| p.time).max()?;
        if min == max {
            Some((min - Duration::hours(1), max + Duration::hours(1)))
        } else {
            Some((min, max))
        }
    }

    /// Smallest and largest plotted value
    pub fn value_extent(&self) -> Option<(f64, f64)> {
        let mut values = self.points().iter().map(|p| p.value);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Value axis range with a margin; a flat series is widened by one
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let (lo, hi) = self.value_extent()?;
        if (hi - lo).abs() < f64::EPSILON {
            return Some((lo - 1.0, hi + 1.0));
        }
        let margin = (hi - lo) * 0.05;
        Some((lo - margin, hi + margin))
    }

    /// Largest daily count
    pub fn max_count(&self) -> usize {
        self.daily_counts().iter().map(|d| d.count).max().unwrap_or(0)
    }

    /// Scatter point colour for `value`, on a viridis ramp between the
    /// smallest and largest plotted values
    pub fn point_color(&self, value: f64) -> (u8, u8, u8) {
        match self.value_extent() {
            Some((lo, hi)) if hi > lo => viridis((value - lo) / (hi - lo)),
            _ => viridis(0.5),
        }
    }
}

const VIRIDIS: [(f64, f64, f64); 9] = [
    (68.0, 1.0, 84.0),
    (71.0, 44.0, 122.0),
    (59.0, 81.0, 139.0),
    (44.0, 113.0, 142.0),
    (33.0, 144.0, 141.0),
    (39.0, 173.0, 129.0),
    (92.0, 200.0, 99.0),
    (170.0, 220.0, 50.0),
    (253.0, 231.0, 37.0),
];

/// Sample the viridis colour map at `t` in 0..=1
pub fn viridis(t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - idx as f64;

    let (r0, g0, b0) = VIRIDIS[idx];
    let (r1, g1, b1) = VIRIDIS[idx + 1];
    let lerp = |a: f64, b: f64| (a + (b - a) * frac).round() as u8;
    (lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}
