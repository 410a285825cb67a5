//! Per-source-type box plots of duration or volume.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{ChartOutput, Measure};
use super::utility::{mean, quantile};
use crate::dataset::OverflowEvent;

/// Ranges spanning this many orders of magnitude or more use a log axis.
pub const LOG_SCALE_MIN_MAGNITUDE: f64 = 5.0;

const WHISKER_IQR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    Linear,
    Log,
}

/// Picks the axis scale from the spread of values. Zero, negative or
/// non-finite ranges are linear.
pub fn choose_scale(range: f64) -> AxisScale {
    if range > 0.0 && range.is_finite() && range.log10().floor() >= LOG_SCALE_MIN_MAGNITUDE {
        AxisScale::Log
    } else {
        AxisScale::Linear
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub source_type: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Furthest values still within 1.5×IQR of the quartiles.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    /// `values` must be non-empty.
    fn from_values(source_type: &str, mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);

        let q1 = quantile(&values, 0.25);
        let median = quantile(&values, 0.5);
        let q3 = quantile(&values, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - WHISKER_IQR * iqr, q3 + WHISKER_IQR * iqr);

        let inside = || values.iter().copied().filter(|v| *v >= lo_fence && *v <= hi_fence);
        let lower_whisker = inside().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside().fold(f64::NEG_INFINITY, f64::max);

        BoxSummary {
            source_type: source_type.to_string(),
            count: values.len(),
            mean: mean(&values),
            min: values[0],
            q1,
            median,
            q3,
            max: values[values.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers: values
                .iter()
                .copied()
                .filter(|v| *v < lo_fence || *v > hi_fence)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionChart {
    pub title: String,
    pub measure: Measure,
    /// `max - min` over every filtered row.
    pub range: f64,
    pub scale: AxisScale,
    /// One horizontal box per source type, ordered by source type.
    pub boxes: Vec<BoxSummary>,
}

pub fn distribution(rows: &[&OverflowEvent], measure: Measure) -> ChartOutput<DistributionChart> {
    if rows.is_empty() {
        return ChartOutput::no_data();
    }

    let mut by_source: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for e in rows {
        let v = measure.of(e);
        min = min.min(v);
        max = max.max(v);
        by_source.entry(e.source_type.as_str()).or_default().push(v);
    }
    let range = max - min;

    ChartOutput::Ready(DistributionChart {
        title: measure.label().to_string(),
        measure,
        range,
        scale: choose_scale(range),
        boxes: by_source
            .into_iter()
            .map(|(source, values)| BoxSummary::from_values(source, values))
            .collect(),
    })
}
