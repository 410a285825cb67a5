//! Headline numbers: event count and mean duration/volume against baseline.

use serde::Serialize;

use super::utility::{mean, round1};
use crate::dataset::{Baselines, OverflowEvent};

/// Whether a filtered mean sits below the whole-dataset baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorTag {
    BelowBaseline,
    AtOrAboveBaseline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Filtered mean, rounded to one decimal place.
    pub mean: f64,
    pub display: String,
    /// `None` when there were no rows to average.
    pub tag: Option<ColorTag>,
}

impl MetricSummary {
    fn empty() -> Self {
        MetricSummary {
            mean: 0.0,
            display: "0".to_string(),
            tag: None,
        }
    }

    fn against(values: &[f64], baseline: f64) -> Self {
        let mean = round1(mean(values));
        let tag = if mean < baseline {
            ColorTag::BelowBaseline
        } else {
            ColorTag::AtOrAboveBaseline
        };
        MetricSummary {
            mean,
            display: format_deviation(mean, baseline),
            tag: Some(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarMetrics {
    pub count: usize,
    pub duration: MetricSummary,
    pub volume: MetricSummary,
}

/// `"<mean> (+<delta>)"` when above baseline, `"<mean> (<delta>)"` otherwise.
/// Both numbers carry one decimal place.
pub fn format_deviation(mean: f64, baseline: f64) -> String {
    let delta = round1(mean - baseline);
    if delta > 0.0 {
        format!("{mean:.1} (+{delta:.1})")
    } else {
        format!("{mean:.1} ({delta:.1})")
    }
}

pub fn sidebar_metrics(rows: &[&OverflowEvent], baselines: Baselines) -> SidebarMetrics {
    if rows.is_empty() {
        return SidebarMetrics {
            count: 0,
            duration: MetricSummary::empty(),
            volume: MetricSummary::empty(),
        };
    }

    let durations: Vec<f64> = rows.iter().map(|e| e.duration()).collect();
    let volumes: Vec<f64> = rows.iter().map(|e| e.volume()).collect();

    SidebarMetrics {
        count: rows.len(),
        duration: MetricSummary::against(&durations, baselines.duration_mins),
        volume: MetricSummary::against(&volumes, baselines.volume_discharged),
    }
}
