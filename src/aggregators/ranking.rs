//! Best/worst assets by total duration or volume.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::types::{ChartOutput, Measure};
use crate::dataset::OverflowEvent;

/// `Best` ranks smallest totals first, `Worst` largest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum RankDirection {
    Best,
    #[default]
    Worst,
}

fn default_count() -> Option<i64> {
    Some(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRequest {
    #[serde(default)]
    pub metric: Measure,
    #[serde(default)]
    pub direction: RankDirection,
    /// Number of asset groups to show. Missing, non-positive or too-large
    /// values fall back to 1.
    #[serde(default = "default_count")]
    pub count: Option<i64>,
}

impl Default for RankingRequest {
    fn default() -> Self {
        RankingRequest {
            metric: Measure::default(),
            direction: RankDirection::default(),
            count: default_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetTotals {
    pub asset_name: String,
    pub source_type: String,
    pub duration_mins: f64,
    pub volume_discharged: f64,
    /// Total for the requested metric.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingChart {
    pub title: String,
    pub metric: Measure,
    pub direction: RankDirection,
    pub shown: usize,
    /// Asset names in rank order; the category axis must follow this.
    pub category_order: Vec<String>,
    /// Bars stacked by source type, in rank order.
    pub bars: Vec<AssetTotals>,
}

/// Resolves the requested count against the number of distinct assets.
pub fn clamp_count(requested: Option<i64>, available: usize) -> usize {
    match requested {
        Some(n) if n > 0 && (n as u64) <= available as u64 => n as usize,
        _ => 1,
    }
}

pub fn asset_ranking(
    rows: &[&OverflowEvent],
    request: &RankingRequest,
) -> ChartOutput<RankingChart> {
    if rows.is_empty() {
        return ChartOutput::no_data();
    }

    let available = rows
        .iter()
        .map(|e| e.asset_name.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let shown = clamp_count(request.count, available);

    let mut totals: BTreeMap<(&str, &str), (f64, f64)> = BTreeMap::new();
    for e in rows {
        let entry = totals
            .entry((e.asset_name.as_str(), e.source_type.as_str()))
            .or_default();
        entry.0 += e.duration();
        entry.1 += e.volume();
    }

    let mut groups: Vec<AssetTotals> = totals
        .into_iter()
        .map(|((asset, source), (duration, volume))| AssetTotals {
            asset_name: asset.to_string(),
            source_type: source.to_string(),
            duration_mins: duration,
            volume_discharged: volume,
            value: match request.metric {
                Measure::DurationMins => duration,
                Measure::VolumeDischarged => volume,
            },
        })
        .collect();

    // Groups arrive ordered by (asset, source); a stable ascending sort keeps
    // that as the tie-break, and reversing it gives the exact Worst order.
    groups.sort_by(|a, b| a.value.total_cmp(&b.value));
    if request.direction == RankDirection::Worst {
        groups.reverse();
    }
    groups.truncate(shown);

    let mut category_order: Vec<String> = Vec::with_capacity(groups.len());
    for g in &groups {
        if !category_order.contains(&g.asset_name) {
            category_order.push(g.asset_name.clone());
        }
    }

    ChartOutput::Ready(RankingChart {
        title: format!("Asset Performance by {}", request.metric.label()),
        metric: request.metric,
        direction: request.direction,
        shown,
        category_order,
        bars: groups,
    })
}
