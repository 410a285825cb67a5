//! One reactive cycle: a request in, every chart-ready output back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregators::{
    ChartOutput, DistributionChart, MapChart, Measure, PieChart, RankingChart, RankingRequest,
    SidebarMetrics, TemporalChart, TimeDimension, asset_ranking, distribution, duration_by_source,
    overflow_map, sidebar_metrics, volume_over_time,
};
use crate::dataset::Dataset;
use crate::filter::{FilterMode, FilterSelection, apply_filter};
use crate::season::month_options;

/// Current value of every control. Missing fields take the widget defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardRequest {
    pub selection: FilterSelection,
    pub time_dimension: TimeDimension,
    pub ranking: RankingRequest,
    pub box_measure: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub mode: FilterMode,
    /// Months the month control should offer for the selected season.
    pub month_options: Vec<String>,
    pub sidebar: SidebarMetrics,
    pub pie: ChartOutput<PieChart>,
    pub map: ChartOutput<MapChart>,
    pub temporal: ChartOutput<TemporalChart>,
    pub ranking: ChartOutput<RankingChart>,
    pub distribution: ChartOutput<DistributionChart>,
}

/// Filters once and runs every aggregator over the result. Depends only on
/// `dataset` and `request`.
#[tracing::instrument(skip_all, fields(mode = ?request.selection.mode()))]
pub fn render(dataset: &Dataset, request: &DashboardRequest) -> Dashboard {
    let rows = apply_filter(dataset, &request.selection);
    debug!(rows = rows.len(), "Rendering dashboard");

    Dashboard {
        mode: request.selection.mode(),
        month_options: month_options(&request.selection.season, &dataset.options().months),
        sidebar: sidebar_metrics(&rows, dataset.baselines()),
        pie: duration_by_source(&rows),
        map: overflow_map(&rows),
        temporal: volume_over_time(&rows, request.time_dimension),
        ranking: asset_ranking(&rows, &request.ranking),
        distribution: distribution(&rows, request.box_measure),
    }
}
