//! Output types shared by every aggregator.

use serde::{Deserialize, Serialize};

use crate::dataset::OverflowEvent;

pub const NO_DATA_LABEL: &str = "No Data";
pub const NO_DATA_TITLE: &str = "Please reselect your filters (e.g., Date range)";

/// Single-slice chart shown in place of any chart whose input is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    pub title: String,
    pub label: String,
    pub value: f64,
}

impl Default for Placeholder {
    fn default() -> Self {
        Placeholder {
            title: NO_DATA_TITLE.to_string(),
            label: NO_DATA_LABEL.to_string(),
            value: 1.0,
        }
    }
}

/// A chart, or the placeholder when the filtered rows are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "chart", rename_all = "snake_case")]
pub enum ChartOutput<T> {
    NoData(Placeholder),
    Ready(T),
}

impl<T> ChartOutput<T> {
    pub fn no_data() -> Self {
        ChartOutput::NoData(Placeholder::default())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ChartOutput::NoData(_))
    }

    pub fn chart(&self) -> Option<&T> {
        match self {
            ChartOutput::Ready(chart) => Some(chart),
            ChartOutput::NoData(_) => None,
        }
    }
}

/// Numeric column an aggregator can rank or summarise by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Measure {
    #[default]
    #[serde(rename = "Duration Mins")]
    DurationMins,
    #[serde(rename = "Volume Discharged")]
    VolumeDischarged,
}

impl Measure {
    pub const fn label(self) -> &'static str {
        match self {
            Measure::DurationMins => "Duration Mins",
            Measure::VolumeDischarged => "Volume Discharged",
        }
    }

    pub fn of(self, event: &OverflowEvent) -> f64 {
        match self {
            Measure::DurationMins => event.duration(),
            Measure::VolumeDischarged => event.volume(),
        }
    }
}
