//! Volume over time, either as a raw trend or broken down by a calendar
//! dimension.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::ChartOutput;
use crate::dataset::OverflowEvent;

const WEEKDAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Time axis chosen for the volume chart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum TimeDimension {
    #[default]
    #[serde(rename = "Overflow Event Start Time")]
    EventStart,
    #[serde(rename = "Start Minute")]
    StartMinute,
    #[serde(rename = "Start Hour")]
    StartHour,
    #[serde(rename = "Week day")]
    Weekday,
}

type Strategy = fn(&[&OverflowEvent]) -> TemporalChart;

impl TimeDimension {
    pub const fn label(self) -> &'static str {
        match self {
            TimeDimension::EventStart => "Overflow Event Start Time",
            TimeDimension::StartMinute => "Start Minute",
            TimeDimension::StartHour => "Start Hour",
            TimeDimension::Weekday => "Week day",
        }
    }

    fn strategy(self) -> Strategy {
        match self {
            TimeDimension::EventStart => trend,
            TimeDimension::StartMinute => by_minute,
            TimeDimension::StartHour => by_hour,
            TimeDimension::Weekday => by_weekday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStyle {
    Line,
    GroupedBar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: String,
    pub volume_discharged: f64,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub source_type: String,
    pub volume_discharged: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalChart {
    /// One point per event, chronological.
    Trend {
        title: String,
        points: Vec<TrendPoint>,
    },
    /// Volume summed per (dimension value, source type).
    Breakdown {
        title: String,
        dimension: TimeDimension,
        style: ChartStyle,
        buckets: Vec<Bucket>,
    },
}

pub fn volume_over_time(
    rows: &[&OverflowEvent],
    dimension: TimeDimension,
) -> ChartOutput<TemporalChart> {
    if rows.is_empty() {
        return ChartOutput::no_data();
    }
    ChartOutput::Ready((dimension.strategy())(rows))
}

fn trend(rows: &[&OverflowEvent]) -> TemporalChart {
    let mut sorted = rows.to_vec();
    // None sorts first for Option, so order on (is_none, value) to push
    // unparsed timestamps to the end.
    sorted.sort_by_key(|e| (e.start_time.is_none(), e.start_time));

    TemporalChart::Trend {
        title: "Volume Discharged over time".to_string(),
        points: sorted
            .into_iter()
            .map(|e| TrendPoint {
                timestamp: e
                    .start_time
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| e.start_time_raw.clone()),
                volume_discharged: e.volume(),
                source_type: e.source_type.clone(),
            })
            .collect(),
    }
}

fn by_minute(rows: &[&OverflowEvent]) -> TemporalChart {
    breakdown(rows, TimeDimension::StartMinute, ChartStyle::Line, |e| {
        e.start_minute.map(|m| (m, m.to_string()))
    })
}

fn by_hour(rows: &[&OverflowEvent]) -> TemporalChart {
    breakdown(rows, TimeDimension::StartHour, ChartStyle::GroupedBar, |e| {
        e.start_hour.map(|h| (h, h.to_string()))
    })
}

fn by_weekday(rows: &[&OverflowEvent]) -> TemporalChart {
    breakdown(rows, TimeDimension::Weekday, ChartStyle::GroupedBar, |e| {
        e.weekday.as_ref().map(|day| {
            let rank = WEEKDAY_ORDER
                .iter()
                .position(|d| d.eq_ignore_ascii_case(day))
                .unwrap_or(WEEKDAY_ORDER.len());
            (rank as u32, day.clone())
        })
    })
}

/// Groups rows by `(key, source type)` and sums volume. Rows whose key is
/// missing are skipped. Buckets come out in key order, then source type.
fn breakdown<F>(
    rows: &[&OverflowEvent],
    dimension: TimeDimension,
    style: ChartStyle,
    key: F,
) -> TemporalChart
where
    F: Fn(&OverflowEvent) -> Option<(u32, String)>,
{
    let mut totals: BTreeMap<(u32, String, String), f64> = BTreeMap::new();
    for e in rows {
        if let Some((rank, label)) = key(e) {
            *totals
                .entry((rank, label, e.source_type.clone()))
                .or_default() += e.volume();
        }
    }

    TemporalChart::Breakdown {
        title: format!("Volume Discharged by {}", dimension.label()),
        dimension,
        style,
        buckets: totals
            .into_iter()
            .map(|((_, key, source_type), volume)| Bucket {
                key,
                source_type,
                volume_discharged: volume,
            })
            .collect(),
    }
}
