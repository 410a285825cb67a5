use std::collections::BTreeMap;

use serde::Serialize;

use super::types::ChartOutput;
use crate::dataset::OverflowEvent;

pub const PIE_TITLE: &str = "Sewage Overflow Duration by Source Type";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<PieSlice>,
}

/// Total duration per source type, one slice each, ordered by source type.
pub fn duration_by_source(rows: &[&OverflowEvent]) -> ChartOutput<PieChart> {
    if rows.is_empty() {
        return ChartOutput::no_data();
    }

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for e in rows {
        *totals.entry(e.source_type.as_str()).or_default() += e.duration();
    }

    ChartOutput::Ready(PieChart {
        title: PIE_TITLE.to_string(),
        slices: totals
            .into_iter()
            .map(|(label, value)| PieSlice {
                label: label.to_string(),
                value,
            })
            .collect(),
    })
}
