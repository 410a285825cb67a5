use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::types::ChartOutput;
use crate::dataset::OverflowEvent;

/// Largest marker size; the group with the biggest volume gets this size.
pub const MAX_MARKER_SIZE: f64 = 50.0;
pub const DEFAULT_ZOOM: u8 = 7;
pub const DEFAULT_CENTER: MapCenter = MapCenter {
    latitude: 56.24936914381658,
    longitude: -3.8824581054934506,
};

/// Totally ordered float so coordinates can be part of a grouping key.
#[derive(Debug, Clone, Copy)]
struct Coord(f64);

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub asset_name: String,
    pub year: i32,
    pub source_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub volume_discharged: f64,
    /// Marker size proportional to `volume_discharged`.
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapChart {
    pub title: String,
    /// Number of distinct asset names plotted.
    pub source_count: usize,
    pub center: MapCenter,
    pub zoom: u8,
    pub points: Vec<MapPoint>,
}

/// One point per (asset, year, source type, latitude, longitude) with the
/// group's total volume, coloured by source type downstream.
pub fn overflow_map(rows: &[&OverflowEvent]) -> ChartOutput<MapChart> {
    if rows.is_empty() {
        return ChartOutput::no_data();
    }

    let mut groups: BTreeMap<(&str, i32, &str, Coord, Coord), f64> = BTreeMap::new();
    for e in rows {
        let key = (
            e.asset_name.as_str(),
            e.year,
            e.source_type.as_str(),
            Coord(e.latitude),
            Coord(e.longitude),
        );
        *groups.entry(key).or_default() += e.volume();
    }

    let max_volume = groups.values().copied().fold(0.0_f64, f64::max);
    let source_count = groups
        .keys()
        .map(|(asset, ..)| *asset)
        .collect::<BTreeSet<_>>()
        .len();

    let points = groups
        .into_iter()
        .map(|((asset, year, source, lat, lon), volume)| MapPoint {
            asset_name: asset.to_string(),
            year,
            source_type: source.to_string(),
            latitude: lat.0,
            longitude: lon.0,
            volume_discharged: volume,
            size: if max_volume > 0.0 {
                volume / max_volume * MAX_MARKER_SIZE
            } else {
                0.0
            },
        })
        .collect();

    ChartOutput::Ready(MapChart {
        title: format!("Sewage Overflow Sources: {source_count}"),
        source_count,
        center: DEFAULT_CENTER,
        zoom: DEFAULT_ZOOM,
        points,
    })
}
