use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::aggregators::utility::mean;

/// Sentinel option meaning "no constraint" for year, season, area and month.
pub const ALL: &str = "All";

// ---------------------------------------------------------------------------
// OverflowEvent – one row of the source table
// ---------------------------------------------------------------------------

/// A single recorded sewage overflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverflowEvent {
    pub asset_name: String,
    pub year: i32,
    pub month: String,
    pub season: String,
    pub area: String,
    pub source_type: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `None` when the cell was blank or not a number.
    pub duration_mins: Option<f64>,
    pub volume_discharged: Option<f64>,
    /// Start time exactly as it appeared in the source.
    pub start_time_raw: String,
    /// Parsed start time; `None` if the raw value was not a recognised format.
    pub start_time: Option<NaiveDateTime>,
    pub start_minute: Option<u32>,
    pub start_hour: Option<u32>,
    pub weekday: Option<String>,
}

impl OverflowEvent {
    pub fn duration(&self) -> f64 {
        self.duration_mins.unwrap_or(0.0)
    }

    pub fn volume(&self) -> f64 {
        self.volume_discharged.unwrap_or(0.0)
    }

    /// Valid rows have a strictly positive duration and volume.
    pub fn is_valid(&self) -> bool {
        self.duration() > 0.0 && self.volume() > 0.0
    }
}

// ---------------------------------------------------------------------------
// Baselines – whole-dataset reference means
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baselines {
    pub duration_mins: f64,
    pub volume_discharged: f64,
}

impl Baselines {
    /// Means over valid rows only. An input with no valid rows yields zeros.
    pub fn from_events(events: &[OverflowEvent]) -> Self {
        let (durations, volumes): (Vec<f64>, Vec<f64>) = events
            .iter()
            .filter(|e| e.is_valid())
            .map(|e| (e.duration(), e.volume()))
            .unzip();

        Baselines {
            duration_mins: mean(&durations),
            volume_discharged: mean(&volumes),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterOptions – selectable values for each control
// ---------------------------------------------------------------------------

/// Sorted unique values per column. Year, season, area and month carry a
/// trailing [`ALL`] entry; asset names and source types do not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub assets: Vec<String>,
    pub years: Vec<String>,
    pub seasons: Vec<String>,
    pub source_types: Vec<String>,
    pub areas: Vec<String>,
    pub months: Vec<String>,
}

impl FilterOptions {
    pub fn from_events(events: &[OverflowEvent]) -> Self {
        fn unique<T: Ord + ToString>(values: impl Iterator<Item = T>) -> Vec<String> {
            values
                .collect::<BTreeSet<T>>()
                .into_iter()
                .map(|v| v.to_string())
                .collect()
        }
        fn with_all(mut values: Vec<String>) -> Vec<String> {
            values.push(ALL.to_string());
            values
        }

        FilterOptions {
            assets: unique(events.iter().map(|e| e.asset_name.as_str())),
            years: with_all(unique(events.iter().map(|e| e.year))),
            seasons: with_all(unique(events.iter().map(|e| e.season.as_str()))),
            source_types: unique(events.iter().map(|e| e.source_type.as_str())),
            areas: with_all(unique(events.iter().map(|e| e.area.as_str()))),
            months: with_all(unique(events.iter().map(|e| e.month.as_str()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the loaded table
// ---------------------------------------------------------------------------

/// Read-only handle passed to every filter and aggregation call.
#[derive(Debug, Clone)]
pub struct Dataset {
    events: Vec<OverflowEvent>,
    options: FilterOptions,
    baselines: Baselines,
}

impl Dataset {
    /// Derives filter options and baselines once; neither changes afterwards.
    pub fn new(events: Vec<OverflowEvent>) -> Self {
        let options = FilterOptions::from_events(&events);
        let baselines = Baselines::from_events(&events);
        Dataset {
            events,
            options,
            baselines,
        }
    }

    pub fn events(&self) -> &[OverflowEvent] {
        &self.events
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn baselines(&self) -> Baselines {
        self.baselines
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_valid()).count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds an event with the fields most tests care about; everything else
    /// gets a plausible fixed value.
    pub(crate) fn event(asset: &str, source: &str, duration: f64, volume: f64) -> OverflowEvent {
        OverflowEvent {
            asset_name: asset.to_string(),
            year: 2023,
            month: "January".to_string(),
            season: "Winter".to_string(),
            area: "North".to_string(),
            source_type: source.to_string(),
            latitude: 56.0,
            longitude: -3.5,
            duration_mins: Some(duration),
            volume_discharged: Some(volume),
            start_time_raw: "2023-01-10 08:15:00".to_string(),
            start_time: crate::dataset::parse_timestamp("2023-01-10 08:15:00"),
            start_minute: Some(15),
            start_hour: Some(8),
            weekday: Some("Tuesday".to_string()),
        }
    }

    #[test]
    fn test_validity_requires_positive_duration_and_volume() {
        assert!(event("A", "CSO", 1.0, 1.0).is_valid());
        assert!(!event("A", "CSO", 0.0, 1.0).is_valid());
        assert!(!event("A", "CSO", 1.0, -2.0).is_valid());

        let mut missing = event("A", "CSO", 1.0, 1.0);
        missing.volume_discharged = None;
        assert!(!missing.is_valid());
    }

    #[test]
    fn test_baselines_ignore_invalid_rows() {
        let events = vec![
            event("A", "CSO", 10.0, 100.0),
            event("B", "CSO", 20.0, 300.0),
            event("C", "CSO", 0.0, 5000.0),
            event("D", "CSO", 9000.0, 0.0),
        ];
        let baselines = Baselines::from_events(&events);

        assert_eq!(baselines.duration_mins, 15.0);
        assert_eq!(baselines.volume_discharged, 200.0);
    }

    #[test]
    fn test_baselines_with_no_valid_rows_are_zero() {
        let baselines = Baselines::from_events(&[event("A", "CSO", 0.0, 0.0)]);
        assert_eq!(baselines.duration_mins, 0.0);
        assert_eq!(baselines.volume_discharged, 0.0);
    }

    #[test]
    fn test_filter_options_sorted_with_all_sentinel() {
        let mut b = event("Beta", "EO", 1.0, 1.0);
        b.year = 2021;
        b.area = "East".to_string();
        b.month = "March".to_string();
        b.season = "Spring".to_string();
        let events = vec![event("Alpha", "CSO", 1.0, 1.0), b, event("Alpha", "CSO", 2.0, 2.0)];

        let options = FilterOptions::from_events(&events);

        assert_eq!(options.assets, vec!["Alpha", "Beta"]);
        assert_eq!(options.source_types, vec!["CSO", "EO"]);
        assert_eq!(options.years, vec!["2021", "2023", "All"]);
        assert_eq!(options.areas, vec!["East", "North", "All"]);
        assert_eq!(options.seasons, vec!["Spring", "Winter", "All"]);
        assert_eq!(options.months, vec!["January", "March", "All"]);
    }

    #[test]
    fn test_dataset_counts() {
        let ds = Dataset::new(vec![event("A", "CSO", 1.0, 1.0), event("B", "CSO", 0.0, 1.0)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.valid_count(), 1);
        assert!(!ds.is_empty());
    }
}
