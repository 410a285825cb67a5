//! Filter engine: narrows the dataset to the rows matching a selection.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{ALL, Dataset, FilterOptions, OverflowEvent};

// ---------------------------------------------------------------------------
// Choice – a single control value or the "All" sentinel
// ---------------------------------------------------------------------------

/// One categorical control. `All` places no constraint on the column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Choice<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(v) => v == value,
        }
    }
}

impl<T> Choice<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }

    pub fn as_only(&self) -> Option<&T> {
        match self {
            Choice::All => None,
            Choice::Only(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Choice<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Choice::All, Choice::Only)
    }
}

impl<T: FromStr> FromStr for Choice<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == ALL {
            Ok(Choice::All)
        } else {
            s.parse().map(Choice::Only)
        }
    }
}

impl<T: Display> Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => write!(f, "{ALL}"),
            Choice::Only(v) => write!(f, "{v}"),
        }
    }
}

impl<T: Serialize> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Choice::All => serializer.serialize_str(ALL),
            Choice::Only(v) => v.serialize(serializer),
        }
    }
}

/// Accepts `null`, `"All"`, the bare value, or the value written as a string
/// (so `2023` and `"2023"` both select a year).
impl<'de, T> Deserialize<'de> for Choice<T>
where
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Text(String),
            Value(T),
        }

        match Option::<Repr<T>>::deserialize(deserializer)? {
            None => Ok(Choice::All),
            Some(Repr::Text(s)) => s.parse().map_err(de::Error::custom),
            Some(Repr::Value(v)) => Ok(Choice::Only(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// DateWindow – the date picker
// ---------------------------------------------------------------------------

fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default()
}

/// A cleared start picker arrives as `null`; treat it like an absent key.
fn start_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    Ok(Option::<NaiveDate>::deserialize(deserializer)?.unwrap_or_else(default_window_start))
}

/// Inclusive date range. Only active once an end date is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default = "default_window_start", deserialize_with = "start_or_default")]
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl Default for DateWindow {
    fn default() -> Self {
        DateWindow {
            start: default_window_start(),
            end: None,
        }
    }
}

impl DateWindow {
    /// Timestamp bounds, both at midnight. An event later on the end date
    /// falls outside the window.
    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.end
            .map(|end| (self.start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN)))
    }

    pub fn contains(&self, ts: Option<NaiveDateTime>) -> bool {
        match (self.bounds(), ts) {
            (Some((from, to)), Some(t)) => from <= t && t <= to,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSelection
// ---------------------------------------------------------------------------

/// How a selection constrains rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// No end date: year, season, area and month all apply.
    Categorical,
    /// End date set: the date window and area apply; year, season and month
    /// are ignored.
    DateWindow,
}

/// The full set of filter controls for one render.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSelection {
    pub year: Choice<i32>,
    pub season: Choice<String>,
    pub area: Choice<String>,
    pub month: Choice<String>,
    pub dates: DateWindow,
}

impl FilterSelection {
    pub fn mode(&self) -> FilterMode {
        if self.dates.end.is_some() {
            FilterMode::DateWindow
        } else {
            FilterMode::Categorical
        }
    }

    /// The selection a fresh session starts with: first year, season and
    /// area, the second month option, and an open-ended date window.
    pub fn initial(options: &FilterOptions) -> Self {
        fn pick(values: &[String], idx: usize) -> Choice<String> {
            values
                .get(idx)
                .or_else(|| values.first())
                .map_or(Choice::All, |v| v.parse().unwrap_or(Choice::All))
        }

        FilterSelection {
            year: options
                .years
                .first()
                .and_then(|y| y.parse().ok())
                .unwrap_or_default(),
            season: pick(&options.seasons, 0),
            area: pick(&options.areas, 0),
            month: pick(&options.months, 1),
            dates: DateWindow::default(),
        }
    }

    fn matches_categories(&self, event: &OverflowEvent) -> bool {
        self.year.matches(&event.year)
            && self.season.matches(&event.season)
            && self.area.matches(&event.area)
            && self.month.matches(&event.month)
    }

    /// Whether `event` passes this selection, including the validity check.
    pub fn accepts(&self, event: &OverflowEvent) -> bool {
        let selected = match self.mode() {
            FilterMode::Categorical => self.matches_categories(event),
            FilterMode::DateWindow => {
                self.dates.contains(event.start_time) && self.area.matches(&event.area)
            }
        };
        selected && event.is_valid()
    }
}

/// Rows of `events` accepted by `selection`, in their original order.
pub fn filter_events<'a>(
    events: &'a [OverflowEvent],
    selection: &FilterSelection,
) -> Vec<&'a OverflowEvent> {
    events.iter().filter(|e| selection.accepts(e)).collect()
}

/// Filters the whole dataset. Pure: the same selection always yields the
/// same rows.
pub fn apply_filter<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
) -> Vec<&'a OverflowEvent> {
    let rows = filter_events(dataset.events(), selection);
    debug!(
        mode = ?selection.mode(),
        matched = rows.len(),
        total = dataset.len(),
        "Filter applied"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::model::tests::event;
    use crate::dataset::parse_timestamp;

    fn at(asset: &str, ts: &str) -> OverflowEvent {
        let mut e = event(asset, "CSO", 10.0, 10.0);
        e.start_time_raw = ts.to_string();
        e.start_time = parse_timestamp(ts);
        e
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<OverflowEvent> {
        let mut b = event("B", "EO", 5.0, 50.0);
        b.year = 2022;
        b.area = "South".to_string();
        b.season = "Summer".to_string();
        b.month = "June".to_string();

        vec![
            event("A", "CSO", 10.0, 100.0),
            b,
            event("C", "CSO", 0.0, 100.0),
            event("D", "CSO", 10.0, 0.0),
        ]
    }

    #[test]
    fn test_empty_selection_returns_all_valid_rows() {
        let events = sample();
        let rows = filter_events(&events, &FilterSelection::default());
        let names: Vec<_> = rows.iter().map(|e| e.asset_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_categorical_constraints_combine() {
        let events = sample();
        let sel = FilterSelection {
            year: Choice::Only(2022),
            area: Choice::Only("South".to_string()),
            ..Default::default()
        };
        let rows = filter_events(&events, &sel);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_name, "B");

        let none = FilterSelection {
            year: Choice::Only(2022),
            month: Choice::Only("January".to_string()),
            ..Default::default()
        };
        assert!(filter_events(&events, &none).is_empty());
    }

    #[test]
    fn test_date_window_ignores_year_season_month() {
        let events = vec![at("A", "2023-01-10 08:15:00"), at("B", "2023-03-01 00:00:00")];
        let sel = FilterSelection {
            year: Choice::Only(1999),
            season: Choice::Only("Summer".to_string()),
            month: Choice::Only("July".to_string()),
            dates: DateWindow {
                start: date(2023, 1, 1),
                end: Some(date(2023, 12, 31)),
            },
            ..Default::default()
        };

        assert_eq!(sel.mode(), FilterMode::DateWindow);
        assert_eq!(filter_events(&events, &sel).len(), 2);
    }

    #[test]
    fn test_date_window_still_applies_area() {
        let mut south = at("B", "2023-02-01 12:00:00");
        south.area = "South".to_string();
        let events = vec![at("A", "2023-02-01 12:00:00"), south];
        let sel = FilterSelection {
            area: Choice::Only("South".to_string()),
            dates: DateWindow {
                start: date(2023, 1, 1),
                end: Some(date(2023, 3, 1)),
            },
            ..Default::default()
        };

        let rows = filter_events(&events, &sel);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_name, "B");
    }

    #[test]
    fn test_date_window_bounds_are_inclusive_midnights() {
        let events = vec![
            at("start", "2023-01-01 00:00:00"),
            at("end", "2023-01-31 00:00:00"),
            at("after_end_midnight", "2023-01-31 09:00:00"),
            at("before", "2022-12-31 23:59:59"),
            at("garbage", "not a time"),
        ];
        let sel = FilterSelection {
            dates: DateWindow {
                start: date(2023, 1, 1),
                end: Some(date(2023, 1, 31)),
            },
            ..Default::default()
        };

        let names: Vec<_> = filter_events(&events, &sel)
            .iter()
            .map(|e| e.asset_name.as_str())
            .collect();
        assert_eq!(names, vec!["start", "end"]);
    }

    #[test]
    fn test_date_window_still_requires_validity() {
        let mut zero = at("Z", "2023-01-05 00:00:00");
        zero.duration_mins = Some(0.0);
        let sel = FilterSelection {
            dates: DateWindow {
                start: date(2023, 1, 1),
                end: Some(date(2023, 2, 1)),
            },
            ..Default::default()
        };
        assert!(filter_events(&[zero], &sel).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let events = sample();
        let sel = FilterSelection {
            season: Choice::Only("Winter".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_events(&events, &sel), filter_events(&events, &sel));
    }

    #[test]
    fn test_choice_from_str() {
        assert_eq!("All".parse::<Choice<i32>>().unwrap(), Choice::All);
        assert_eq!("".parse::<Choice<i32>>().unwrap(), Choice::All);
        assert_eq!("2021".parse::<Choice<i32>>().unwrap(), Choice::Only(2021));
        assert!("twenty".parse::<Choice<i32>>().is_err());
    }

    #[test]
    fn test_selection_deserializes_with_defaults() {
        let sel: FilterSelection = serde_json::from_str(
            r#"{"year": "2021", "season": null, "area": "All", "month": "May",
                "dates": {"end": "2023-06-30"}}"#,
        )
        .unwrap();

        assert_eq!(sel.year, Choice::Only(2021));
        assert_eq!(sel.season, Choice::All);
        assert_eq!(sel.area, Choice::All);
        assert_eq!(sel.month, Choice::Only("May".to_string()));
        assert_eq!(sel.dates.start, date(2019, 1, 1));
        assert_eq!(sel.dates.end, Some(date(2023, 6, 30)));

        let numeric: FilterSelection = serde_json::from_str(r#"{"year": 2020}"#).unwrap();
        assert_eq!(numeric.year, Choice::Only(2020));
        assert_eq!(numeric.mode(), FilterMode::Categorical);
    }

    #[test]
    fn test_choice_serializes_all_as_sentinel() {
        let json = serde_json::to_string(&FilterSelection::default()).unwrap();
        assert!(json.contains(r#""year":"All""#));
        assert!(json.contains(r#""start":"2019-01-01""#));
    }

    #[test]
    fn test_initial_selection_mirrors_first_options() {
        let options = FilterOptions {
            years: vec!["2019".into(), "2020".into(), "All".into()],
            seasons: vec!["Autumn".into(), "Spring".into(), "All".into()],
            areas: vec!["East".into(), "All".into()],
            months: vec!["April".into(), "August".into(), "All".into()],
            ..Default::default()
        };
        let sel = FilterSelection::initial(&options);

        assert_eq!(sel.year, Choice::Only(2019));
        assert_eq!(sel.season, Choice::Only("Autumn".to_string()));
        assert_eq!(sel.area, Choice::Only("East".to_string()));
        assert_eq!(sel.month, Choice::Only("August".to_string()));
        assert_eq!(sel.dates, DateWindow::default());
    }

    #[test]
    fn test_null_dates_fall_back_to_defaults() {
        let sel: FilterSelection = serde_json::from_str(
            r#"{"area": "All", "dates": {"start": null, "end": "2023-12-31"}}"#,
        )
        .unwrap();
        assert_eq!(sel.dates.start, date(2019, 1, 1));
        assert_eq!(sel.dates.end, Some(date(2023, 12, 31)));
        assert_eq!(sel.mode(), FilterMode::DateWindow);

        let cleared: FilterSelection =
            serde_json::from_str(r#"{"dates": {"start": null, "end": null}}"#).unwrap();
        assert_eq!(cleared.dates, DateWindow::default());
        assert_eq!(cleared.mode(), FilterMode::Categorical);
    }
}
