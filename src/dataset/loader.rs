use std::io::Read;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{info, warn};

use super::model::{Dataset, OverflowEvent};
use crate::fetch::{HttpClient, fetch_source};

/// Columns that must be present in the header row.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Asset Name",
    "Year",
    "Month",
    "Season",
    "Area",
    "Source Type",
    "Latitude",
    "Longitude",
    "Duration Mins",
    "Volume Discharged",
    "Overflow Event Start Time",
];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Dataset shape problems that make the table unusable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("dataset contains no rows")]
    Empty,
}

/// A row as it appears in the CSV, before derived fields are filled in.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Asset Name")]
    asset_name: String,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Season")]
    season: String,
    #[serde(rename = "Area")]
    area: String,
    #[serde(rename = "Source Type")]
    source_type: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Duration Mins", deserialize_with = "csv::invalid_option")]
    duration_mins: Option<f64>,
    #[serde(rename = "Volume Discharged", deserialize_with = "csv::invalid_option")]
    volume_discharged: Option<f64>,
    #[serde(rename = "Overflow Event Start Time")]
    start_time: String,
    #[serde(rename = "Start Minute", default, deserialize_with = "csv::invalid_option")]
    start_minute: Option<u32>,
    #[serde(rename = "Start Hour", default, deserialize_with = "csv::invalid_option")]
    start_hour: Option<u32>,
    #[serde(rename = "Week day", default)]
    weekday: Option<String>,
}

impl From<RawEvent> for OverflowEvent {
    fn from(raw: RawEvent) -> Self {
        let start_time = parse_timestamp(&raw.start_time);
        let weekday = raw
            .weekday
            .filter(|w| !w.trim().is_empty())
            .or_else(|| start_time.map(weekday_name));

        OverflowEvent {
            asset_name: raw.asset_name,
            year: raw.year,
            month: raw.month,
            season: raw.season,
            area: raw.area,
            source_type: raw.source_type,
            latitude: raw.latitude,
            longitude: raw.longitude,
            duration_mins: raw.duration_mins,
            volume_discharged: raw.volume_discharged,
            start_minute: raw.start_minute.or_else(|| start_time.map(|t| t.minute())),
            start_hour: raw.start_hour.or_else(|| start_time.map(|t| t.hour())),
            weekday,
            start_time,
            start_time_raw: raw.start_time,
        }
    }
}

fn weekday_name(t: NaiveDateTime) -> String {
    WEEKDAY_NAMES[t.weekday().num_days_from_monday() as usize].to_string()
}

/// Parses an event start time. Returns `None` for anything unrecognised so
/// the caller can treat the row as having no usable timestamp.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parses CSV bytes (plain or gzipped) into a [`Dataset`].
///
/// # Errors
///
/// Fails with [`LoadError::MissingColumns`] when the header lacks a required
/// column, [`LoadError::Empty`] when there are no data rows, or a CSV error
/// naming the first malformed row.
pub fn load_dataset(bytes: &[u8]) -> Result<Dataset> {
    let events = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .context("decompressing gzip dataset")?;
        parse_events(decoded.as_slice())?
    } else {
        parse_events(bytes)?
    };

    if events.is_empty() {
        return Err(LoadError::Empty.into());
    }

    Ok(Dataset::new(events))
}

fn parse_events<R: Read>(reader: R) -> Result<Vec<OverflowEvent>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers().context("reading CSV headers")?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing).into());
    }

    let mut events = Vec::new();
    for (row_no, result) in rdr.deserialize::<RawEvent>().enumerate() {
        let raw = result.with_context(|| format!("CSV row {row_no}"))?;
        events.push(OverflowEvent::from(raw));
    }

    let unparsed = events.iter().filter(|e| e.start_time.is_none()).count();
    if unparsed > 0 {
        warn!(unparsed, "Rows with unrecognised start timestamps");
    }

    Ok(events)
}

/// Fetches the source once and builds the dataset. Any failure here is fatal
/// for the caller; there is no degraded mode.
#[tracing::instrument(skip(client))]
pub async fn load_from_source<C: HttpClient>(client: &C, source: &str) -> Result<Dataset> {
    let bytes = fetch_source(client, source).await?;
    let dataset = load_dataset(&bytes).with_context(|| format!("loading dataset from {source}"))?;

    let baselines = dataset.baselines();
    info!(
        rows = dataset.len(),
        valid_rows = dataset.valid_count(),
        baseline_duration = baselines.duration_mins,
        baseline_volume = baselines.volume_discharged,
        "Dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::{StubClient, status_of};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const HEADER: &str = "Asset Name,Year,Month,Season,Area,Source Type,Latitude,Longitude,Duration Mins,Volume Discharged,Overflow Event Start Time";

    fn csv_with(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 4, 5)
            .unwrap()
            .and_hms_opt(13, 7, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2023-04-05 13:07:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-04-05T13:07:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-04-05 13:07"), Some(expected));
        assert_eq!(parse_timestamp("05/04/2023 13:07"), Some(expected));
        assert_eq!(parse_timestamp("2023-04-05T13:07:00Z"), Some(expected));
        assert_eq!(
            parse_timestamp("2023-04-05"),
            NaiveDate::from_ymd_opt(2023, 4, 5).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2023-13-45 99:00:00"), None);
    }

    #[test]
    fn test_load_dataset_parses_rows_and_derives_calendar_fields() {
        let csv = csv_with(&[
            "Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,42,1200.5,2023-04-05 13:07:00",
            "Outfall B,2022,May,Summer,South,EO,55.9,-4.1,10,80,2022-05-01 00:30:00",
        ]);
        let ds = load_dataset(csv.as_bytes()).unwrap();

        assert_eq!(ds.len(), 2);
        let a = &ds.events()[0];
        assert_eq!(a.asset_name, "Outfall A");
        assert_eq!(a.year, 2023);
        assert_eq!(a.duration_mins, Some(42.0));
        assert_eq!(a.volume_discharged, Some(1200.5));
        assert_eq!(a.start_minute, Some(7));
        assert_eq!(a.start_hour, Some(13));
        assert_eq!(a.weekday.as_deref(), Some("Wednesday"));
    }

    #[test]
    fn test_explicit_calendar_columns_win_over_derived() {
        let csv = format!(
            "{HEADER},Start Minute,Start Hour,Week day\n\
             Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,42,1200,2023-04-05 13:07:00,59,23,Sunday"
        );
        let ds = load_dataset(csv.as_bytes()).unwrap();
        let a = &ds.events()[0];

        assert_eq!(a.start_minute, Some(59));
        assert_eq!(a.start_hour, Some(23));
        assert_eq!(a.weekday.as_deref(), Some("Sunday"));
    }

    #[test]
    fn test_blank_measures_load_as_invalid_rows() {
        let csv = csv_with(&[
            "Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,,1200,2023-04-05 13:07:00",
            "Outfall B,2023,April,Spring,North,CSO,56.1,-3.2,12,n/a,2023-04-05 13:07:00",
        ]);
        let ds = load_dataset(csv.as_bytes()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.valid_count(), 0);
        assert_eq!(ds.events()[0].duration_mins, None);
        assert_eq!(ds.events()[1].volume_discharged, None);
    }

    #[test]
    fn test_unparseable_timestamp_keeps_row() {
        let csv = csv_with(&["Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,5,5,sometime"]);
        let ds = load_dataset(csv.as_bytes()).unwrap();
        let a = &ds.events()[0];

        assert_eq!(a.start_time, None);
        assert_eq!(a.start_time_raw, "sometime");
        assert_eq!(a.start_hour, None);
        assert_eq!(a.weekday, None);
    }

    #[test]
    fn test_missing_columns_is_typed_error() {
        let csv = "Asset Name,Year,Month\nA,2023,April";
        let err = load_dataset(csv.as_bytes()).unwrap_err();
        let load_err = err.downcast_ref::<LoadError>().unwrap();

        match load_err {
            LoadError::MissingColumns(cols) => {
                assert!(cols.contains(&"Season".to_string()));
                assert!(cols.contains(&"Overflow Event Start Time".to_string()));
                assert!(!cols.contains(&"Year".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_header_only_is_empty_error() {
        let err = load_dataset(HEADER.as_bytes()).unwrap_err();
        assert_eq!(err.downcast_ref::<LoadError>(), Some(&LoadError::Empty));
    }

    #[test]
    fn test_malformed_row_is_error() {
        let csv = csv_with(&["Outfall A,twenty,April,Spring,North,CSO,56.1,-3.2,5,5,2023-04-05"]);
        assert!(load_dataset(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_gzipped_payload_is_decompressed() {
        let csv = csv_with(&["Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,5,5,2023-04-05"]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(csv.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let ds = load_dataset(&compressed).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.events()[0].asset_name, "Outfall A");
    }

    #[tokio::test]
    async fn test_load_from_source_fails_on_http_error() {
        let client = StubClient {
            status: "404 Not Found",
            body: "",
        };

        let err = load_from_source(&client, "https://example.com/spills.csv")
            .await
            .unwrap_err();
        assert_eq!(status_of(&err), Some(reqwest::StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_load_from_source_over_http() {
        let client = StubClient {
            status: "200 OK",
            body: "Asset Name,Year,Month,Season,Area,Source Type,Latitude,Longitude,\
                   Duration Mins,Volume Discharged,Overflow Event Start Time\n\
                   Outfall A,2023,April,Spring,North,CSO,56.1,-3.2,42,1200,2023-04-05 13:07:00\n",
        };

        let ds = load_from_source(&client, "https://example.com/spills.csv")
            .await
            .unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.valid_count(), 1);
    }
}
