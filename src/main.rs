//! CLI entry point for the sewage overflow dashboard.
//!
//! Loads the dataset once, then renders dashboards for one request
//! (`render`), lists filter options (`options`), or handles a stream of
//! filter-change events from stdin (`listen`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use spill_dash::aggregators::{Measure, RankDirection, RankingRequest, TimeDimension};
use spill_dash::config::DashConfig;
use spill_dash::dashboard::{DashboardRequest, render};
use spill_dash::dataset::{Dataset, load_from_source};
use spill_dash::fetch::BasicClient;
use spill_dash::filter::{Choice, FilterSelection};
use spill_dash::output::{print_pretty, to_json, write_json};
use spill_dash::season::{month_options, reconcile_month};
use std::ffi::OsStr;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "spill_dash")]
#[command(about = "Filter and summarise sewage overflow events", long_about = None)]
struct Cli {
    /// Dataset URL or local path (overrides SPILL_DASH_SOURCE)
    #[arg(long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every chart for one set of controls and print it as JSON
    Render {
        #[command(flatten)]
        controls: Controls,

        /// Write the JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the selectable filter values
    Options {
        /// Also list the months offered for this season
        #[arg(long)]
        season: Option<String>,
    },
    /// Read JSON requests from stdin, one per line, and answer each with a
    /// JSON dashboard line on stdout
    Listen,
}

#[derive(Args, Debug)]
struct Controls {
    /// Start from the dashboard's initial widget values rather than "All"
    #[arg(long)]
    initial: bool,

    #[arg(long)]
    year: Option<String>,

    #[arg(long)]
    season: Option<String>,

    #[arg(long)]
    area: Option<String>,

    #[arg(long)]
    month: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date: Option<NaiveDate>,

    /// Setting an end date switches to date-window filtering
    #[arg(long, value_name = "YYYY-MM-DD")]
    end_date: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t)]
    time_dimension: TimeDimension,

    /// Metric used to rank assets
    #[arg(long, value_enum, default_value_t)]
    metric: Measure,

    #[arg(long, value_enum, default_value_t)]
    direction: RankDirection,

    /// Number of assets to rank
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    assets: i64,

    #[arg(long, value_enum, default_value_t)]
    box_measure: Measure,
}

impl Controls {
    fn into_request(self, dataset: &Dataset) -> Result<DashboardRequest> {
        let options = dataset.options();
        let mut selection = if self.initial {
            FilterSelection::initial(options)
        } else {
            FilterSelection::default()
        };

        if let Some(year) = &self.year {
            selection.year = year
                .parse()
                .with_context(|| format!("--year must be a year or \"All\", got '{year}'"))?;
        }
        if let Some(area) = &self.area {
            selection.area = area.parse().unwrap_or(Choice::All);
        }
        if let Some(month) = &self.month {
            selection.month = month.parse().unwrap_or(Choice::All);
        }
        if let Some(season) = &self.season {
            selection.season = season.parse().unwrap_or(Choice::All);
            let month = reconcile_month(&selection.season, &selection.month, &options.months);
            if month != selection.month {
                info!(from = %selection.month, to = %month, "Month reset for season");
                selection.month = month;
            }
        }
        if let Some(start) = self.start_date {
            selection.dates.start = start;
        }
        selection.dates.end = self.end_date;

        Ok(DashboardRequest {
            selection,
            time_dimension: self.time_dimension,
            ranking: RankingRequest {
                metric: self.metric,
                direction: self.direction,
                count: Some(self.assets),
            },
            box_measure: self.box_measure,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let config = DashConfig::from_env()?.with_source(cli.source);

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&config.log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&config.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("spill_dash.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let client = BasicClient::with_timeout(config.timeout)?;
    let dataset = load_from_source(&client, &config.source).await?;

    match cli.command {
        Commands::Render { controls, output } => {
            let request = controls.into_request(&dataset)?;
            let dashboard = render(&dataset, &request);
            print_pretty(&dashboard);

            match output {
                Some(path) => write_json(&path, &dashboard)?,
                None => println!("{}", to_json(&dashboard, true)?),
            }
        }
        Commands::Options { season } => {
            let options = dataset.options();
            let months = season.map(|s| {
                let choice: Choice<String> = s.parse().unwrap_or(Choice::All);
                month_options(&choice, &options.months)
            });
            let body = serde_json::json!({
                "options": options,
                "initial_selection": FilterSelection::initial(options),
                "month_options": months,
            });
            println!("{}", to_json(&body, true)?);
        }
        Commands::Listen => listen(&dataset).await?,
    }

    Ok(())
}

/// Handles filter-change events one at a time, each to completion before the
/// next is read. Every non-blank line gets exactly one reply line: the
/// dashboard, or `{"error": ...}` when the request cannot be parsed. A season
/// change reconciles the month against the new season's options before
/// rendering.
#[tracing::instrument(skip_all)]
async fn listen(dataset: &Dataset) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut previous_season: Option<Choice<String>> = None;
    let mut handled = 0usize;

    info!("Waiting for requests on stdin");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let mut request: DashboardRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed request");
                let reply = serde_json::json!({ "error": e.to_string() });
                println!("{}", to_json(&reply, false)?);
                continue;
            }
        };

        let selection = &mut request.selection;
        if previous_season.as_ref() != Some(&selection.season) {
            selection.month =
                reconcile_month(&selection.season, &selection.month, &dataset.options().months);
            previous_season = Some(selection.season.clone());
        }

        let dashboard = render(dataset, &request);
        println!("{}", to_json(&dashboard, false)?);
        handled += 1;
    }

    info!(handled, "Input closed");
    Ok(())
}
