//! Month options offered for each season.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::ALL;
use crate::filter::Choice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const fn months(self) -> [&'static str; 3] {
        match self {
            Season::Winter => ["November", "December", "January"],
            Season::Spring => ["February", "March", "April"],
            Season::Summer => ["May", "June", "July"],
            Season::Autumn => ["August", "September", "October"],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown season '{0}'")]
pub struct UnknownSeason(pub String);

impl FromStr for Season {
    type Err = UnknownSeason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Winter" => Ok(Season::Winter),
            "Spring" => Ok(Season::Spring),
            "Summer" => Ok(Season::Summer),
            "Autumn" => Ok(Season::Autumn),
            other => Err(UnknownSeason(other.to_string())),
        }
    }
}

/// Months selectable under `season`. `All` (and any season name outside the
/// fixed table) offers the dataset's full month list, `All` included.
pub fn month_options(season: &Choice<String>, all_months: &[String]) -> Vec<String> {
    match season {
        Choice::All => all_months.to_vec(),
        Choice::Only(name) => match name.parse::<Season>() {
            Ok(s) => s.months().iter().map(|m| m.to_string()).collect(),
            Err(e) => {
                warn!(error = %e, "Falling back to full month list");
                all_months.to_vec()
            }
        },
    }
}

/// Keeps `month` if it is still offered under `season`, otherwise resets it
/// to the first offered option.
pub fn reconcile_month(
    season: &Choice<String>,
    month: &Choice<String>,
    all_months: &[String],
) -> Choice<String> {
    let options = month_options(season, all_months);
    let label = month.to_string();
    if options.iter().any(|o| *o == label) {
        return month.clone();
    }
    match options.first() {
        Some(first) if first != ALL => Choice::Only(first.clone()),
        _ => Choice::All,
    }
}
