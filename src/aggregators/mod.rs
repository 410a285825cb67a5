//! Chart projections computed from the filtered rows.
//!
//! Every aggregator takes the filtered rows and returns either its chart or
//! a placeholder when there are no rows; none of them can fail.

pub mod distribution;
pub mod geo;
pub mod pie;
pub mod ranking;
pub mod sidebar;
pub mod temporal;
pub mod types;
pub mod utility;

pub use distribution::{AxisScale, DistributionChart, distribution};
pub use geo::{MapChart, overflow_map};
pub use pie::{PieChart, duration_by_source};
pub use ranking::{RankDirection, RankingChart, RankingRequest, asset_ranking};
pub use sidebar::{ColorTag, SidebarMetrics, sidebar_metrics};
pub use temporal::{TemporalChart, TimeDimension, volume_over_time};
pub use types::{ChartOutput, Measure, Placeholder};
