//! The in-memory overflow event table.
//!
//! ```text
//!  CSV (URL or path, optionally gzipped)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse rows → Vec<OverflowEvent>
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset  │  events + filter options + baselines, read-only after load
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;

pub use loader::{LoadError, load_dataset, load_from_source, parse_timestamp};
pub use model::{ALL, Baselines, Dataset, FilterOptions, OverflowEvent};
