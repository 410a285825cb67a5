pub mod aggregators;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod fetch;
pub mod filter;
pub mod output;
pub mod season;
