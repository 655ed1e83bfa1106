//! Pipeline and client statistics

pub mod metrics;

pub use metrics::{StatsSnapshot, StreamStats, MIN_REPORT_INTERVAL};
