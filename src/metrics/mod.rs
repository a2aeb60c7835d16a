pub mod statistics;
pub mod tracker;

pub use statistics::{max_abs_difference, Statistics};
pub use tracker::{EpisodeMetrics, MetricsTracker};
