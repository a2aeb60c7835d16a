//! # Iteration Statistics
//!
//! Solvers produce one snapshot per iteration (or per reported episode). The
//! [`IterationRecorder`] persists them on a background thread so the solver
//! never waits on disk, and [`IterationLog`] reads them back.
//!
//! ## File format
//!
//! Space-delimited text. Each snapshot is a header row
//! `number elapsed summary` followed by `dims` rows of values:
//!
//! ```text
//! 1 0.0021 8.1
//! -0.01 10 0
//! 2 0.0040 0.72
//! 7.99 10 0
//! ```
//!
//! Values may be `NaN` (padding in Q-table snapshots).

mod log_file;
mod recorder;

pub use log_file::IterationLog;
pub use recorder::IterationRecorder;

use serde::{Deserialize, Serialize};

use crate::metrics::Statistics;

/// State of a solver after one iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    /// Iteration or episode number
    pub number: usize,
    /// Seconds since the solver started
    pub elapsed: f64,
    /// Scalar summary (max delta, changed states, mean max-Q, ...)
    pub summary: f64,
    /// `dims` rows of per-state values
    pub values: Vec<Vec<f64>>,
}

impl IterationSnapshot {
    pub fn new(number: usize, elapsed: f64, summary: f64, values: Vec<Vec<f64>>) -> Self {
        IterationSnapshot {
            number,
            elapsed,
            summary,
            values,
        }
    }

    /// Snapshot holding a single row of values.
    pub fn single(number: usize, elapsed: f64, summary: f64, values: Vec<f64>) -> Self {
        Self::new(number, elapsed, summary, vec![values])
    }

    /// Summary of one value row; NaN padding is skipped.
    pub fn row_statistics(&self, row: usize) -> Option<Statistics> {
        self.values.get(row).map(|values| Statistics::from_slice(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_statistics_skip_padding() {
        let snapshot = IterationSnapshot::new(
            4,
            0.5,
            1.0,
            vec![vec![1.0, f64::NAN, 3.0], vec![f64::NAN, f64::NAN, f64::NAN]],
        );
        let first = snapshot.row_statistics(0).unwrap();
        assert_eq!((first.count, first.min, first.max, first.mean), (2, 1.0, 3.0, 2.0));
        assert_eq!(snapshot.row_statistics(1).unwrap().count, 0);
        assert!(snapshot.row_statistics(2).is_none());
    }
}
