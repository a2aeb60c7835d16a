//! # Transition Matrices
//!
//! Flattens an [`Mdp`]'s action graph into one sparse stochastic matrix per
//! action slot, plus reward vectors, for the matrix-based solvers.
//!
//! Every matrix has one extra absorbing state at index `num_states()`.
//! States without actions, and (by default) states lacking a given slot,
//! route there with probability one, so every row is a distribution.
//!
//! ## File format
//!
//! ```text
//! N
//! <probabilities of slot 0>
//! <row indices of slot 0>
//! <column indices of slot 0>
//! ... three lines per further slot
//! ```
//!
//! Values are whitespace separated and written in their shortest
//! round-trip form, so a save/load cycle is bit-identical.

mod sparse;

pub use sparse::SparseMatrix;

use log::{debug, info};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{MdpError, Result};
use crate::mdp::{Mdp, PROBABILITY_TOLERANCE};

/// Where a state goes under a slot it has no action for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingSlot {
    /// Absorb in the terminal state
    #[default]
    Terminal,
    /// Stay put
    SelfLoop,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrices {
    matrices: Vec<SparseMatrix>,
}

impl TransitionMatrices {
    /// Build `slots` matrices, sending missing slots to the terminal state.
    pub fn build<M: Mdp + ?Sized>(mdp: &M, slots: usize) -> Result<Self> {
        Self::build_with(mdp, slots, MissingSlot::Terminal)
    }

    pub fn build_with<M: Mdp + ?Sized>(mdp: &M, slots: usize, missing: MissingSlot) -> Result<Self> {
        let n = mdp.num_states();
        if slots == 0 {
            return Err(MdpError::invalid_parameter("slots", "need at least one action slot"));
        }
        if let Some(state) = (0..n).find(|&s| mdp.actions(s).len() > slots) {
            return Err(MdpError::invalid_parameter(
                "slots".to_string(),
                format!(
                    "state {} has {} actions but only {} slots were requested",
                    state,
                    mdp.actions(state).len(),
                    slots
                ),
            ));
        }

        let terminal = n;
        let mut matrices = Vec::with_capacity(slots);
        for slot in 0..slots {
            let mut matrix = SparseMatrix::new(n + 1);
            for state in 0..n {
                let actions = mdp.actions(state);
                match actions.get(slot) {
                    Some(action) => {
                        for outcome in &action.outcomes {
                            matrix.push(state, outcome.target, outcome.probability);
                        }
                    }
                    None if actions.is_empty() => matrix.push(state, terminal, 1.0),
                    None => match missing {
                        MissingSlot::Terminal => matrix.push(state, terminal, 1.0),
                        MissingSlot::SelfLoop => matrix.push(state, state, 1.0),
                    },
                }
            }
            matrix.push(terminal, terminal, 1.0);
            debug!("slot {}: {} entries", slot, matrix.nnz());
            matrices.push(matrix);
        }

        info!(
            "built {} transition matrices of dimension {}",
            slots,
            n + 1
        );
        Ok(TransitionMatrices { matrices })
    }

    /// Wrap already built matrices; all must share one non-zero dimension.
    pub fn from_matrices(matrices: Vec<SparseMatrix>) -> Result<Self> {
        let Some(first) = matrices.first() else {
            return Err(MdpError::invalid_parameter("matrices", "no action slots"));
        };
        let dim = first.dim();
        if dim == 0 {
            return Err(MdpError::invalid_parameter(
                "matrices",
                "dimension must include the terminal state",
            ));
        }
        if let Some(m) = matrices.iter().find(|m| m.dim() != dim) {
            return Err(MdpError::dimension_mismatch(dim.to_string(), m.dim().to_string()));
        }
        Ok(TransitionMatrices { matrices })
    }

    /// Matrix dimension, terminal state included.
    pub fn dim(&self) -> usize {
        self.matrices[0].dim()
    }

    /// Index of the synthetic terminal state.
    pub fn terminal(&self) -> usize {
        self.dim() - 1
    }

    pub fn slot_count(&self) -> usize {
        self.matrices.len()
    }

    pub fn matrix(&self, slot: usize) -> &SparseMatrix {
        &self.matrices[slot]
    }

    pub fn matrices(&self) -> &[SparseMatrix] {
        &self.matrices
    }

    /// Check that every row of every matrix sums to one.
    pub fn validate(&self) -> Result<()> {
        for (slot, matrix) in self.matrices.iter().enumerate() {
            for (row, sum) in matrix.row_sums().iter().enumerate() {
                if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(MdpError::InvalidDistribution {
                        state: row,
                        action: format!("slot {}", slot),
                        reason: format!("row sums to {}", sum),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", self.dim())?;
        for matrix in &self.matrices {
            write_line(&mut writer, matrix.values())?;
            write_line(&mut writer, matrix.row_indices())?;
            write_line(&mut writer, matrix.col_indices())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a matrix file; the slot count follows from the number of lines.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let header = lines
            .first()
            .ok_or_else(|| MdpError::malformed_matrix(1, "empty file"))?;
        let dim: usize = header
            .trim()
            .parse()
            .map_err(|_| MdpError::malformed_matrix(1, format!("bad dimension '{}'", header.trim())))?;

        let body = &lines[1..];
        if body.is_empty() || body.len() % 3 != 0 {
            return Err(MdpError::malformed_matrix(
                lines.len(),
                format!("expected three lines per slot, found {}", body.len()),
            ));
        }

        let mut matrices = Vec::with_capacity(body.len() / 3);
        for (slot, group) in body.chunks(3).enumerate() {
            let line = 2 + slot * 3;
            let values: Vec<f64> = parse_line(group[0], line)?;
            let rows: Vec<usize> = parse_line(group[1], line + 1)?;
            let cols: Vec<usize> = parse_line(group[2], line + 2)?;
            let matrix = SparseMatrix::from_triplets(dim, values, rows, cols)
                .map_err(|e| MdpError::malformed_matrix(line, e.to_string()))?;
            matrices.push(matrix);
        }
        Self::from_matrices(matrices)
    }
}

/// One reward per state plus `0.0` for the terminal state.
pub fn build_reward_vector<M: Mdp + ?Sized>(mdp: &M) -> Array1<f64> {
    let n = mdp.num_states();
    Array1::from_shape_fn(n + 1, |s| if s < n { mdp.reward(s) } else { 0.0 })
}

/// Repeat a reward vector for every action slot.
pub fn rewards_by_action(rewards: &Array1<f64>, slots: usize) -> Array2<f64> {
    Array2::from_shape_fn((rewards.len(), slots), |(s, _)| rewards[s])
}

/// Reward of every (state, slot) pair from [`Mdp::action_reward`].
///
/// Slots a state lacks get its plain reward; the terminal row is zero.
pub fn build_reward_matrix<M: Mdp + ?Sized>(mdp: &M, slots: usize) -> Array2<f64> {
    let n = mdp.num_states();
    Array2::from_shape_fn((n + 1, slots), |(s, a)| {
        if s == n {
            0.0
        } else if a < mdp.actions(s).len() {
            mdp.action_reward(s, a)
        } else {
            mdp.reward(s)
        }
    })
}

fn write_line<W: Write, T: std::fmt::Display>(writer: &mut W, items: &[T]) -> Result<()> {
    let line = items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", line)?;
    Ok(())
}

fn parse_line<T: FromStr>(line: &str, line_no: usize) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|_| MdpError::malformed_matrix(line_no, format!("cannot parse '{}'", token)))
        })
        .collect()
}
