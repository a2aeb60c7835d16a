use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MdpError, Result};
use crate::mdp::{Mdp, StateId};
use crate::solvers::first_argmax;

/// Tabular action values: one row per state, one entry per legal action.
/// Terminal states have empty rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    values: Vec<Vec<f64>>,
}

impl QTable {
    pub fn zeros<M: Mdp + ?Sized>(mdp: &M) -> Self {
        QTable {
            values: (0..mdp.num_states())
                .map(|s| vec![0.0; mdp.actions(s).len()])
                .collect(),
        }
    }

    /// Build from per-state rows, checking each against the state's action
    /// count.
    pub fn from_rows<M: Mdp + ?Sized>(mdp: &M, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != mdp.num_states() {
            return Err(MdpError::dimension_mismatch(
                format!("{} states", mdp.num_states()),
                format!("{} rows", values.len()),
            ));
        }
        for (s, row) in values.iter().enumerate() {
            if row.len() != mdp.actions(s).len() {
                return Err(MdpError::dimension_mismatch(
                    format!("{} action values for state {}", mdp.actions(s).len(), s),
                    format!("{}", row.len()),
                ));
            }
        }
        Ok(QTable { values })
    }

    pub fn num_states(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, state: StateId) -> &[f64] {
        &self.values[state]
    }

    pub fn set(&mut self, state: StateId, action: usize, value: f64) {
        self.values[state][action] = value;
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Best value of `state`, `None` when it has no actions.
    pub fn max(&self, state: StateId) -> Option<f64> {
        self.values[state].iter().copied().reduce(f64::max)
    }

    /// First best action, `0` when the state has no actions.
    pub fn best_action(&self, state: StateId) -> usize {
        first_argmax(&self.values[state]).unwrap_or(0)
    }

    pub fn policy(&self) -> Vec<usize> {
        (0..self.values.len()).map(|s| self.best_action(s)).collect()
    }

    /// Mean of the best value over states that have actions.
    pub fn mean_max(&self) -> f64 {
        let maxima: Vec<f64> = (0..self.values.len()).filter_map(|s| self.max(s)).collect();
        if maxima.is_empty() {
            0.0
        } else {
            maxima.iter().sum::<f64>() / maxima.len() as f64
        }
    }

    /// Values laid out as `slots` rows (one per action slot) of one column
    /// per state, padded with NaN where a state lacks the slot.
    pub fn padded_snapshot(&self, slots: usize) -> Vec<Vec<f64>> {
        (0..slots)
            .map(|a| {
                self.values
                    .iter()
                    .map(|row| row.get(a).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let table: Self = bincode::deserialize(&data)?;
        Ok(table)
    }
}
