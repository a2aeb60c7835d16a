//! Value Iteration over the action graph of an [`Mdp`].
//!
//! Each sweep reads the previous value array and writes the current one,
//! then the two are swapped, so every backup within a sweep sees the same
//! values (Jacobi style).

use log::{debug, info, warn};
use ndarray::Array1;
use std::time::{Duration, Instant};

use super::greedy_policy;
use crate::config::ValueIterationConfig;
use crate::error::{MdpError, Result};
use crate::mdp::Mdp;
use crate::metrics::Statistics;

/// Progress of one sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    /// Seconds since the solver started
    pub elapsed: f64,
    /// Largest value change over non-terminal states
    pub delta: f64,
}

#[derive(Clone, Debug)]
pub struct ValueIterationOutcome {
    pub values: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub elapsed: Duration,
}

pub struct ValueIteration<'a, M: Mdp + ?Sized> {
    mdp: &'a M,
    config: ValueIterationConfig,
}

impl<'a, M: Mdp + ?Sized> ValueIteration<'a, M> {
    pub fn new(mdp: &'a M, config: ValueIterationConfig) -> Result<Self> {
        config.validate()?;
        if mdp.num_states() == 0 {
            return Err(MdpError::invalid_parameter("mdp", "has no states"));
        }
        Ok(ValueIteration { mdp, config })
    }

    pub fn config(&self) -> &ValueIterationConfig {
        &self.config
    }

    /// Starting values: large rewards (goal, trap, pit) seed their state,
    /// everything else starts at zero.
    pub fn initial_values(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.mdp.num_states(), |s| {
            let r = self.mdp.reward(s);
            if r.abs() > 1.0 {
                r
            } else {
                0.0
            }
        })
    }

    pub fn run(&self) -> Result<ValueIterationOutcome> {
        self.run_with(|_, _| Ok(()))
    }

    /// Run until convergence or `max_iterations`, calling `observer` after
    /// every sweep with its report and the new values.
    pub fn run_with<F>(&self, mut observer: F) -> Result<ValueIterationOutcome>
    where
        F: FnMut(&IterationReport, &Array1<f64>) -> Result<()>,
    {
        let start = Instant::now();
        let gamma = self.config.gamma;
        let active = self.mdp.non_terminal_states();

        let mut previous = self.initial_values();
        let mut current = previous.clone();

        for iteration in 1..=self.config.max_iterations {
            let mut delta: f64 = 0.0;
            {
                let prev = previous.as_slice().ok_or_else(|| {
                    MdpError::dimension_mismatch("contiguous values", "strided values")
                })?;
                for &s in &active {
                    let best = self
                        .mdp
                        .actions(s)
                        .iter()
                        .enumerate()
                        .map(|(a, action)| {
                            self.mdp.action_reward(s, a) + gamma * action.expected_value(prev)
                        })
                        .fold(f64::NEG_INFINITY, f64::max);
                    delta = delta.max((best - prev[s]).abs());
                    current[s] = best;
                }
            }
            std::mem::swap(&mut previous, &mut current);

            let report = IterationReport {
                iteration,
                elapsed: start.elapsed().as_secs_f64(),
                delta,
            };
            if iteration % 5 == 0 {
                info!("value iteration {}: max delta {:.6}", iteration, delta);
            } else {
                debug!("value iteration {}: max delta {:.6}", iteration, delta);
            }
            observer(&report, &previous)?;

            if delta < self.config.epsilon {
                let summary = Statistics::from_array(previous.view());
                info!(
                    "value iteration converged after {} iterations ({:.3}s), values in [{:.3}, {:.3}], mean {:.3}",
                    iteration, report.elapsed, summary.min, summary.max, summary.mean
                );
                return Ok(ValueIterationOutcome {
                    values: previous,
                    iterations: iteration,
                    converged: true,
                    elapsed: start.elapsed(),
                });
            }
        }

        warn!(
            "value iteration stopped after {} iterations without converging",
            self.config.max_iterations
        );
        Ok(ValueIterationOutcome {
            values: previous,
            iterations: self.config.max_iterations,
            converged: false,
            elapsed: start.elapsed(),
        })
    }

    /// Greedy policy for a value function produced by this solver.
    pub fn policy(&self, values: &Array1<f64>) -> Vec<usize> {
        greedy_policy(self.mdp, &values.to_vec(), self.config.gamma)
    }
}
