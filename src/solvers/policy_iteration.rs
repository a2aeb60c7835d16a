//! Policy Iteration over transition matrices.
//!
//! Works on the flattened model: one sparse matrix per action slot and an
//! `(N, slots)` reward matrix, where `N` includes the absorbing terminal
//! state. Evaluation is iterative rather than a linear solve.

use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use std::path::Path;
use std::time::{Duration, Instant};

use super::first_argmax;
use crate::config::PolicyIterationConfig;
use crate::error::{MdpError, Result};
use crate::mdp::StateId;
use crate::metrics::max_abs_difference;
use crate::stats::IterationLog;
use crate::transitions::{SparseMatrix, TransitionMatrices};

/// Progress of one evaluation/improvement round.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyIterationReport {
    pub iteration: usize,
    pub elapsed: f64,
    /// States whose action changed in this round
    pub changed: usize,
    /// Sweeps the evaluation step needed
    pub evaluation_sweeps: usize,
}

#[derive(Clone, Debug)]
pub struct PolicyIterationOutcome {
    pub policy: Vec<usize>,
    pub values: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub elapsed: Duration,
}

pub struct PolicyIteration<'a> {
    matrices: &'a TransitionMatrices,
    rewards: &'a Array2<f64>,
    config: PolicyIterationConfig,
}

impl<'a> PolicyIteration<'a> {
    pub fn new(
        matrices: &'a TransitionMatrices,
        rewards: &'a Array2<f64>,
        config: PolicyIterationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let expected = (matrices.dim(), matrices.slot_count());
        if rewards.dim() != expected {
            return Err(MdpError::dimension_mismatch(
                format!("{:?} reward matrix", expected),
                format!("{:?}", rewards.dim()),
            ));
        }
        Ok(PolicyIteration {
            matrices,
            rewards,
            config,
        })
    }

    pub fn run(&self) -> Result<PolicyIterationOutcome> {
        self.run_with(|_, _, _| Ok(()))
    }

    /// Run until the policy is stable or `max_iterations`, calling
    /// `observer` after every round with its report, policy and values.
    pub fn run_with<F>(&self, mut observer: F) -> Result<PolicyIterationOutcome>
    where
        F: FnMut(&PolicyIterationReport, &[usize], &Array1<f64>) -> Result<()>,
    {
        let start = Instant::now();
        let gamma = self.config.gamma;
        let mut values = Array1::zeros(self.matrices.dim());
        let mut policy = greedy_policy(self.matrices, self.rewards, &values, gamma)?;

        for iteration in 1..=self.config.max_iterations {
            let sweeps = self.evaluate(&policy, &mut values)?;
            let q = q_values(self.matrices, self.rewards, &values, gamma)?;
            let mut changed = 0;
            for (s, row) in q.outer_iter().enumerate() {
                let row = row.to_vec();
                let best = first_argmax(&row).unwrap_or(0);
                // Keep the current action on ties so the policy cannot cycle.
                if row[best] > row[policy[s]] {
                    policy[s] = best;
                    changed += 1;
                }
            }

            let report = PolicyIterationReport {
                iteration,
                elapsed: start.elapsed().as_secs_f64(),
                changed,
                evaluation_sweeps: sweeps,
            };
            if iteration % 5 == 0 {
                info!("policy iteration {}: {} states changed", iteration, changed);
            } else {
                debug!("policy iteration {}: {} states changed", iteration, changed);
            }
            observer(&report, &policy, &values)?;

            if changed == 0 {
                info!(
                    "policy iteration converged after {} iterations ({:.3}s)",
                    iteration, report.elapsed
                );
                return Ok(PolicyIterationOutcome {
                    policy,
                    values,
                    iterations: iteration,
                    converged: true,
                    elapsed: start.elapsed(),
                });
            }
        }

        warn!(
            "policy iteration stopped after {} iterations without a stable policy",
            self.config.max_iterations
        );
        Ok(PolicyIterationOutcome {
            policy,
            values,
            iterations: self.config.max_iterations,
            converged: false,
            elapsed: start.elapsed(),
        })
    }

    /// Iterate `V <- R_pi + gamma P_pi V` in place; returns the sweep count.
    fn evaluate(&self, policy: &[usize], values: &mut Array1<f64>) -> Result<usize> {
        let p_pi = policy_matrix(self.matrices, policy)?;
        let r_pi = Array1::from_shape_fn(policy.len(), |s| self.rewards[[s, policy[s]]]);
        for sweep in 1..=self.config.eval_max_iterations {
            let next = &r_pi + &(p_pi.mul_vec(values.view())? * self.config.gamma);
            let delta = max_abs_difference(next.view(), values.view());
            *values = next;
            if delta < self.config.eval_epsilon {
                return Ok(sweep);
            }
        }
        debug!(
            "policy evaluation hit {} sweeps before reaching {}",
            self.config.eval_max_iterations, self.config.eval_epsilon
        );
        Ok(self.config.eval_max_iterations)
    }
}

/// Rows of each slot's matrix picked by `policy`.
pub fn policy_matrix(matrices: &TransitionMatrices, policy: &[usize]) -> Result<SparseMatrix> {
    if policy.len() != matrices.dim() {
        return Err(MdpError::dimension_mismatch(
            matrices.dim().to_string(),
            policy.len().to_string(),
        ));
    }
    if let Some(&a) = policy.iter().find(|&&a| a >= matrices.slot_count()) {
        return Err(MdpError::invalid_parameter(
            "policy".to_string(),
            format!("action {} outside {} slots", a, matrices.slot_count()),
        ));
    }
    let mut selected = SparseMatrix::new(matrices.dim());
    for (slot, matrix) in matrices.matrices().iter().enumerate() {
        for (r, c, v) in matrix.entries() {
            if policy[r] == slot {
                selected.push(r, c, v);
            }
        }
    }
    Ok(selected)
}

/// `Q[s, a] = R[s, a] + gamma (P_a V)[s]`
pub fn q_values(
    matrices: &TransitionMatrices,
    rewards: &Array2<f64>,
    values: &Array1<f64>,
    gamma: f64,
) -> Result<Array2<f64>> {
    let mut q = rewards.clone();
    for (slot, matrix) in matrices.matrices().iter().enumerate() {
        let future = matrix.mul_vec(values.view())?;
        let mut column = q.column_mut(slot);
        column.scaled_add(gamma, &future);
    }
    Ok(q)
}

/// First best slot per state under `values`.
pub fn greedy_policy(
    matrices: &TransitionMatrices,
    rewards: &Array2<f64>,
    values: &Array1<f64>,
    gamma: f64,
) -> Result<Vec<usize>> {
    let q = q_values(matrices, rewards, values, gamma)?;
    Ok(q.outer_iter()
        .map(|row| first_argmax(&row.to_vec()).unwrap_or(0))
        .collect())
}

/// Policy maximizing the expected next value `(P_a V)[s]`, for recovering a
/// policy from recorded value snapshots. Values without an entry for the
/// terminal state are padded with `0.0`.
pub fn policy_from_values(matrices: &TransitionMatrices, values: &[f64]) -> Result<Vec<usize>> {
    let mut v = values.to_vec();
    if v.len() + 1 == matrices.dim() {
        v.push(0.0);
    }
    let v = Array1::from(v);
    let expected = matrices
        .matrices()
        .iter()
        .map(|m| m.mul_vec(v.view()))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..matrices.dim())
        .map(|s| {
            let row: Vec<f64> = expected.iter().map(|e| e[s]).collect();
            first_argmax(&row).unwrap_or(0)
        })
        .collect())
}

/// States where two policies pick different actions.
///
/// A policy over the transition matrices carries one extra entry for the
/// terminal state; comparing it with a per-state policy ignores that entry.
pub fn compare_policies(a: &[usize], b: &[usize]) -> Result<Vec<StateId>> {
    if a.len().abs_diff(b.len()) > 1 {
        return Err(MdpError::dimension_mismatch(
            a.len().to_string(),
            b.len().to_string(),
        ));
    }
    Ok(a.iter()
        .zip(b)
        .enumerate()
        .filter(|(_, (x, y))| x != y)
        .map(|(s, _)| s)
        .collect())
}

/// Iteration numbers of a single-row value log whose recovered policy
/// matches `reference`, in log order.
pub fn equal_policy_iterations<P: AsRef<Path>>(
    path: P,
    matrices: &TransitionMatrices,
    reference: &[usize],
) -> Result<Vec<usize>> {
    let mut equal = Vec::new();
    let mut failure = None;
    IterationLog::replay(path, 1, |snapshot| {
        if failure.is_some() {
            return;
        }
        let matched = policy_from_values(matrices, &snapshot.values[0])
            .and_then(|policy| compare_policies(&policy, reference));
        match matched {
            Ok(diffs) if diffs.is_empty() => equal.push(snapshot.number),
            Ok(_) => {}
            Err(e) => failure = Some(e),
        }
    })?;
    match failure {
        Some(e) => Err(e),
        None => Ok(equal),
    }
}

/// First logged iteration whose recovered policy matches `reference`.
pub fn first_equal_iteration<P: AsRef<Path>>(
    path: P,
    matrices: &TransitionMatrices,
    reference: &[usize],
) -> Result<Option<usize>> {
    Ok(equal_policy_iterations(path, matrices, reference)?
        .first()
        .copied())
}
