//! # Solvers
//!
//! - [`value_iteration`]: synchronous Bellman backups straight over the
//!   [`Mdp`] action graph
//! - [`policy_iteration`]: evaluation/improvement over
//!   [`crate::transitions::TransitionMatrices`]
//! - [`q_learning`]: model-free tabular learning from sampled episodes
//!
//! Solvers never panic on non-convergence: their outcomes carry a
//! `converged` flag instead.

pub mod policy_iteration;
pub mod q_learning;
pub mod value_iteration;

pub use policy_iteration::{PolicyIteration, PolicyIterationOutcome, PolicyIterationReport};
pub use q_learning::{EpisodeReport, QLearning, QLearningBuilder, QLearningSummary, QTable, StartPolicy};
pub use value_iteration::{IterationReport, ValueIteration, ValueIterationOutcome};

use crate::mdp::{Mdp, StateId};

/// Index of the first maximum; `None` for an empty slice.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// One-step lookahead value of every action of `state`.
pub fn action_values<M: Mdp + ?Sized>(mdp: &M, state: StateId, values: &[f64], gamma: f64) -> Vec<f64> {
    mdp.actions(state)
        .iter()
        .enumerate()
        .map(|(a, action)| mdp.action_reward(state, a) + gamma * action.expected_value(values))
        .collect()
}

/// Greedy policy from a value function: first best action per state, `0`
/// for states without actions.
pub fn greedy_policy<M: Mdp + ?Sized>(mdp: &M, values: &[f64], gamma: f64) -> Vec<usize> {
    (0..mdp.num_states())
        .map(|s| first_argmax(&action_values(mdp, s, values, gamma)).unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_argmax_prefers_earliest() {
        assert_eq!(first_argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(first_argmax(&[-1.0]), Some(0));
        assert_eq!(first_argmax(&[]), None);
    }
}
