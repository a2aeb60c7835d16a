//! Forest management: each year the forester either waits for the stand to
//! age or cuts it down. A fire with probability `p` resets the forest to age
//! zero whenever the forester waits.

use ndarray::Array2;

use super::{Action, ActionKind, Mdp, Outcome, StateId};
use crate::error::{MdpError, Result};

pub const WAIT: usize = 0;
pub const CUT: usize = 1;

#[derive(Clone, Debug)]
pub struct Forest {
    size: usize,
    rewards: Array2<f64>,
    actions: Vec<Vec<Action>>,
    neighbors: Vec<Vec<StateId>>,
}

impl Forest {
    /// Build a forest with `size` age classes.
    ///
    /// `r1` is paid for waiting in the oldest class, `r2` for cutting it.
    pub fn new(size: usize, r1: f64, r2: f64, p: f64) -> Result<Self> {
        if size < 2 {
            return Err(MdpError::invalid_parameter(
                "size",
                "forest needs at least two age classes",
            ));
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(MdpError::invalid_parameter(
                "p",
                "fire probability must be within [0, 1]",
            ));
        }

        let oldest = size - 1;
        let mut rewards = Array2::zeros((size + 1, 2));
        for s in 0..size {
            rewards[[s, CUT]] = 1.0;
        }
        rewards[[0, CUT]] = 0.0;
        rewards[[oldest, WAIT]] = r1;
        rewards[[oldest, CUT]] = r2;

        let mut actions = Vec::with_capacity(size);
        let mut neighbors = Vec::with_capacity(size);
        for s in 0..size {
            let grown = (s + 1).min(oldest);
            let wait = Action::new(
                ActionKind::Named("wait".to_string()),
                vec![Outcome::new(p, 0), Outcome::new(1.0 - p, grown)],
            );
            let cut = Action::new(ActionKind::Named("cut".to_string()), vec![Outcome::new(1.0, 0)]);
            wait.validate(s)?;
            cut.validate(s)?;
            actions.push(vec![wait, cut]);

            let mut n = vec![0];
            if s < oldest {
                n.push(s + 1);
            }
            neighbors.push(n);
        }

        Ok(Forest {
            size,
            rewards,
            actions,
            neighbors,
        })
    }

    /// Reward per (state, action), with a trailing zero row for the
    /// synthetic terminal state used by the matrix solvers.
    pub fn reward_matrix(&self) -> Array2<f64> {
        self.rewards.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// One character per age class: `W` for wait, `C` for cut.
    pub fn render_policy(&self, policy: &[usize]) -> String {
        policy
            .iter()
            .take(self.size)
            .map(|&a| if a == WAIT { 'W' } else { 'C' })
            .collect()
    }
}

impl Mdp for Forest {
    fn num_states(&self) -> usize {
        self.size
    }

    fn actions(&self, state: StateId) -> &[Action] {
        &self.actions[state]
    }

    /// Reward for waiting in `state`.
    fn reward(&self, state: StateId) -> f64 {
        self.rewards[[state, WAIT]]
    }

    fn neighbors(&self, state: StateId) -> &[StateId] {
        &self.neighbors[state]
    }

    fn action_reward(&self, state: StateId, action: usize) -> f64 {
        self.rewards[[state, action]]
    }

    fn transition_reward(&self, state: StateId, action: usize, _next: StateId) -> f64 {
        self.rewards[[state, action]]
    }
}
