//! # MDP Abstractions
//!
//! Every solver in this crate talks to a problem through the [`Mdp`] trait: a
//! finite set of states indexed `0..num_states()`, a list of legal actions per
//! state, and rewards. Actions carry their full outcome distribution so that
//! model-based solvers can take expectations and model-free solvers can
//! sample from them.
//!
//! ## Implementations
//!
//! - [`crate::grid_world::GridWorld`]: stochastic tile world with treasure layers
//! - [`forest::Forest`]: the classic wait/cut forest-management problem

pub mod forest;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MdpError, Result};

/// Index of a state in an MDP's canonical state list.
pub type StateId = usize;

/// Tolerance used when checking that outcome probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Compass direction of a grid move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Movement slots are laid out in this order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction on the left hand when facing `self`.
    pub fn left(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
        }
    }

    /// Direction on the right hand when facing `self`.
    pub fn right(self) -> Direction {
        self.left().opposite()
    }

    /// Grid offset `(dx, dy)` with `y` growing southwards.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// What an action does, independent of its outcome distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Grid movement in a compass direction
    Move(Direction),
    /// Pick up the treasure with the given id
    CollectTreasure(usize),
    /// Search for treasure on a tile that has none left
    AttemptPickup,
    /// Domain specific action identified by name
    Named(String),
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Move(Direction::North) => write!(f, "move north"),
            ActionKind::Move(Direction::East) => write!(f, "move east"),
            ActionKind::Move(Direction::South) => write!(f, "move south"),
            ActionKind::Move(Direction::West) => write!(f, "move west"),
            ActionKind::CollectTreasure(id) => write!(f, "get treasure {}", id),
            ActionKind::AttemptPickup => write!(f, "try pick up treasure"),
            ActionKind::Named(name) => write!(f, "{}", name),
        }
    }
}

/// One edge of an action's outcome distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub probability: f64,
    pub target: StateId,
}

impl Outcome {
    pub fn new(probability: f64, target: StateId) -> Self {
        Outcome { probability, target }
    }
}

/// A legal action together with the distribution over successor states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub outcomes: Vec<Outcome>,
}

impl Action {
    pub fn new(kind: ActionKind, outcomes: Vec<Outcome>) -> Self {
        Action { kind, outcomes }
    }

    pub fn label(&self) -> String {
        self.kind.to_string()
    }

    pub fn total_probability(&self) -> f64 {
        self.outcomes.iter().map(|o| o.probability).sum()
    }

    /// Check that the outcomes form a probability distribution.
    ///
    /// Distributions are never renormalized; a bad table is a data error.
    pub fn validate(&self, state: StateId) -> Result<()> {
        if let Some(o) = self
            .outcomes
            .iter()
            .find(|o| !o.probability.is_finite() || o.probability < 0.0)
        {
            return Err(MdpError::InvalidDistribution {
                state,
                action: self.label(),
                reason: format!("probability {} is not a valid mass", o.probability),
            });
        }
        let total = self.total_probability();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(MdpError::InvalidDistribution {
                state,
                action: self.label(),
                reason: format!("probabilities sum to {}", total),
            });
        }
        Ok(())
    }

    /// Expected value of `values` over this action's successors.
    pub fn expected_value(&self, values: &[f64]) -> f64 {
        self.outcomes
            .iter()
            .map(|o| o.probability * values[o.target])
            .sum()
    }
}

/// Capability set shared by every finite MDP in the crate.
pub trait Mdp {
    /// Number of states; valid ids are `0..num_states()`.
    fn num_states(&self) -> usize;

    /// Legal actions of `state`, empty for terminal states.
    fn actions(&self, state: StateId) -> &[Action];

    /// Immediate reward of being in `state`.
    fn reward(&self, state: StateId) -> f64;

    /// States directly reachable from `state`.
    fn neighbors(&self, state: StateId) -> &[StateId];

    /// Reward credited to taking `action` in `state` by the model-based
    /// solvers.
    fn action_reward(&self, state: StateId, _action: usize) -> f64 {
        self.reward(state)
    }

    /// Reward observed when `action` taken in `state` lands in `next`.
    fn transition_reward(&self, _state: StateId, _action: usize, next: StateId) -> f64 {
        self.reward(next)
    }

    /// Canonical start state.
    fn start_state(&self) -> StateId {
        0
    }

    fn is_terminal(&self, state: StateId) -> bool {
        self.actions(state).is_empty()
    }

    /// Largest number of actions offered by any state.
    fn max_actions(&self) -> usize {
        (0..self.num_states())
            .map(|s| self.actions(s).len())
            .max()
            .unwrap_or(0)
    }

    /// All states that offer at least one action.
    fn non_terminal_states(&self) -> Vec<StateId> {
        (0..self.num_states())
            .filter(|&s| !self.is_terminal(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_rotation() {
        for d in Direction::ALL {
            assert_eq!(d.left().right(), d);
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.left().left(), d.opposite());
        }
        assert_eq!(Direction::North.right(), Direction::East);
        assert_eq!(Direction::South.left(), Direction::East);
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(ActionKind::Move(Direction::West).to_string(), "move west");
        assert_eq!(ActionKind::CollectTreasure(2).to_string(), "get treasure 2");
        assert_eq!(ActionKind::AttemptPickup.to_string(), "try pick up treasure");
    }

    #[test]
    fn test_validate_rejects_bad_mass() {
        let short = Action::new(
            ActionKind::Move(Direction::North),
            vec![Outcome::new(0.5, 0), Outcome::new(0.4, 1)],
        );
        assert!(matches!(
            short.validate(0),
            Err(MdpError::InvalidDistribution { .. })
        ));

        let negative = Action::new(
            ActionKind::AttemptPickup,
            vec![Outcome::new(1.2, 0), Outcome::new(-0.2, 1)],
        );
        assert!(negative.validate(3).is_err());

        let ok = Action::new(
            ActionKind::Move(Direction::East),
            vec![Outcome::new(0.8, 1), Outcome::new(0.1, 0), Outcome::new(0.1, 0)],
        );
        assert!(ok.validate(0).is_ok());
        assert!((ok.expected_value(&[1.0, 2.0]) - 1.8).abs() < 1e-12);
    }
}
