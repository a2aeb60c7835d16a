//! Serializable configuration for worlds and solvers.
//!
//! Every struct has sensible defaults and a `validate()` that rejects values
//! the solvers cannot work with. Configurations are stored as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MdpError, Result};

/// Rewards and options used when building a grid world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub normal_reward: f64,
    /// Goal reward with no treasure collected; it grows by the same amount
    /// for every collected treasure.
    pub goal_reward: f64,
    pub trap_reward: f64,
    pub pit_reward: f64,
    /// Offer an "attempt pickup" action on tiles without collectible treasure.
    pub include_fake_pickup: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            normal_reward: -0.01,
            goal_reward: 10.0,
            trap_reward: -10.0,
            pit_reward: -5.0,
            include_fake_pickup: true,
        }
    }
}

impl WorldConfig {
    pub fn with_normal_reward(normal_reward: f64) -> Self {
        WorldConfig {
            normal_reward,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("normal_reward", self.normal_reward),
            ("goal_reward", self.goal_reward),
            ("trap_reward", self.trap_reward),
            ("pit_reward", self.pit_reward),
        ] {
            if !value.is_finite() {
                return Err(MdpError::invalid_parameter(name, "reward must be finite"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueIterationConfig {
    pub gamma: f64,
    /// Convergence threshold on the per-state change between iterations
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        ValueIterationConfig {
            gamma: 0.99,
            epsilon: 1e-4,
            max_iterations: 10_000,
        }
    }
}

impl ValueIterationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_gamma(self.gamma)?;
        validate_positive("epsilon", self.epsilon)?;
        validate_cap("max_iterations", self.max_iterations)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyIterationConfig {
    pub gamma: f64,
    pub max_iterations: usize,
    /// Threshold of the iterative policy evaluation
    pub eval_epsilon: f64,
    pub eval_max_iterations: usize,
}

impl Default for PolicyIterationConfig {
    fn default() -> Self {
        PolicyIterationConfig {
            gamma: 0.99,
            max_iterations: 1000,
            eval_epsilon: 1e-4,
            eval_max_iterations: 10_000,
        }
    }
}

impl PolicyIterationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_gamma(self.gamma)?;
        validate_positive("eval_epsilon", self.eval_epsilon)?;
        validate_cap("max_iterations", self.max_iterations)?;
        validate_cap("eval_max_iterations", self.eval_max_iterations)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_min: f64,
    /// Fixed step size; `None` uses `1 / (episode + 1)`
    pub alpha: Option<f64>,
    pub n_episodes: usize,
    /// Always start episodes from the canonical start state
    pub start_at_0: bool,
    /// Episode-report cadence
    pub report_every: usize,
    pub max_steps_per_episode: Option<usize>,
    pub seed: u64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            gamma: 0.99,
            epsilon_start: 0.5,
            epsilon_min: 0.05,
            alpha: None,
            n_episodes: 10_000,
            start_at_0: false,
            report_every: 100,
            max_steps_per_episode: None,
            seed: 0,
        }
    }
}

impl QLearningConfig {
    pub fn validate(&self) -> Result<()> {
        validate_gamma(self.gamma)?;
        if !(0.0..=1.0).contains(&self.epsilon_start) {
            return Err(MdpError::invalid_parameter(
                "epsilon_start",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=self.epsilon_start).contains(&self.epsilon_min) {
            return Err(MdpError::invalid_parameter(
                "epsilon_min",
                "must be within [0, epsilon_start]",
            ));
        }
        if let Some(alpha) = self.alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(MdpError::invalid_parameter("alpha", "must be within (0, 1]"));
            }
        }
        validate_cap("n_episodes", self.n_episodes)?;
        validate_cap("report_every", self.report_every)?;
        if let Some(steps) = self.max_steps_per_episode {
            validate_cap("max_steps_per_episode", steps)?;
        }
        Ok(())
    }
}

/// Everything needed to set up and solve one world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub world: WorldConfig,
    pub value_iteration: ValueIterationConfig,
    pub policy_iteration: PolicyIterationConfig,
    pub q_learning: QLearningConfig,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;
        self.value_iteration.validate()?;
        self.policy_iteration.validate()?;
        self.q_learning.validate()
    }

    /// Load and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ExperimentConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

fn validate_gamma(gamma: f64) -> Result<()> {
    if gamma > 0.0 && gamma < 1.0 {
        Ok(())
    } else {
        Err(MdpError::invalid_parameter(
            "gamma".to_string(),
            format!("{} is outside (0, 1)", gamma),
        ))
    }
}

fn validate_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(MdpError::invalid_parameter(
            name.to_string(),
            format!("{} must be positive", value),
        ))
    }
}

fn validate_cap(name: &str, value: usize) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(MdpError::invalid_parameter(name, "must be greater than 0"))
    }
}
