//! # gridmdp - Grid-World MDP Construction and Solvers
//!
//! gridmdp builds finite Markov Decision Processes from text grids with
//! stochastic terrain and collectible treasure, flattens them into sparse
//! transition matrices, and solves them with Value Iteration, Policy
//! Iteration and Q-Learning.
//!
//! ## Key Features
//!
//! - **Grid Worlds**: slopes, traps, pits and treasure layers with
//!   direction-dependent slip probabilities
//! - **Solvers**: graph-based Value Iteration, matrix-based Policy Iteration,
//!   seeded epsilon-greedy Q-Learning
//! - **Persistence**: transition-matrix files, iteration logs written on a
//!   background thread, JSON configuration, bincode Q-tables
//! - **Forest Management**: the classic wait/cut MDP as a second model
//!
//! ## Quick Start
//!
//! ```rust
//! use gridmdp::config::{ValueIterationConfig, WorldConfig};
//! use gridmdp::grid_world::GridWorld;
//! use gridmdp::solvers::ValueIteration;
//!
//! let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
//! let config = ValueIterationConfig { gamma: 0.9, ..Default::default() };
//! let outcome = ValueIteration::new(&world, config).unwrap().run().unwrap();
//! assert!(outcome.converged);
//! assert!((outcome.values[0] - 7.19 / 0.82).abs() < 1e-3);
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Serializable world and solver settings
//! - [`error`] - Error types and result handling
//! - [`grid_world`] - Grid parsing, treasure layers and rendering
//! - [`mdp`] - The `Mdp` trait, actions and the forest model
//! - [`metrics`] - Episode metrics and value statistics
//! - [`solvers`] - Value Iteration, Policy Iteration, Q-Learning
//! - [`stats`] - Iteration snapshots, background recorder, log replay
//! - [`transitions`] - Sparse transition matrices and reward vectors

pub mod config;
pub mod error;
pub mod grid_world;
pub mod mdp;
pub mod metrics;
pub mod solvers;
pub mod stats;
pub mod transitions;

#[cfg(test)]
mod tests;
