//! # Q-Learning
//!
//! Model-free tabular learning. Episodes are sampled from the action
//! distributions of an [`Mdp`]; the model itself is only used as a
//! simulator.
//!
//! ## Example
//!
//! ```rust
//! use gridmdp::config::{QLearningConfig, WorldConfig};
//! use gridmdp::grid_world::GridWorld;
//! use gridmdp::solvers::QLearning;
//!
//! let world = GridWorld::parse("3,1\nSOG\n", &WorldConfig::default()).unwrap();
//! let config = QLearningConfig { n_episodes: 200, seed: 7, ..Default::default() };
//! let mut learner = QLearning::builder(&world)
//!     .config(config)
//!     .initializer(|w: &GridWorld, s| w.goal_directed_q_values(s))
//!     .build()
//!     .unwrap();
//! let summary = learner.train().unwrap();
//! assert_eq!(summary.episodes, 200);
//! ```

mod q_table;

pub use q_table::QTable;

use log::{debug, info, warn};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::Bernoulli;
use std::time::{Duration, Instant};

use crate::config::QLearningConfig;
use crate::error::{MdpError, Result};
use crate::mdp::{Mdp, StateId};
use crate::metrics::MetricsTracker;

type DonePredicate<'a> = Box<dyn Fn(StateId, usize, StateId) -> bool + 'a>;
type EpisodeHook<'a> = Box<dyn FnMut(&EpisodeReport, &QTable) -> Result<()> + 'a>;

/// How each episode picks its first state.
pub enum StartPolicy<'a, M: ?Sized> {
    /// Always the MDP's start state
    Canonical,
    /// The start state with probability `0.25 + 0.75 * episode / n_episodes`,
    /// otherwise a uniformly random non-terminal state
    Annealed,
    /// Caller decides from the MDP, the learner's RNG and the episode number
    Custom(Box<dyn FnMut(&M, &mut StdRng, usize) -> StateId + 'a>),
}

impl<'a, M: ?Sized> StartPolicy<'a, M> {
    pub fn custom<F>(pick: F) -> Self
    where
        F: FnMut(&M, &mut StdRng, usize) -> StateId + 'a,
    {
        StartPolicy::Custom(Box::new(pick))
    }
}

/// Snapshot handed to the episode hook.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeReport {
    pub episode: usize,
    pub elapsed: f64,
    pub epsilon: f64,
    pub alpha: f64,
    pub steps: usize,
    pub total_reward: f64,
    /// Mean over states with actions of the best Q-value
    pub mean_max_q: f64,
}

#[derive(Clone, Debug)]
pub struct QLearningSummary {
    pub episodes: usize,
    pub total_steps: usize,
    pub final_epsilon: f64,
    pub mean_max_q: f64,
    pub elapsed: Duration,
}

/// Builder for [`QLearning`]
pub struct QLearningBuilder<'a, M: Mdp + ?Sized> {
    mdp: &'a M,
    config: QLearningConfig,
    initializer: Option<Box<dyn Fn(&M, StateId) -> Vec<f64> + 'a>>,
    done: Option<DonePredicate<'a>>,
    start_policy: Option<StartPolicy<'a, M>>,
    on_episode: Option<EpisodeHook<'a>>,
    history_size: usize,
}

impl<'a, M: Mdp + ?Sized> QLearningBuilder<'a, M> {
    pub fn new(mdp: &'a M) -> Self {
        QLearningBuilder {
            mdp,
            config: QLearningConfig::default(),
            initializer: None,
            done: None,
            start_policy: None,
            on_episode: None,
            history_size: 1000,
        }
    }

    pub fn config(mut self, config: QLearningConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial Q-values per state; must return one value per action.
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&M, StateId) -> Vec<f64> + 'a,
    {
        self.initializer = Some(Box::new(f));
        self
    }

    /// End an episode early when `f(state, action, next_state)` holds.
    pub fn done_when<F>(mut self, f: F) -> Self
    where
        F: Fn(StateId, usize, StateId) -> bool + 'a,
    {
        self.done = Some(Box::new(f));
        self
    }

    pub fn start_policy(mut self, policy: StartPolicy<'a, M>) -> Self {
        self.start_policy = Some(policy);
        self
    }

    /// Called every `report_every` episodes and after the last one.
    pub fn on_episode<F>(mut self, f: F) -> Self
    where
        F: FnMut(&EpisodeReport, &QTable) -> Result<()> + 'a,
    {
        self.on_episode = Some(Box::new(f));
        self
    }

    /// Episodes kept by the metrics tracker.
    pub fn history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    pub fn build(self) -> Result<QLearning<'a, M>> {
        self.config.validate()?;
        let mdp = self.mdp;
        let n = mdp.num_states();
        if n == 0 {
            return Err(MdpError::invalid_parameter("mdp", "has no states"));
        }

        let q = match &self.initializer {
            Some(init) => QTable::from_rows(mdp, (0..n).map(|s| init(mdp, s)).collect())?,
            None => QTable::zeros(mdp),
        };

        let mut samplers = Vec::with_capacity(n);
        for s in 0..n {
            let per_state = mdp
                .actions(s)
                .iter()
                .map(|action| {
                    WeightedIndex::new(action.outcomes.iter().map(|o| o.probability)).map_err(|e| {
                        MdpError::InvalidDistribution {
                            state: s,
                            action: action.label(),
                            reason: e.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            samplers.push(per_state);
        }

        let non_terminal = mdp.non_terminal_states();
        if non_terminal.len() == n && self.done.is_none() && self.config.max_steps_per_episode.is_none() {
            warn!("no terminal states, episode cap or done predicate: episodes may never end");
        }

        let start_policy = self.start_policy.unwrap_or(if self.config.start_at_0 {
            StartPolicy::Canonical
        } else {
            StartPolicy::Annealed
        });

        Ok(QLearning {
            mdp,
            rng: StdRng::seed_from_u64(self.config.seed),
            config: self.config,
            q,
            samplers,
            non_terminal,
            done: self.done,
            start_policy,
            on_episode: self.on_episode,
            metrics: MetricsTracker::new(self.history_size),
        })
    }
}

/// Epsilon-greedy tabular Q-learner
pub struct QLearning<'a, M: Mdp + ?Sized> {
    mdp: &'a M,
    config: QLearningConfig,
    rng: StdRng,
    q: QTable,
    samplers: Vec<Vec<WeightedIndex<f64>>>,
    non_terminal: Vec<StateId>,
    done: Option<DonePredicate<'a>>,
    start_policy: StartPolicy<'a, M>,
    on_episode: Option<EpisodeHook<'a>>,
    metrics: MetricsTracker,
}

impl<'a, M: Mdp + ?Sized> QLearning<'a, M> {
    pub fn builder(mdp: &'a M) -> QLearningBuilder<'a, M> {
        QLearningBuilder::new(mdp)
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn q_table(&self) -> &QTable {
        &self.q
    }

    pub fn into_q_table(self) -> QTable {
        self.q
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    /// First best action per state.
    pub fn policy(&self) -> Vec<usize> {
        self.q.policy()
    }

    /// Exploration rate after `episode` has finished.
    pub fn epsilon_after(&self, episode: usize) -> f64 {
        let span = self.config.epsilon_start - self.config.epsilon_min;
        self.config.epsilon_min + span / (2.0 * ((episode + 1) as f64).log2() + 1.0)
    }

    /// Run `n_episodes` episodes.
    pub fn train(&mut self) -> Result<QLearningSummary> {
        let start = Instant::now();
        let n = self.config.n_episodes;
        let gamma = self.config.gamma;
        let mut epsilon = self.config.epsilon_start;

        for episode in 0..n {
            let alpha = self.config.alpha.unwrap_or(1.0 / (episode as f64 + 1.0));
            let explore = Bernoulli::new(epsilon)
                .map_err(|e| MdpError::invalid_parameter("epsilon".to_string(), e.to_string()))?;

            let mut state = self.pick_start(episode)?;
            self.metrics.start_episode();
            let mut steps = 0;
            while !self.mdp.is_terminal(state) {
                if self.config.max_steps_per_episode.is_some_and(|cap| steps >= cap) {
                    break;
                }
                let action = self.select_action(state, &explore);
                let outcome = self.samplers[state][action].sample(&mut self.rng);
                let next = self.mdp.actions(state)[action].outcomes[outcome].target;

                let reward = self.mdp.transition_reward(state, action, next);
                let target = match self.q.max(next) {
                    Some(best) => reward + gamma * best,
                    None => reward,
                };
                let old = self.q.get(state)[action];
                self.q.set(state, action, (1.0 - alpha) * old + alpha * target);

                self.metrics.step(reward);
                steps += 1;
                let stop = self
                    .done
                    .as_ref()
                    .is_some_and(|done| done(state, action, next));
                state = next;
                if stop {
                    break;
                }
            }
            self.metrics.end_episode();

            let mean_max_q = self.q.mean_max();
            self.metrics.record_epsilon(epsilon);
            self.metrics.record_learning_rate(alpha);
            self.metrics.record_avg_max_q(mean_max_q);

            if episode % self.config.report_every == 0 || episode + 1 == n {
                let report = EpisodeReport {
                    episode,
                    elapsed: start.elapsed().as_secs_f64(),
                    epsilon,
                    alpha,
                    steps,
                    total_reward: self.metrics.metrics().episode_rewards.back().copied().unwrap_or(0.0),
                    mean_max_q,
                };
                info!(
                    "episode {}: {} steps, epsilon {:.4}, mean max Q {:.4}, recent reward {:.4}",
                    episode,
                    steps,
                    epsilon,
                    mean_max_q,
                    self.metrics
                        .avg_episode_reward(self.config.report_every)
                        .unwrap_or(0.0)
                );
                if let Some(hook) = self.on_episode.as_mut() {
                    hook(&report, &self.q)?;
                }
            } else {
                debug!("episode {}: {} steps", episode, steps);
            }

            epsilon = self.epsilon_after(episode);
        }

        Ok(QLearningSummary {
            episodes: self.metrics.episode_count(),
            total_steps: self.metrics.total_steps(),
            final_epsilon: epsilon,
            mean_max_q: self.q.mean_max(),
            elapsed: start.elapsed(),
        })
    }

    fn pick_start(&mut self, episode: usize) -> Result<StateId> {
        let canonical = self.mdp.start_state();
        let state = match &mut self.start_policy {
            StartPolicy::Canonical => canonical,
            StartPolicy::Annealed => {
                let p = 0.25 + 0.75 * episode as f64 / self.config.n_episodes as f64;
                let keep = Bernoulli::new(p.min(1.0)).map_err(|e| {
                    MdpError::invalid_parameter("start probability".to_string(), e.to_string())
                })?;
                if keep.sample(&mut self.rng) || self.non_terminal.is_empty() {
                    canonical
                } else {
                    self.non_terminal[self.rng.gen_range(0..self.non_terminal.len())]
                }
            }
            StartPolicy::Custom(pick) => pick(self.mdp, &mut self.rng, episode),
        };
        if state >= self.mdp.num_states() {
            return Err(MdpError::invalid_parameter(
                "start state".to_string(),
                format!("{} is outside {} states", state, self.mdp.num_states()),
            ));
        }
        Ok(state)
    }

    /// Epsilon-greedy choice, breaking ties between best actions uniformly.
    fn select_action(&mut self, state: StateId, explore: &Bernoulli) -> usize {
        let row = self.q.get(state);
        if explore.sample(&mut self.rng) {
            return self.rng.gen_range(0..row.len());
        }
        let best = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == best)
            .map(|(a, _)| a)
            .collect();
        match ties.len() {
            0 => 0,
            1 => ties[0],
            k => ties[self.rng.gen_range(0..k)],
        }
    }
}
