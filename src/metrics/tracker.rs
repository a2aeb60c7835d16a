use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Per-episode learning history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    /// Sum of observed rewards per episode
    pub episode_rewards: VecDeque<f64>,

    /// Steps taken per episode
    pub episode_lengths: VecDeque<usize>,

    /// Exploration rate used during each episode
    pub epsilons: VecDeque<f64>,

    /// Step size used during each episode
    pub learning_rates: VecDeque<f64>,

    /// Mean of the best Q-value over non-terminal states after each episode
    pub avg_max_q: VecDeque<f64>,
}

impl EpisodeMetrics {
    pub fn new(history_size: usize) -> Self {
        EpisodeMetrics {
            episode_rewards: VecDeque::with_capacity(history_size),
            episode_lengths: VecDeque::with_capacity(history_size),
            epsilons: VecDeque::with_capacity(history_size),
            learning_rates: VecDeque::with_capacity(history_size),
            avg_max_q: VecDeque::with_capacity(history_size),
        }
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, limit: usize) {
    if history.len() >= limit {
        history.pop_front();
    }
    history.push_back(value);
}

/// Tracks metrics while a learner runs episodes
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: EpisodeMetrics,
    history_size: usize,

    current_episode_reward: f64,
    current_episode_length: usize,
    episode_count: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        MetricsTracker {
            metrics: EpisodeMetrics::new(history_size),
            history_size,
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
        }
    }

    pub fn record_epsilon(&mut self, epsilon: f64) {
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
    }

    pub fn record_learning_rate(&mut self, lr: f64) {
        push_bounded(&mut self.metrics.learning_rates, lr, self.history_size);
    }

    pub fn record_avg_max_q(&mut self, value: f64) {
        push_bounded(&mut self.metrics.avg_max_q, value, self.history_size);
    }

    /// Start a new episode
    pub fn start_episode(&mut self) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f64) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    /// End the current episode
    pub fn end_episode(&mut self) {
        push_bounded(
            &mut self.metrics.episode_rewards,
            self.current_episode_reward,
            self.history_size,
        );
        push_bounded(
            &mut self.metrics.episode_lengths,
            self.current_episode_length,
            self.history_size,
        );
        self.episode_count += 1;
    }

    pub fn metrics(&self) -> &EpisodeMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Mean reward of the last `window` episodes
    pub fn avg_episode_reward(&self, window: usize) -> Option<f64> {
        recent_mean(self.metrics.episode_rewards.iter().copied(), window)
    }

    /// Mean length of the last `window` episodes
    pub fn avg_episode_length(&self, window: usize) -> Option<f64> {
        recent_mean(self.metrics.episode_lengths.iter().map(|&l| l as f64), window)
    }

    /// Save metrics to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics from a JSON file
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> crate::error::Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.metrics = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn recent_mean<I>(values: I, window: usize) -> Option<f64>
where
    I: DoubleEndedIterator<Item = f64> + ExactSizeIterator,
{
    let n = window.min(values.len());
    if n == 0 {
        return None;
    }
    let sum: f64 = values.rev().take(n).sum();
    Some(sum / n as f64)
}
