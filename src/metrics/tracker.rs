use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::Choice;

/// Monitoring record for one environment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Seconds since the agent was created
    pub elapsed: f64,
    /// Mean prediction over the test set, when one is attached
    pub mean_test_value: Option<f32>,
    pub loss: f32,
}

/// Stores agent statistics over time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Final loss of every training step
    pub losses: VecDeque<f32>,

    /// Epsilon at every acting decision
    pub epsilons: VecDeque<f32>,

    /// Highest Q estimate behind every greedy decision
    pub acting_max_q: VecDeque<f32>,

    /// How each action was chosen
    pub choices: VecDeque<Choice>,

    /// Bellman targets before scaling
    pub unscaled_targets: VecDeque<f32>,

    /// Targets the actor was actually fitted to
    pub training_targets: VecDeque<f32>,

    /// Percentage of duplicate next state-action rows per batch
    pub duplicate_pcts: VecDeque<f32>,

    pub steps: VecDeque<StepInfo>,

    /// Rewards per episode
    pub episode_rewards: VecDeque<f32>,

    /// Episode lengths
    pub episode_lengths: VecDeque<usize>,
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, history_size: usize) {
    if history.len() >= history_size {
        history.pop_front();
    }
    history.push_back(value);
}

/// Tracks metrics while the agent acts and learns
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_reward: f32,
    current_episode_length: usize,
    episode_count: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
        }
    }

    pub fn record_loss(&mut self, loss: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
    }

    pub fn record_decision(&mut self, epsilon: f32, choice: Choice, max_q: Option<f32>) {
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        push_bounded(&mut self.metrics.choices, choice, self.history_size);
        if let Some(max_q) = max_q {
            push_bounded(&mut self.metrics.acting_max_q, max_q, self.history_size);
        }
    }

    pub fn record_targets(&mut self, unscaled: &[f32], training: &[f32]) {
        for &target in unscaled {
            push_bounded(&mut self.metrics.unscaled_targets, target, self.history_size);
        }
        for &target in training {
            push_bounded(&mut self.metrics.training_targets, target, self.history_size);
        }
    }

    pub fn record_duplicate_pct(&mut self, pct: f32) {
        push_bounded(&mut self.metrics.duplicate_pcts, pct, self.history_size);
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f32, info: StepInfo) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
        push_bounded(&mut self.metrics.steps, info, self.history_size);
    }

    /// End the current episode, returning its total reward and length
    pub fn end_episode(&mut self) -> (f32, usize) {
        let finished = (self.current_episode_reward, self.current_episode_length);
        push_bounded(&mut self.metrics.episode_rewards, finished.0, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, finished.1, self.history_size);
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
        self.episode_count += 1;
        finished
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Get recent average loss
    pub fn avg_loss(&self, window: usize) -> Option<f32> {
        if self.metrics.losses.is_empty() || window == 0 {
            return None;
        }

        let n = window.min(self.metrics.losses.len());
        let sum: f32 = self.metrics.losses.iter().rev().take(n).sum();
        Some(sum / n as f32)
    }

    pub fn clear(&mut self) {
        *self = MetricsTracker::new(self.history_size);
    }

    /// Save metrics to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> crate::error::Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.metrics = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(100_000)
    }
}
