use ndarray::{Array1, ArrayView1};

use crate::error::Result;
use crate::memory::Batch;
use crate::policy::Choice;
use crate::value_function::TrainingRecord;

/// One acting decision
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Action in environment-native units
    pub action: Array1<f32>,
    /// `observation ⧺ action`, unnormalized
    pub state_action: Array1<f32>,
    pub choice: Choice,
    /// Exploration rate in force when the decision was made
    pub epsilon: f32,
    /// Highest Q estimate among the candidates, for greedy decisions
    pub max_q: Option<f32>,
}

/// Capabilities shared by every agent
pub trait Agent {
    /// Select an action for an observation
    fn act(&mut self, observation: ArrayView1<f32>) -> Result<Decision>;

    /// Train on an explicit batch of transitions
    fn learn(&mut self, batch: &Batch) -> Result<TrainingRecord>;

    /// Forget everything learned so far
    fn reset(&mut self) -> Result<()>;

    /// Get the current exploration rate (if applicable)
    fn exploration_rate(&self) -> Option<f32> {
        None
    }
}
