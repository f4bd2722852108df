use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};

use crate::error::Result;
use crate::space::{ActionDimension, Bound};

/// Outcome of a single environment transition
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub next_state: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: HashMap<String, f32>,
}

/// Environment the agent interacts with.
///
/// Implementations own their dynamics; the agent only relies on the declared
/// spaces and the reset/step cycle. The bound vectors are derived from the
/// spaces unless an implementation overrides them.
pub trait Environment {
    fn reset(&mut self) -> Result<Array1<f32>>;

    fn step(&mut self, action: ArrayView1<f32>) -> Result<Step>;

    fn observation_space(&self) -> &[Bound];

    fn action_space(&self) -> &[ActionDimension];

    /// Steps taken since the last reset
    fn steps(&self) -> usize;

    fn s_mins(&self) -> Array1<f32> {
        self.observation_space().iter().map(|b| b.low).collect()
    }

    fn s_maxs(&self) -> Array1<f32> {
        self.observation_space().iter().map(|b| b.high).collect()
    }

    fn a_mins(&self) -> Array1<f32> {
        self.action_space().iter().map(ActionDimension::low).collect()
    }

    fn a_maxs(&self) -> Array1<f32> {
        self.action_space().iter().map(ActionDimension::high).collect()
    }

    /// Lower bounds of the concatenated state-action vector
    fn mins(&self) -> Array1<f32> {
        self.s_mins().iter().chain(self.a_mins().iter()).copied().collect()
    }

    /// Upper bounds of the concatenated state-action vector
    fn maxs(&self) -> Array1<f32> {
        self.s_maxs().iter().chain(self.a_maxs().iter()).copied().collect()
    }
}
