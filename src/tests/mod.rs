pub mod test_trainer;
pub mod test_value_function;

use std::collections::HashMap;
use std::path::Path;

use ndarray::{array, Array1, Array2, ArrayView1, ArrayView2};

use crate::env::{Environment, Step};
use crate::error::{QgridError, Result};
use crate::space::{ActionDimension, Bound};
use crate::value_function::{QFunction, TrainingRecord};

/// Walker on `[0, 10]` that moves by `action - 1` and ends after `horizon` steps.
pub struct LineEnv {
    pub position: f32,
    pub horizon: usize,
    steps: usize,
    observation_space: Vec<Bound>,
    action_space: Vec<ActionDimension>,
}

impl LineEnv {
    pub fn new(horizon: usize) -> Self {
        LineEnv {
            position: 5.0,
            horizon,
            steps: 0,
            observation_space: vec![Bound::new(0.0, 10.0)],
            action_space: vec![ActionDimension::scalar(0.0, 2.0)],
        }
    }
}

impl Environment for LineEnv {
    fn reset(&mut self) -> Result<Array1<f32>> {
        self.position = 5.0;
        self.steps = 0;
        Ok(array![self.position])
    }

    fn step(&mut self, action: ArrayView1<f32>) -> Result<Step> {
        self.position = (self.position + action[0] - 1.0).clamp(0.0, 10.0);
        self.steps += 1;
        Ok(Step {
            next_state: array![self.position],
            reward: self.position / 10.0,
            done: self.steps >= self.horizon,
            info: HashMap::new(),
        })
    }

    fn observation_space(&self) -> &[Bound] {
        &self.observation_space
    }

    fn action_space(&self) -> &[ActionDimension] {
        &self.action_space
    }

    fn steps(&self) -> usize {
        self.steps
    }
}

/// Linear `x · weights` predictor that keeps every call it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingQ {
    pub weights: Array1<f32>,
    pub predicted_rows: usize,
    pub improve_calls: Vec<(Array2<f32>, Array1<f32>)>,
    pub resets: usize,
    /// Make `copy_weights` into this instance fail
    pub fail_copy: bool,
}

impl RecordingQ {
    pub fn new(weights: Array1<f32>) -> Self {
        RecordingQ {
            weights,
            ..Default::default()
        }
    }
}

impl QFunction for RecordingQ {
    fn predict(&mut self, state_actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.predicted_rows += state_actions.nrows();
        Ok(state_actions.dot(&self.weights))
    }

    fn improve(
        &mut self,
        state_actions: ArrayView2<f32>,
        targets: ArrayView1<f32>,
    ) -> Result<TrainingRecord> {
        self.improve_calls
            .push((state_actions.to_owned(), targets.to_owned()));
        Ok(TrainingRecord { losses: vec![1.0, 0.5] })
    }

    fn copy_weights(&mut self, source: &Self) -> Result<()> {
        if self.fail_copy {
            return Err(QgridError::ValueFunction("copy refused".to_string()));
        }
        self.weights = source.weights.clone();
        Ok(())
    }

    fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn reset_weights(&mut self) {
        self.resets += 1;
    }
}
