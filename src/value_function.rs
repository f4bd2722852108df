//! Action-value functions `Q(s, a)` over normalized state-action rows.
//!
//! The agent only depends on [`QFunction`]. Two implementations ship with the
//! crate: [`DenseQ`], a small feed-forward network trained by minibatch
//! gradient descent, and [`LinearQ`], a linear model that is cheap to reason
//! about in tests and baselines.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use crate::error::{QgridError, Result};

/// Outcome of one `improve` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Loss after every epoch, oldest first
    pub losses: Vec<f32>,
}

impl TrainingRecord {
    /// Record of a training step that did nothing.
    pub fn empty() -> Self {
        TrainingRecord { losses: vec![0.0] }
    }

    pub fn final_loss(&self) -> f32 {
        self.losses.last().copied().unwrap_or(0.0)
    }
}

/// Capabilities the agent needs from a value function.
pub trait QFunction {
    /// One scalar estimate per input row
    fn predict(&mut self, state_actions: ArrayView2<f32>) -> Result<Array1<f32>>;

    /// Fit towards `targets`, one per input row
    fn improve(
        &mut self,
        state_actions: ArrayView2<f32>,
        targets: ArrayView1<f32>,
    ) -> Result<TrainingRecord>;

    /// Overwrite every weight with the values held by `source`
    fn copy_weights(&mut self, source: &Self) -> Result<()>
    where
        Self: Sized;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;

    fn reset_weights(&mut self);
}

fn check_targets(state_actions: ArrayView2<f32>, targets: ArrayView1<f32>) -> Result<()> {
    if state_actions.nrows() != targets.len() {
        return Err(QgridError::data_shape(
            format!("{} targets", state_actions.nrows()),
            format!("{}", targets.len()),
        ));
    }
    Ok(())
}

fn check_width(expected: usize, state_actions: ArrayView2<f32>) -> Result<()> {
    if state_actions.ncols() != expected {
        return Err(QgridError::data_shape(
            format!("{} input columns", expected),
            format!("{}", state_actions.ncols()),
        ));
    }
    Ok(())
}

/// Fully connected layer, `inputs.dot(weights) + biases`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct DenseLayer {
    weights: Array2<f32>,
    biases: Array1<f32>,
}

impl DenseLayer {
    fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        DenseLayer {
            weights: Array2::random_using((input_size, output_size), Uniform::new(-0.1, 0.1), rng),
            biases: Array1::zeros(output_size),
        }
    }

    fn forward(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0))
    }
}

/// Feed-forward Q network: ReLU hidden layers and one linear output unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseQ {
    layers: Vec<DenseLayer>,
    layer_sizes: Vec<usize>,
    pub learning_rate: f32,
    pub epochs: usize,
    seed: u64,
    resets: u64,
}

impl DenseQ {
    pub fn new(input_dim: usize, hidden: &[usize], learning_rate: f32, epochs: usize) -> Result<Self> {
        Self::seeded(input_dim, hidden, learning_rate, epochs, rand::random())
    }

    /// Same architecture, deterministic initial weights.
    pub fn seeded(
        input_dim: usize,
        hidden: &[usize],
        learning_rate: f32,
        epochs: usize,
        seed: u64,
    ) -> Result<Self> {
        if input_dim == 0 || hidden.contains(&0) {
            return Err(QgridError::configuration(
                "layer_sizes",
                "every layer needs at least one unit",
            ));
        }
        let mut layer_sizes = Vec::with_capacity(hidden.len() + 2);
        layer_sizes.push(input_dim);
        layer_sizes.extend_from_slice(hidden);
        layer_sizes.push(1);

        let mut network = DenseQ {
            layers: Vec::new(),
            layer_sizes,
            learning_rate,
            epochs: epochs.max(1),
            seed,
            resets: 0,
        };
        network.initialize();
        Ok(network)
    }

    fn initialize(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.resets));
        self.layers = self
            .layer_sizes
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], &mut rng))
            .collect();
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// Keeps pre-activations of every layer for backpropagation.
    fn forward_cached(&self, inputs: ArrayView2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
        let mut activations = vec![inputs.to_owned()];
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(activations[i].view());
            let a = if i == last { z.clone() } else { z.mapv(|v| v.max(0.0)) };
            pre_activations.push(z);
            activations.push(a);
        }
        (activations, pre_activations)
    }

    fn train_epoch(&mut self, inputs: ArrayView2<f32>, targets: ArrayView1<f32>) -> f32 {
        let rows = inputs.nrows() as f32;
        let (activations, pre_activations) = self.forward_cached(inputs);
        let outputs = activations[self.layers.len()].column(0).to_owned();
        let errors = &outputs - &targets;
        let loss = errors.mapv(|e| e * e).mean().unwrap_or(0.0);

        // d(mean squared error)/d(output)
        let mut delta = errors.insert_axis(Axis(1)) * (2.0 / rows);
        for i in (0..self.layers.len()).rev() {
            if i != self.layers.len() - 1 {
                delta = delta * &pre_activations[i].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            }
            let weight_gradients = activations[i].t().dot(&delta);
            let bias_gradients = delta.sum_axis(Axis(0));
            let propagated = delta.dot(&self.layers[i].weights.t());

            let layer = &mut self.layers[i];
            let lr = self.learning_rate;
            layer.weights.zip_mut_with(&weight_gradients, |w, &g| *w -= lr * g);
            layer.biases.zip_mut_with(&bias_gradients, |b, &g| *b -= lr * g);
            delta = propagated;
        }
        loss
    }
}

impl QFunction for DenseQ {
    fn predict(&mut self, state_actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        check_width(self.layer_sizes[0], state_actions)?;
        let mut output = state_actions.to_owned();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            output = layer.forward(output.view());
            if i != last {
                output.mapv_inplace(|v| v.max(0.0));
            }
        }
        Ok(output.column(0).to_owned())
    }

    fn improve(
        &mut self,
        state_actions: ArrayView2<f32>,
        targets: ArrayView1<f32>,
    ) -> Result<TrainingRecord> {
        check_width(self.layer_sizes[0], state_actions)?;
        check_targets(state_actions, targets)?;
        if state_actions.nrows() == 0 {
            return Ok(TrainingRecord::empty());
        }
        let losses = (0..self.epochs)
            .map(|_| self.train_epoch(state_actions, targets))
            .collect::<Vec<_>>();
        if losses.iter().any(|l| !l.is_finite()) {
            return Err(QgridError::ValueFunction(format!(
                "loss diverged: {:?}",
                losses.last()
            )));
        }
        Ok(TrainingRecord { losses })
    }

    fn copy_weights(&mut self, source: &Self) -> Result<()> {
        if source.layer_sizes != self.layer_sizes {
            return Err(QgridError::data_shape(
                format!("layers {:?}", self.layer_sizes),
                format!("layers {:?}", source.layer_sizes),
            ));
        }
        self.layers = source.layers.clone();
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let loaded: DenseQ = bincode::deserialize(&fs::read(path)?)?;
        if loaded.layer_sizes != self.layer_sizes {
            return Err(QgridError::data_shape(
                format!("layers {:?}", self.layer_sizes),
                format!("layers {:?}", loaded.layer_sizes),
            ));
        }
        *self = loaded;
        Ok(())
    }

    fn reset_weights(&mut self) {
        self.resets += 1;
        self.initialize();
    }
}

/// `Q(x) = x · w + b`, trained by full-batch gradient descent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearQ {
    pub weights: Array1<f32>,
    pub bias: f32,
    pub learning_rate: f32,
    pub epochs: usize,
}

impl LinearQ {
    pub fn new(input_dim: usize, learning_rate: f32, epochs: usize) -> Self {
        LinearQ {
            weights: Array1::zeros(input_dim),
            bias: 0.0,
            learning_rate,
            epochs: epochs.max(1),
        }
    }

    pub fn with_weights(mut self, weights: Array1<f32>, bias: f32) -> Self {
        self.weights = weights;
        self.bias = bias;
        self
    }
}

impl QFunction for LinearQ {
    fn predict(&mut self, state_actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        check_width(self.weights.len(), state_actions)?;
        Ok(state_actions.dot(&self.weights) + self.bias)
    }

    fn improve(
        &mut self,
        state_actions: ArrayView2<f32>,
        targets: ArrayView1<f32>,
    ) -> Result<TrainingRecord> {
        check_width(self.weights.len(), state_actions)?;
        check_targets(state_actions, targets)?;
        if state_actions.nrows() == 0 {
            return Ok(TrainingRecord::empty());
        }
        let rows = state_actions.nrows() as f32;
        let mut losses = Vec::with_capacity(self.epochs);
        for _ in 0..self.epochs {
            let errors = state_actions.dot(&self.weights) + self.bias - &targets;
            losses.push(errors.mapv(|e| e * e).mean().unwrap_or(0.0));
            let gradient = state_actions.t().dot(&errors) * (2.0 / rows);
            self.weights.scaled_add(-self.learning_rate, &gradient);
            self.bias -= self.learning_rate * 2.0 * errors.sum() / rows;
        }
        Ok(TrainingRecord { losses })
    }

    fn copy_weights(&mut self, source: &Self) -> Result<()> {
        if source.weights.len() != self.weights.len() {
            return Err(QgridError::data_shape(
                format!("{} weights", self.weights.len()),
                format!("{}", source.weights.len()),
            ));
        }
        self.weights.assign(&source.weights);
        self.bias = source.bias;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        *self = bincode::deserialize(&fs::read(path)?)?;
        Ok(())
    }

    fn reset_weights(&mut self) {
        self.weights.fill(0.0);
        self.bias = 0.0;
    }
}
