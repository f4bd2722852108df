use crate::error::{QgridError, Result};
use crate::value_function::DenseQ;

/// Builder for constructing dense Q networks with a fluent API
pub struct DenseQBuilder {
    input_dim: Option<usize>,
    hidden: Vec<usize>,
    learning_rate: f32,
    epochs: usize,
    seed: Option<u64>,
}

impl DenseQBuilder {
    /// Two hidden layers of 25 units, one epoch per improve call
    pub fn new() -> Self {
        DenseQBuilder {
            input_dim: None,
            hidden: vec![25, 25],
            learning_rate: 0.001,
            epochs: 1,
            seed: None,
        }
    }

    /// Width of a state-action vector
    pub fn input_dim(mut self, input_dim: usize) -> Self {
        self.input_dim = Some(input_dim);
        self
    }

    pub fn hidden_layers(mut self, sizes: &[usize]) -> Self {
        self.hidden = sizes.to_vec();
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Gradient passes over the batch per improve call
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the network
    pub fn build(self) -> Result<DenseQ> {
        let input_dim = self.input_dim.ok_or_else(|| {
            QgridError::configuration("input_dim", "Input dimension not specified")
        })?;
        if !(self.learning_rate > 0.0) {
            return Err(QgridError::configuration(
                "learning_rate".to_string(),
                format!("must be positive, got {}", self.learning_rate),
            ));
        }
        match self.seed {
            Some(seed) => DenseQ::seeded(input_dim, &self.hidden, self.learning_rate, self.epochs, seed),
            None => DenseQ::new(input_dim, &self.hidden, self.learning_rate, self.epochs),
        }
    }
}

impl Default for DenseQBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_builder() {
        let network = DenseQBuilder::new()
            .input_dim(3)
            .hidden_layers(&[8, 4])
            .learning_rate(0.01)
            .seed(7)
            .build()
            .unwrap();

        assert_eq!(network.layer_sizes(), &[3, 8, 4, 1]);
        assert_eq!(network.epochs, 1);
    }

    #[test]
    fn test_builder_errors() {
        assert!(DenseQBuilder::new().build().is_err());
        assert!(DenseQBuilder::new().input_dim(2).learning_rate(0.0).build().is_err());
        assert!(DenseQBuilder::new().input_dim(2).hidden_layers(&[0]).build().is_err());
    }
}
