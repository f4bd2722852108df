//! Enumeration of candidate actions over a discretized action space.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{QgridError, Result};
use crate::normalizer::Normalizer;
use crate::space::ActionDimension;

/// How finely each action dimension is gridded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// `high - low + 1` points per leaf
    Integer,
    /// Fixed number of evenly spaced points per leaf
    Points(usize),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Integer
    }
}

/// Every candidate action for one state, raw and as normalized state-action rows.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateSet {
    /// Native-unit actions, one per row
    pub actions: Array2<f32>,
    /// Normalized `state ⧺ action` rows, aligned with `actions`
    pub state_actions: Array2<f32>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.actions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.nrows() == 0
    }
}

/// Holds the Cartesian product of all per-dimension grids.
#[derive(Clone, Debug)]
pub struct Discretizer {
    /// Candidate values per action dimension
    axes: Vec<Array1<f32>>,
    actions: Array2<f32>,
}

impl Discretizer {
    pub fn new(dimensions: &[ActionDimension], resolution: Resolution) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(QgridError::configuration(
                "action_space",
                "at least one action dimension is required",
            ));
        }
        let points = match resolution {
            Resolution::Integer => None,
            Resolution::Points(points) => Some(points),
        };
        let axes = dimensions
            .iter()
            .map(|dimension| dimension.grid(points))
            .collect::<Result<Vec<_>>>()?;
        let actions = cartesian_product(&axes);
        log::debug!(
            "discretized {} action dimensions into {} candidate actions",
            dimensions.len(),
            actions.nrows()
        );
        Ok(Discretizer { axes, actions })
    }

    pub fn from_env<E: Environment + ?Sized>(env: &E, resolution: Resolution) -> Result<Self> {
        Self::new(env.action_space(), resolution)
    }

    /// Candidate actions, one per row
    pub fn actions(&self) -> ArrayView2<f32> {
        self.actions.view()
    }

    /// Number of values in one action
    pub fn action_dim(&self) -> usize {
        self.actions.ncols()
    }

    /// Number of candidate actions
    pub fn len(&self) -> usize {
        self.actions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.nrows() == 0
    }

    /// Grid values of one action dimension
    pub fn axis(&self, dimension: usize) -> Option<ArrayView1<f32>> {
        self.axes.get(dimension).map(Array1::view)
    }

    /// True when every candidate value is a whole number.
    pub fn is_integral(&self) -> bool {
        self.actions.iter().all(|v| v.fract() == 0.0)
    }

    /// Uniform draw of one grid value per dimension.
    pub fn sample_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f32> {
        self.axes
            .iter()
            .map(|axis| axis[rng.gen_range(0..axis.len())])
            .collect()
    }

    /// `state` concatenated in front of every candidate action.
    pub fn state_actions(&self, state: ArrayView1<f32>) -> Array2<f32> {
        let state_dim = state.len();
        let mut rows = Array2::zeros((self.len(), state_dim + self.action_dim()));
        rows.slice_mut(s![.., ..state_dim]).assign(&state);
        rows.slice_mut(s![.., state_dim..]).assign(&self.actions);
        rows
    }

    pub fn candidates(&self, state: ArrayView1<f32>, normalizer: &Normalizer) -> Result<CandidateSet> {
        let state_actions = normalizer.normalize(self.state_actions(state).view())?;
        Ok(CandidateSet {
            actions: self.actions.clone(),
            state_actions,
        })
    }
}

/// Rows of every combination, last axis varying fastest.
pub fn cartesian_product(axes: &[Array1<f32>]) -> Array2<f32> {
    let rows: usize = axes.iter().map(Array1::len).product();
    let mut product = Array2::zeros((rows, axes.len()));
    let mut repeat = rows;
    for (column, axis) in axes.iter().enumerate() {
        if axis.is_empty() {
            break;
        }
        repeat /= axis.len();
        for row in 0..rows {
            product[[row, column]] = axis[(row / repeat) % axis.len()];
        }
    }
    product
}
