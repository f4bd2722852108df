//! Min/max scaling of state-action vectors into `[0, 1]`.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{QgridError, Result};

/// Per-dimension bounds of the concatenated state+action space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    mins: Array1<f32>,
    maxs: Array1<f32>,
}

impl Normalizer {
    /// Rejects mismatched lengths and inverted bounds. Equal bounds are
    /// accepted here and fail once a batch actually touches that dimension.
    pub fn new(mins: Array1<f32>, maxs: Array1<f32>) -> Result<Self> {
        if mins.len() != maxs.len() {
            return Err(QgridError::data_shape(
                format!("{} maxs", mins.len()),
                format!("{} maxs", maxs.len()),
            ));
        }
        for (dimension, (&lo, &hi)) in mins.iter().zip(maxs.iter()).enumerate() {
            if hi < lo {
                return Err(QgridError::configuration(
                    "bounds".to_string(),
                    format!("dimension {} has max {} below min {}", dimension, hi, lo),
                ));
            }
        }
        Ok(Normalizer { mins, maxs })
    }

    pub fn from_env<E: Environment + ?Sized>(env: &E) -> Result<Self> {
        Self::new(env.mins(), env.maxs())
    }

    pub fn mins(&self) -> ArrayView1<f32> {
        self.mins.view()
    }

    pub fn maxs(&self) -> ArrayView1<f32> {
        self.maxs.view()
    }

    pub fn dim(&self) -> usize {
        self.mins.len()
    }

    pub fn normalize(&self, batch: ArrayView2<f32>) -> Result<Array2<f32>> {
        normalize(batch, self.mins.view(), self.maxs.view())
    }

    /// Single vector in, one-row batch out.
    pub fn normalize_vector(&self, vector: ArrayView1<f32>) -> Result<Array2<f32>> {
        self.normalize(vector.insert_axis(Axis(0)))
    }

    /// Maps the action part of a normalized state-action row back to native
    /// units, rounding to the nearest integer when `discrete` is set.
    pub fn denormalize_actions(
        &self,
        state_action: ArrayView1<f32>,
        state_dim: usize,
        discrete: bool,
    ) -> Result<Array1<f32>> {
        if state_action.len() > self.dim() || state_dim > state_action.len() {
            return Err(QgridError::data_shape(
                format!("state-action of at most {} values", self.dim()),
                format!("{} values with state_dim {}", state_action.len(), state_dim),
            ));
        }
        let end = state_action.len();
        let lb = self.mins.slice(s![state_dim..end]);
        let ub = self.maxs.slice(s![state_dim..end]);
        let actions = denormalize(state_action.slice(s![state_dim..]), lb, ub);
        Ok(if discrete { actions.mapv(f32::round) } else { actions })
    }
}

/// `(x - min) / (max - min)` broadcast over every row.
///
/// The batch may use a prefix of the bound vectors; every used dimension must
/// have `max != min`.
pub fn normalize(
    batch: ArrayView2<f32>,
    mins: ArrayView1<f32>,
    maxs: ArrayView1<f32>,
) -> Result<Array2<f32>> {
    let width = batch.ncols();
    if width > mins.len() || width > maxs.len() {
        return Err(QgridError::data_shape(
            format!("at most {} columns", mins.len().min(maxs.len())),
            format!("{} columns", width),
        ));
    }
    let mins = mins.slice(s![..width]);
    let maxs = maxs.slice(s![..width]);
    let spans = &maxs - &mins;
    if let Some(dimension) = spans.iter().position(|&span| span == 0.0) {
        return Err(QgridError::DivisionByZero { dimension });
    }
    Ok((&batch - &mins) / &spans)
}

/// Exact inverse of [`normalize`]: `lb + x * (ub - lb)`.
pub fn denormalize(
    normalized: ArrayView1<f32>,
    lb: ArrayView1<f32>,
    ub: ArrayView1<f32>,
) -> Array1<f32> {
    &lb + &(&normalized * &(&ub - &lb))
}
