//! Bounded spaces that environments declare for observations and actions.
//!
//! An observation space is a flat list of [`Bound`]s. An action space is a list
//! of [`ActionDimension`]s, each of which is either a single bounded scalar or a
//! composite of nested dimensions. A composite still yields one action value:
//! its sub-ranges are pooled into a single axis of candidate values.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{QgridError, Result};

/// Largest number of points a single bound may be gridded into.
pub const MAX_GRID_POINTS: usize = 1 << 20;

/// Closed interval `[low, high]` on one dimension.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub low: f32,
    pub high: f32,
}

impl Bound {
    pub fn new(low: f32, high: f32) -> Self {
        Bound { low, high }
    }

    /// Fails when either end is not finite or `high < low`.
    pub fn validate(&self) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(QgridError::configuration(
                "bound".to_string(),
                format!("[{}, {}] is not finite", self.low, self.high),
            ));
        }
        if !(self.high >= self.low) {
            return Err(QgridError::configuration(
                "bound".to_string(),
                format!("high {} is below low {}", self.high, self.low),
            ));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.high > self.low {
            rng.gen_range(self.low..=self.high)
        } else {
            self.low
        }
    }

    /// `high - low + 1` evenly spaced points, so integer bounds give every integer.
    pub fn integer_grid(&self) -> Result<Array1<f32>> {
        self.validate()?;
        let span = (self.high - self.low).floor();
        if span >= MAX_GRID_POINTS as f32 {
            return Err(QgridError::configuration(
                "bound".to_string(),
                format!(
                    "[{}, {}] spans more than {} integer points",
                    self.low, self.high, MAX_GRID_POINTS
                ),
            ));
        }
        Ok(Array1::linspace(self.low, self.high, span as usize + 1))
    }

    pub fn grid(&self, points: usize) -> Result<Array1<f32>> {
        self.validate()?;
        if points == 0 || points > MAX_GRID_POINTS {
            return Err(QgridError::configuration(
                "resolution".to_string(),
                format!("a grid needs between 1 and {} points, got {}", MAX_GRID_POINTS, points),
            ));
        }
        Ok(Array1::linspace(self.low, self.high, points))
    }
}

/// One entry of an action space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ActionDimension {
    Scalar(Bound),
    Composite(Vec<ActionDimension>),
}

impl ActionDimension {
    pub fn scalar(low: f32, high: f32) -> Self {
        ActionDimension::Scalar(Bound::new(low, high))
    }

    /// Smallest value any leaf can take.
    pub fn low(&self) -> f32 {
        match self {
            ActionDimension::Scalar(bound) => bound.low,
            ActionDimension::Composite(children) => children
                .iter()
                .map(ActionDimension::low)
                .fold(f32::INFINITY, f32::min),
        }
    }

    /// Largest value any leaf can take.
    pub fn high(&self) -> f32 {
        match self {
            ActionDimension::Scalar(bound) => bound.high,
            ActionDimension::Composite(children) => children
                .iter()
                .map(ActionDimension::high)
                .fold(f32::NEG_INFINITY, f32::max),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ActionDimension::Scalar(bound) => bound.validate(),
            ActionDimension::Composite(children) => {
                if children.is_empty() {
                    return Err(QgridError::configuration(
                        "action_space",
                        "composite dimension has no members",
                    ));
                }
                children.iter().try_for_each(ActionDimension::validate)
            }
        }
    }

    /// Uniform draw; a composite first picks one of its members.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            ActionDimension::Scalar(bound) => bound.sample(rng),
            ActionDimension::Composite(children) => {
                let pick = rng.gen_range(0..children.len());
                children[pick].sample(rng)
            }
        }
    }

    /// Candidate values along this dimension. `points = None` spaces each
    /// leaf at integer steps. Composite members are concatenated, not crossed.
    pub fn grid(&self, points: Option<usize>) -> Result<Array1<f32>> {
        match self {
            ActionDimension::Scalar(bound) => match points {
                None => bound.integer_grid(),
                Some(points) => bound.grid(points),
            },
            ActionDimension::Composite(children) => {
                self.validate()?;
                let mut values = Vec::new();
                for child in children {
                    values.extend(child.grid(points)?.iter().copied());
                }
                Ok(Array1::from_vec(values))
            }
        }
    }
}
