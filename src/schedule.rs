use serde::{Deserialize, Serialize};

use crate::error::{QgridError, Result};

/// Clamped linear epsilon decay, advanced once per completed episode.
///
/// `epsilon(e) = max(floor, start - decay_rate * e)`. Once epsilon has been
/// forced to exactly zero it stays there until [`EpsilonSchedule::reset`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    start: f32,
    floor: f32,
    decay_rate: f32,
    epsilon: f32,
    episodes: usize,
}

impl EpsilonSchedule {
    pub fn new(start: f32, floor: f32, decay_rate: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&floor) || floor > start {
            return Err(QgridError::configuration(
                "epsilon.floor".to_string(),
                format!("must lie in [0, start], got {} with start {}", floor, start),
            ));
        }
        if !(decay_rate >= 0.0) {
            return Err(QgridError::configuration(
                "epsilon.decay_rate".to_string(),
                format!("must be non-negative, got {}", decay_rate),
            ));
        }
        Ok(EpsilonSchedule {
            start,
            floor,
            decay_rate,
            epsilon: start,
            episodes: 0,
        })
    }

    /// Reaches `floor` after `decay_episodes` episodes.
    pub fn over_episodes(start: f32, floor: f32, decay_episodes: usize) -> Result<Self> {
        let rate = if decay_episodes == 0 {
            start - floor
        } else {
            (start - floor) / decay_episodes as f32
        };
        Self::new(start, floor, rate)
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Value the schedule prescribes after `episode` completed episodes.
    pub fn value_at(&self, episode: usize) -> f32 {
        (self.start - self.decay_rate * episode as f32).max(self.floor)
    }

    /// Records a completed episode and returns the epsilon for the next one.
    pub fn decay(&mut self) -> f32 {
        self.episodes += 1;
        if self.epsilon != 0.0 {
            self.epsilon = self.value_at(self.episodes);
        }
        self.epsilon
    }

    /// Pins epsilon to zero; further decay leaves it there.
    pub fn force_zero(&mut self) {
        self.epsilon = 0.0;
    }

    pub fn reset(&mut self) {
        self.epsilon = self.start;
        self.episodes = 0;
    }
}
