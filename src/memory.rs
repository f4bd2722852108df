//! Experience replay memory.
//!
//! Experiences are kept in insertion order. A capped memory drops its oldest
//! entry once full; sampling additionally looks only at a trailing window so
//! older entries can stay stored without being replayed.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::error::{QgridError, Result};
use crate::policy::Choice;

/// A single recorded transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    /// `state ⧺ action`
    pub state_action: Array1<f32>,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub episode: usize,
    pub step: usize,
    pub epsilon: f32,
    pub choice: Choice,
    pub done: bool,
}

impl Experience {
    /// Builds an experience, deriving `state_action` from `state` and `action`.
    pub fn new(
        state: Array1<f32>,
        action: Array1<f32>,
        reward: f32,
        next_state: Array1<f32>,
        done: bool,
    ) -> Self {
        let state_action = state.iter().chain(action.iter()).copied().collect();
        Experience {
            state,
            action,
            state_action,
            reward,
            next_state,
            episode: 0,
            step: 0,
            epsilon: 0.0,
            choice: Choice::Random,
            done,
        }
    }

    pub fn with_context(mut self, episode: usize, step: usize, epsilon: f32, choice: Choice) -> Self {
        self.episode = episode;
        self.step = step;
        self.epsilon = epsilon;
        self.choice = choice;
        self
    }
}

/// Storage strategy registered under a string id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Grows without bound unless a capacity is given
    Array,
    /// Fixed-capacity ring
    Deque,
}

impl FromStr for MemoryKind {
    type Err = QgridError;

    fn from_str(id: &str) -> std::result::Result<Self, Self::Err> {
        match id {
            "array" => Ok(MemoryKind::Array),
            "deque" => Ok(MemoryKind::Deque),
            other => Err(QgridError::UnknownId {
                kind: "memory".to_string(),
                id: other.to_string(),
            }),
        }
    }
}

/// Column-stacked view of a set of experiences.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub observations: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub next_observations: Array2<f32>,
    pub dones: Vec<bool>,
}

impl Batch {
    /// Every field must have the same number of rows.
    pub fn new(
        observations: Array2<f32>,
        actions: Array2<f32>,
        rewards: Array1<f32>,
        next_observations: Array2<f32>,
        dones: Vec<bool>,
    ) -> Result<Self> {
        let rows = observations.nrows();
        let counts = [
            ("actions", actions.nrows()),
            ("rewards", rewards.len()),
            ("next_observations", next_observations.nrows()),
            ("dones", dones.len()),
        ];
        for (name, count) in counts {
            if count != rows {
                return Err(QgridError::data_shape(
                    format!("{} rows of {}", rows, name),
                    format!("{}", count),
                ));
            }
        }
        if next_observations.ncols() != observations.ncols() {
            return Err(QgridError::data_shape(
                format!("{} next_observation columns", observations.ncols()),
                format!("{}", next_observations.ncols()),
            ));
        }
        Ok(Batch {
            observations,
            actions,
            rewards,
            next_observations,
            dones,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.nrows() == 0
    }

    /// Stacks experiences row by row, checking that vector lengths agree.
    pub fn from_experiences(experiences: &[&Experience]) -> Result<Self> {
        let (state_dim, action_dim) = match experiences.first() {
            Some(first) => (first.state.len(), first.action.len()),
            None => (0, 0),
        };
        let rows = experiences.len();
        let mut observations = Array2::zeros((rows, state_dim));
        let mut actions = Array2::zeros((rows, action_dim));
        let mut next_observations = Array2::zeros((rows, state_dim));
        let mut rewards = Array1::zeros(rows);
        let mut dones = Vec::with_capacity(rows);

        for (i, exp) in experiences.iter().enumerate() {
            if exp.state.len() != state_dim
                || exp.next_state.len() != state_dim
                || exp.action.len() != action_dim
            {
                return Err(QgridError::data_shape(
                    format!("state {} / action {}", state_dim, action_dim),
                    format!(
                        "state {} / next_state {} / action {} at row {}",
                        exp.state.len(),
                        exp.next_state.len(),
                        exp.action.len(),
                        i
                    ),
                ));
            }
            observations.row_mut(i).assign(&exp.state);
            actions.row_mut(i).assign(&exp.action);
            next_observations.row_mut(i).assign(&exp.next_state);
            rewards[i] = exp.reward;
            dones.push(exp.done);
        }

        Batch::new(observations, actions, rewards, next_observations, dones)
    }
}

/// Ordered store of experiences, owned by a single agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    kind: MemoryKind,
    capacity: Option<usize>,
    experiences: VecDeque<Experience>,
}

impl Memory {
    pub fn new(kind: MemoryKind, capacity: Option<usize>) -> Result<Self> {
        match (kind, capacity) {
            (_, Some(0)) => Err(QgridError::configuration(
                "memory.capacity",
                "must be greater than 0",
            )),
            (MemoryKind::Deque, None) => Err(QgridError::configuration(
                "memory.capacity",
                "a deque memory needs a capacity",
            )),
            _ => Ok(Memory {
                kind,
                capacity,
                experiences: VecDeque::with_capacity(capacity.unwrap_or(0)),
            }),
        }
    }

    /// Unbounded array memory.
    pub fn unbounded() -> Self {
        Memory {
            kind: MemoryKind::Array,
            capacity: None,
            experiences: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn remember(&mut self, experience: Experience) {
        if let Some(capacity) = self.capacity {
            while self.experiences.len() >= capacity {
                self.experiences.pop_front();
            }
        }
        self.experiences.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Experience> {
        self.experiences.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.experiences.iter()
    }

    /// Uniform sample without replacement from the `window` most recent
    /// entries. The size is clamped to what the window holds.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        window: usize,
        rng: &mut R,
    ) -> Vec<&Experience> {
        let window = window.min(self.experiences.len());
        let offset = self.experiences.len() - window;
        let amount = batch_size.min(window);
        index::sample(rng, window, amount)
            .into_iter()
            .map(|i| &self.experiences[offset + i])
            .collect()
    }

    pub fn sample(&self, batch_size: usize, window: usize) -> Vec<&Experience> {
        self.sample_with(batch_size, window, &mut rand::thread_rng())
    }

    /// Writes next to `path` first and renames, so a crash never leaves a
    /// truncated memory file behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = bincode::serialize(self)?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, serialized)?;
        fs::rename(&staging, path)?;
        log::info!("saved {} experiences to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        let memory: Self = bincode::deserialize(&data)?;
        Ok(memory)
    }
}

impl std::ops::Index<usize> for Memory {
    type Output = Experience;

    fn index(&self, index: usize) -> &Experience {
        &self.experiences[index]
    }
}

/// Builds a memory from configuration, or restores one from `load_path`.
pub fn make_memory(config: &MemoryConfig) -> Result<Memory> {
    if let Some(path) = &config.load_path {
        log::info!("loading memory from {}", path.display());
        return Memory::load(path);
    }
    let kind: MemoryKind = config.kind.parse()?;
    log::info!("making new {:?} memory (capacity {:?})", kind, config.capacity);
    Memory::new(kind, config.capacity)
}

/// Discounted return at every step of an episode, accumulated backwards.
pub fn calculate_returns(rewards: &[f32], discount: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;
    for (i, &reward) in rewards.iter().enumerate().rev() {
        running = reward + discount * running;
        returns[i] = running;
    }
    returns
}
