//! Agent configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "batch_size": 32,
//!   "discount": 0.95,
//!   "memory": { "kind": "deque", "capacity": 5000 },
//!   "epsilon": { "start": 1.0, "floor": 0.05, "decay_rate": 0.01 },
//!   "target_update": { "periodic": { "steps": 500 } },
//!   "scale_targets": true
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discretizer::Resolution;
use crate::error::{QgridError, Result};
use crate::memory::MemoryKind;
use crate::policy::Policy;
use crate::schedule::EpsilonSchedule;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Registered id, `"array"` or `"deque"`
    pub kind: String,
    pub capacity: Option<usize>,
    /// Restore a saved memory instead of building a new one
    pub load_path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            kind: "array".to_string(),
            capacity: None,
            load_path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonConfig {
    pub start: f32,
    pub floor: f32,
    /// Subtracted once per completed episode
    pub decay_rate: f32,
}

impl Default for EpsilonConfig {
    fn default() -> Self {
        EpsilonConfig {
            start: 1.0,
            floor: 0.1,
            decay_rate: 0.0375,
        }
    }
}

impl EpsilonConfig {
    pub fn schedule(&self) -> Result<EpsilonSchedule> {
        EpsilonSchedule::new(self.start, self.floor, self.decay_rate)
    }
}

/// How the network that produces Bellman targets follows the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUpdate {
    /// No separate target network; the actor scores next states itself
    Mirror,
    /// Separate target network, overwritten with the actor's weights every `steps` learn steps
    Periodic { steps: usize },
}

impl Default for TargetUpdate {
    fn default() -> Self {
        TargetUpdate::Periodic { steps: 1000 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub batch_size: usize,
    pub discount: f32,
    /// Only this many most recent experiences are visible to sampling
    pub memory_length: usize,
    pub memory: MemoryConfig,
    pub epsilon: EpsilonConfig,
    pub policy: Policy,
    pub target_update: TargetUpdate,
    /// Divide targets by their batch standard deviation
    pub scale_targets: bool,
    pub resolution: Resolution,
    /// Round greedy actions to the nearest integer
    pub discrete_actions: bool,
    /// First episode in which the agent learns after every step
    pub train_from_episode: usize,
    pub brain_path: Option<PathBuf>,
    pub load_brain: bool,
    /// Seed for acting and sampling randomness
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            batch_size: 64,
            discount: 0.9,
            memory_length: 100_000,
            memory: MemoryConfig::default(),
            epsilon: EpsilonConfig::default(),
            policy: Policy::default(),
            target_update: TargetUpdate::default(),
            scale_targets: false,
            resolution: Resolution::default(),
            discrete_actions: true,
            train_from_episode: 1,
            brain_path: None,
            load_brain: false,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(QgridError::configuration(
                "discount".to_string(),
                format!("must lie in [0, 1], got {}", self.discount),
            ));
        }
        if self.memory_length == 0 {
            return Err(QgridError::configuration("memory_length", "must be greater than 0"));
        }
        if let TargetUpdate::Periodic { steps: 0 } = self.target_update {
            return Err(QgridError::configuration(
                "target_update.steps",
                "must be greater than 0",
            ));
        }
        if let Resolution::Points(0) = self.resolution {
            return Err(QgridError::configuration("resolution", "needs at least one point"));
        }
        if self.load_brain && self.brain_path.is_none() {
            return Err(QgridError::configuration(
                "load_brain",
                "requires brain_path to be set",
            ));
        }
        self.memory.kind.parse::<MemoryKind>()?;
        self.epsilon.schedule()?;
        Ok(())
    }
}
