use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QgridError;

/// Acting policy selected by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Always the highest allowed action on every dimension
    Naive,
    /// Random with probability epsilon, otherwise argmax over the value function
    EpsilonGreedy,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::EpsilonGreedy
    }
}

impl FromStr for Policy {
    type Err = QgridError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        match id {
            "naive" => Ok(Policy::Naive),
            "epsilon_greedy" | "e-greedy" => Ok(Policy::EpsilonGreedy),
            other => Err(QgridError::UnknownId {
                kind: "policy".to_string(),
                id: other.to_string(),
            }),
        }
    }
}

/// How a single action was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    Naive,
    Random,
    Greedy,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Choice::Naive => "NAIVE",
            Choice::Random => "RANDOM",
            Choice::Greedy => "GREEDY",
        };
        f.write_str(name)
    }
}
