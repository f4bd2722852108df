//! # qgrid - Q-Learning over Discretized Action Spaces
//!
//! qgrid is a small reinforcement learning toolkit for agents that learn an
//! action-value function `Q(s, a)` over state-action vectors, act by scoring
//! every action on a discretized grid, and train from replayed experience.
//!
//! ## Key Features
//!
//! - **Discretized actions**: continuous bounded action dimensions become a
//!   grid of candidates; composite dimensions pool their sub-ranges
//! - **Normalization**: state-action vectors are scaled into `[0, 1]` from the
//!   environment's declared bounds
//! - **Experience replay**: bounded or unbounded memories with windowed
//!   uniform sampling and bincode persistence
//! - **Bellman targets**: next-state candidates are deduplicated across the
//!   whole batch before they are scored
//! - **Target network**: periodic hard updates, or a single self-scoring network
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qgrid::agent::DqnAgent;
//! use qgrid::config::AgentConfig;
//! use qgrid::value_function::DenseQ;
//! # fn demo<E: qgrid::env::Environment>(env: &mut E) -> qgrid::error::Result<()> {
//! let config = AgentConfig::from_json_file("agent.json")?;
//! let actor = DenseQ::new(env.mins().len(), &[25, 25], 0.001, 1)?;
//! let target = actor.clone();
//!
//! let mut agent = DqnAgent::new(config, env, actor, Some(target))?;
//! for summary in agent.run(env, 50)? {
//!     println!("episode {} reward {}", summary.episode, summary.total_reward);
//! }
//! agent.save_brain()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - The Q-learning agent and the agent capability trait
//! - [`builders`] - Builder patterns for memories and networks
//! - [`config`] - Agent configuration and JSON loading
//! - [`discretizer`] - Candidate action enumeration
//! - [`env`] - Environment capability consumed by the agent
//! - [`error`] - Error types and result handling
//! - [`memory`] - Experience replay
//! - [`metrics`] - Training statistics and test-set monitoring
//! - [`normalizer`] - Min/max scaling of state-action vectors
//! - [`policy`] - Acting policies and decision kinds
//! - [`schedule`] - Epsilon decay
//! - [`space`] - Observation and action space bounds
//! - [`trainer`] - Bellman target construction and training steps
//! - [`value_function`] - Value function capability and implementations

pub mod agent;
pub mod builders;
pub mod config;
pub mod discretizer;
pub mod env;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod normalizer;
pub mod policy;
pub mod schedule;
pub mod space;
pub mod trainer;
pub mod value_function;

#[cfg(test)]
mod tests;
