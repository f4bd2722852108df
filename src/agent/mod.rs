//! # Q-Learning Agents Module
//!
//! Agents act in an [`Environment`](crate::env::Environment) by scoring every
//! discretized action with a value function, and learn by replaying stored
//! experience.
//!
//! ## Core Concepts
//!
//! - **State-action vector**: an observation concatenated with an action,
//!   normalized into `[0, 1]`; this is what the value function scores
//! - **Epsilon-greedy**: act randomly with probability epsilon, otherwise pick
//!   the candidate action with the highest predicted value
//! - **Experience replay**: transitions go into a [`Memory`](crate::memory::Memory)
//!   and training samples from it
//! - **Target network**: a lagged copy of the actor that scores next states
//!
//! ## Available Agents
//!
//! - **DqnAgent**: Q-learning with experience replay over a discretized action
//!   space, with either a periodically synchronized target network or a single
//!   network that scores its own targets
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qgrid::agent::{Agent, DqnAgentBuilder};
//! use qgrid::config::TargetUpdate;
//! use qgrid::value_function::DenseQ;
//! # fn demo<E: qgrid::env::Environment>(env: &mut E) -> qgrid::error::Result<()> {
//! let actor = DenseQ::new(env.mins().len(), &[25, 25], 0.01, 1)?;
//!
//! let mut agent = DqnAgentBuilder::new()
//!     .batch_size(32)
//!     .discount(0.9)
//!     .target_update(TargetUpdate::Periodic { steps: 500 })
//!     .q_target(actor.clone())
//!     .q_actor(actor)
//!     .build(env)?;
//!
//! let state = env.reset()?;
//! let decision = agent.act(state.view())?;
//! # Ok(())
//! # }
//! ```

pub mod traits;

mod dqn;
pub use dqn::{DqnAgent, DqnAgentBuilder, EpisodeSummary};
pub use traits::{Agent, Decision};
