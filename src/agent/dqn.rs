use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::traits::{Agent, Decision};
use crate::config::{AgentConfig, EpsilonConfig, MemoryConfig, TargetUpdate};
use crate::discretizer::{Discretizer, Resolution};
use crate::env::Environment;
use crate::error::{QgridError, Result};
use crate::memory::{make_memory, Batch, Experience, Memory};
use crate::metrics::{MetricsTracker, StepInfo, TestSet};
use crate::normalizer::Normalizer;
use crate::policy::{Choice, Policy};
use crate::schedule::EpsilonSchedule;
use crate::space::ActionDimension;
use crate::trainer::{TrainStep, Trainer};
use crate::value_function::{QFunction, TrainingRecord};

const Q_ACTOR_FILE: &str = "q_actor.bin";
const MEMORY_FILE: &str = "memory.bin";
const METRICS_FILE: &str = "metrics.json";

/// Totals for one finished episode
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub total_reward: f32,
    pub steps: usize,
    /// Loss of the last training step in the episode, zero if none ran
    pub final_loss: f32,
    /// Exploration rate for the next episode
    pub epsilon: f32,
}

/// Q-learning agent over a discretized action space with experience replay
/// and an optional lagged target network.
///
/// # Example
///
/// ```rust,no_run
/// use qgrid::agent::DqnAgent;
/// use qgrid::config::AgentConfig;
/// use qgrid::value_function::DenseQ;
/// # fn demo<E: qgrid::env::Environment>(env: &mut E) -> qgrid::error::Result<()> {
/// let input_dim = env.mins().len();
/// let actor = DenseQ::new(input_dim, &[25, 25], 0.01, 1)?;
/// let target = actor.clone();
///
/// let mut agent = DqnAgent::new(AgentConfig::default(), env, actor, Some(target))?;
/// let summaries = agent.run(env, 10)?;
/// # Ok(())
/// # }
/// ```
pub struct DqnAgent<Q: QFunction> {
    config: AgentConfig,
    trainer: Trainer,
    discretizer: Discretizer,
    normalizer: Normalizer,
    action_space: Vec<ActionDimension>,
    state_dim: usize,

    /// Network that acts and learns
    pub q_actor: Q,

    /// Network that scores next states; `None` in mirror mode
    pub q_target: Option<Q>,

    memory: Memory,
    schedule: EpsilonSchedule,
    tracker: MetricsTracker,
    test_set: Option<TestSet>,

    /// Training steps that reached the value function
    learn_steps: usize,
    started: Instant,
    rng: StdRng,
}

impl<Q: QFunction> DqnAgent<Q> {
    pub fn new<E: Environment + ?Sized>(
        config: AgentConfig,
        env: &E,
        q_actor: Q,
        q_target: Option<Q>,
    ) -> Result<Self> {
        config.validate()?;

        let normalizer = Normalizer::from_env(env)?;
        let discretizer = Discretizer::from_env(env, config.resolution)?;
        if config.discrete_actions && !discretizer.is_integral() {
            return Err(QgridError::configuration(
                "discrete_actions".to_string(),
                format!(
                    "{:?} grid over the action space has non-integer points",
                    config.resolution
                ),
            ));
        }
        let action_space = env.action_space().to_vec();
        action_space.iter().try_for_each(ActionDimension::validate)?;

        let q_target = match (config.target_update, q_target) {
            (TargetUpdate::Mirror, Some(_)) => {
                log::warn!("target network supplied in mirror mode, ignoring it");
                None
            }
            (TargetUpdate::Mirror, None) => None,
            (TargetUpdate::Periodic { .. }, Some(mut target)) => {
                target.copy_weights(&q_actor)?;
                Some(target)
            }
            (TargetUpdate::Periodic { .. }, None) => {
                return Err(QgridError::configuration(
                    "target_update",
                    "periodic updates need a target value function",
                ));
            }
        };
        log::info!("target network mode: {:?}", config.target_update);

        let memory = make_memory(&config.memory)?;
        let schedule = config.epsilon.schedule()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut agent = DqnAgent {
            trainer: Trainer::from_config(&config),
            state_dim: env.observation_space().len(),
            config,
            discretizer,
            normalizer,
            action_space,
            q_actor,
            q_target,
            memory,
            schedule,
            tracker: MetricsTracker::default(),
            test_set: None,
            learn_steps: 0,
            started: Instant::now(),
            rng,
        };

        if agent.config.load_brain {
            agent.load_brain()?;
        }
        Ok(agent)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn remember(&mut self, experience: Experience) {
        self.memory.remember(experience);
    }

    pub fn schedule(&self) -> &EpsilonSchedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut EpsilonSchedule {
        &mut self.schedule
    }

    pub fn epsilon(&self) -> f32 {
        self.schedule.epsilon()
    }

    pub fn tracker(&self) -> &MetricsTracker {
        &self.tracker
    }

    pub fn discretizer(&self) -> &Discretizer {
        &self.discretizer
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }

    pub fn set_test_set(&mut self, test_set: TestSet) {
        self.test_set = Some(test_set);
    }

    pub fn load_test_set<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.test_set = Some(TestSet::from_csv(path, &self.normalizer)?);
        Ok(())
    }

    fn check_observation(&self, observation: ArrayView1<f32>) -> Result<()> {
        if observation.len() != self.state_dim {
            return Err(QgridError::configuration(
                "observation".to_string(),
                format!(
                    "agent expects {} values, environment produced {}",
                    self.state_dim,
                    observation.len()
                ),
            ));
        }
        Ok(())
    }

    fn check_env<E: Environment + ?Sized>(&self, env: &E) -> Result<()> {
        if env.observation_space().len() != self.state_dim
            || env.action_space().len() != self.action_space.len()
        {
            return Err(QgridError::configuration(
                "environment".to_string(),
                format!(
                    "agent built for {} observations / {} actions, environment has {} / {}",
                    self.state_dim,
                    self.action_space.len(),
                    env.observation_space().len(),
                    env.action_space().len()
                ),
            ));
        }
        Ok(())
    }

    /// Argmax over every candidate action; ties go to the first candidate.
    /// The returned action is the grid row that was scored.
    fn greedy_action(&mut self, observation: ArrayView1<f32>) -> Result<(Array1<f32>, f32)> {
        let candidates = self.discretizer.candidates(observation, &self.normalizer)?;
        let estimates = self.q_actor.predict(candidates.state_actions.view())?;
        if estimates.len() != candidates.len() {
            return Err(QgridError::data_shape(
                format!("{} estimates", candidates.len()),
                format!("{}", estimates.len()),
            ));
        }

        let mut best: Option<(usize, f32)> = None;
        for (i, &value) in estimates.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((i, value)),
            }
        }
        let (index, max_q) = best.ok_or_else(|| {
            QgridError::ValueFunction("every Q estimate was NaN".to_string())
        })?;

        Ok((candidates.actions.row(index).to_owned(), max_q))
    }

    /// Copies the actor's weights into the target network.
    pub fn update_target_network(&mut self) -> Result<()> {
        if let Some(target) = self.q_target.as_mut() {
            log::info!("updating q_target by copying weights from q_actor");
            target.copy_weights(&self.q_actor)?;
        }
        Ok(())
    }

    fn after_training(&mut self, step: TrainStep) -> Result<TrainingRecord> {
        let Some(batch) = step.batch else {
            return Ok(step.record);
        };
        self.learn_steps += 1;
        self.tracker.record_loss(step.record.final_loss());
        self.tracker.record_duplicate_pct(batch.duplicate_pct);
        self.tracker.record_targets(
            batch.unscaled_targets.as_slice().unwrap_or(&[]),
            batch.targets.as_slice().unwrap_or(&[]),
        );

        if let TargetUpdate::Periodic { steps } = self.config.target_update {
            if self.learn_steps % steps == 0 {
                self.update_target_network()?;
            }
        }
        Ok(step.record)
    }

    /// One training step on a sample of this agent's memory.
    pub fn train_model(&mut self) -> Result<TrainingRecord> {
        let step = self.trainer.train_model(
            &self.memory,
            &self.discretizer,
            &self.normalizer,
            &mut self.q_actor,
            self.q_target.as_mut(),
            &mut self.rng,
        )?;
        self.after_training(step)
    }

    /// Plays one episode to completion, learning after every step once
    /// `train_from_episode` is reached. Epsilon decays when the episode ends.
    pub fn run_episode<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        episode: usize,
    ) -> Result<EpisodeSummary> {
        self.check_env(env)?;
        log::info!("starting episode {}", episode);

        let mut state = env.reset()?;
        let mut final_loss = 0.0;
        loop {
            self.check_observation(state.view())?;
            let decision = self.act(state.view())?;
            let step = env.step(decision.action.view())?;

            let experience = Experience {
                state: state.clone(),
                action: decision.action.clone(),
                state_action: decision.state_action,
                reward: step.reward,
                next_state: step.next_state.clone(),
                episode,
                step: env.steps(),
                epsilon: decision.epsilon,
                choice: decision.choice,
                done: step.done,
            };
            self.memory.remember(experience);

            let loss = if episode >= self.config.train_from_episode {
                self.train_model()?.final_loss()
            } else {
                0.0
            };
            final_loss = loss;

            let mean_test_value = match &self.test_set {
                Some(test_set) => Some(test_set.mean_value(&mut self.q_actor)?),
                None => None,
            };
            self.tracker.step(
                step.reward,
                StepInfo {
                    elapsed: self.started.elapsed().as_secs_f64(),
                    mean_test_value,
                    loss,
                },
            );
            log::debug!(
                "episode {} - step {} - choice {} - action {} - reward {} - epsilon {:.3}",
                episode,
                env.steps(),
                decision.choice,
                decision.action,
                step.reward,
                decision.epsilon
            );

            state = step.next_state;
            if step.done {
                break;
            }
        }

        let (total_reward, steps) = self.tracker.end_episode();
        let epsilon = self.schedule.decay();
        log::info!(
            "finished episode {} - reward {:.3} over {} steps - epsilon now {:.3} - run time {:.1}s",
            episode,
            total_reward,
            steps,
            epsilon,
            self.started.elapsed().as_secs_f64()
        );

        Ok(EpisodeSummary {
            episode,
            total_reward,
            steps,
            final_loss,
            epsilon,
        })
    }

    /// Runs `episodes` episodes back to back.
    pub fn run<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        episodes: usize,
    ) -> Result<Vec<EpisodeSummary>> {
        (0..episodes)
            .map(|episode| self.run_episode(env, episode))
            .collect()
    }

    fn brain_dir(&self) -> Result<PathBuf> {
        self.config
            .brain_path
            .clone()
            .ok_or_else(|| QgridError::State("no brain_path configured".to_string()))
    }

    /// Saves the actor, the memory and the metrics under `brain_path`. The
    /// target network is not saved; loading initializes it from the actor.
    pub fn save_brain(&self) -> Result<()> {
        let dir = self.brain_dir()?;
        fs::create_dir_all(&dir)?;
        self.q_actor.save(&dir.join(Q_ACTOR_FILE))?;
        self.memory.save(dir.join(MEMORY_FILE))?;
        self.tracker.save(dir.join(METRICS_FILE))?;
        log::info!("saved brain to {}", dir.display());
        Ok(())
    }

    pub fn load_brain(&mut self) -> Result<()> {
        let dir = self.brain_dir()?;
        self.q_actor.load(&dir.join(Q_ACTOR_FILE))?;
        self.update_target_network()?;
        let memory_path = dir.join(MEMORY_FILE);
        if memory_path.exists() {
            self.memory = Memory::load(memory_path)?;
        }
        let metrics_path = dir.join(METRICS_FILE);
        if metrics_path.exists() {
            self.tracker.load(metrics_path)?;
        }
        log::info!("loaded brain from {}", dir.display());
        Ok(())
    }
}

impl<Q: QFunction> Agent for DqnAgent<Q> {
    fn act(&mut self, observation: ArrayView1<f32>) -> Result<Decision> {
        self.check_observation(observation)?;
        let epsilon = self.schedule.epsilon();

        let explore = match self.config.policy {
            Policy::Naive => false,
            Policy::EpsilonGreedy => self.rng.gen::<f32>() < epsilon,
        };

        let (action, choice, max_q): (Array1<f32>, Choice, Option<f32>) = match self.config.policy {
            Policy::Naive => (
                self.action_space.iter().map(ActionDimension::high).collect(),
                Choice::Naive,
                None,
            ),
            Policy::EpsilonGreedy if explore => {
                let rng = &mut self.rng;
                let action = if self.config.discrete_actions {
                    self.discretizer.sample_action(rng)
                } else {
                    self.action_space
                        .iter()
                        .map(|dim| dim.sample(&mut *rng))
                        .collect()
                };
                (action, Choice::Random, None)
            }
            Policy::EpsilonGreedy => {
                let (action, max_q) = self.greedy_action(observation)?;
                log::debug!("epsilon {:.3} - acting greedily - max Q {:.3}", epsilon, max_q);
                (action, Choice::Greedy, Some(max_q))
            }
        };
        self.tracker.record_decision(epsilon, choice, max_q);

        let state_action = observation.iter().chain(action.iter()).copied().collect();
        Ok(Decision {
            action,
            state_action,
            choice,
            epsilon,
            max_q,
        })
    }

    fn learn(&mut self, batch: &Batch) -> Result<TrainingRecord> {
        let step = self.trainer.learn_batch(
            batch,
            &self.discretizer,
            &self.normalizer,
            &mut self.q_actor,
            self.q_target.as_mut(),
        )?;
        self.after_training(step)
    }

    fn reset(&mut self) -> Result<()> {
        self.q_actor.reset_weights();
        if let Some(target) = self.q_target.as_mut() {
            target.reset_weights();
        }
        self.update_target_network()?;
        self.schedule.reset();
        self.learn_steps = 0;
        Ok(())
    }

    fn exploration_rate(&self) -> Option<f32> {
        Some(self.schedule.epsilon())
    }
}

/// Builder pattern for DqnAgent
pub struct DqnAgentBuilder<Q: QFunction> {
    config: AgentConfig,
    q_actor: Option<Q>,
    q_target: Option<Q>,
}

impl<Q: QFunction> DqnAgentBuilder<Q> {
    pub fn new() -> Self {
        DqnAgentBuilder {
            config: AgentConfig::default(),
            q_actor: None,
            q_target: None,
        }
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn discount(mut self, discount: f32) -> Self {
        self.config.discount = discount;
        self
    }

    pub fn memory_length(mut self, memory_length: usize) -> Self {
        self.config.memory_length = memory_length;
        self
    }

    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    pub fn epsilon(mut self, start: f32, floor: f32, decay_rate: f32) -> Self {
        self.config.epsilon = EpsilonConfig {
            start,
            floor,
            decay_rate,
        };
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn target_update(mut self, target_update: TargetUpdate) -> Self {
        self.config.target_update = target_update;
        self
    }

    pub fn scale_targets(mut self, scale: bool) -> Self {
        self.config.scale_targets = scale;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    pub fn train_from_episode(mut self, episode: usize) -> Self {
        self.config.train_from_episode = episode;
        self
    }

    pub fn brain_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.brain_path = Some(path.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn q_actor(mut self, q: Q) -> Self {
        self.q_actor = Some(q);
        self
    }

    pub fn q_target(mut self, q: Q) -> Self {
        self.q_target = Some(q);
        self
    }

    pub fn build<E: Environment + ?Sized>(self, env: &E) -> Result<DqnAgent<Q>> {
        let q_actor = self.q_actor.ok_or_else(|| {
            QgridError::configuration("q_actor", "an actor value function must be specified")
        })?;
        DqnAgent::new(self.config, env, q_actor, self.q_target)
    }
}

impl<Q: QFunction> Default for DqnAgentBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}
