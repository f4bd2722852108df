//! Q-learning updates from replayed experience.
//!
//! A training step samples transitions, scores every candidate action of every
//! next state with the target value function, turns the best of those scores
//! into Bellman targets and fits the actor towards them. Candidate rows repeat
//! heavily across a batch (next states revisit the same grid), so they are
//! deduplicated before prediction and the results scattered back.

use std::collections::HashMap;

use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;

use crate::config::AgentConfig;
use crate::discretizer::Discretizer;
use crate::error::{QgridError, Result};
use crate::memory::{Batch, Memory};
use crate::normalizer::Normalizer;
use crate::value_function::{QFunction, TrainingRecord};

/// Predictions for a set of rows that may contain exact duplicates.
#[derive(Clone, Debug, PartialEq)]
pub struct DedupPrediction {
    /// One value per input row, in input order
    pub values: Array1<f32>,
    pub unique_rows: usize,
    /// Share of rows that repeated an earlier row, in percent
    pub duplicate_pct: f32,
}

/// Queries `q` once per distinct row and broadcasts the answers back.
///
/// Rows are compared bit-for-bit, so the result is identical to predicting
/// every row on its own.
pub fn predict_unique<Q: QFunction>(q: &mut Q, rows: ArrayView2<f32>) -> Result<DedupPrediction> {
    let total = rows.nrows();
    if total == 0 {
        return Ok(DedupPrediction {
            values: Array1::zeros(0),
            unique_rows: 0,
            duplicate_pct: 0.0,
        });
    }

    let mut seen: HashMap<Vec<u32>, usize> = HashMap::with_capacity(total);
    let mut first_rows = Vec::new();
    let mut inverse = Vec::with_capacity(total);
    for (i, row) in rows.outer_iter().enumerate() {
        let key: Vec<u32> = row.iter().map(|v| v.to_bits()).collect();
        let slot = *seen.entry(key).or_insert_with(|| {
            first_rows.push(i);
            first_rows.len() - 1
        });
        inverse.push(slot);
    }

    let uniques = rows.select(Axis(0), &first_rows);
    let unique_values = q.predict(uniques.view())?;
    if unique_values.len() != first_rows.len() {
        return Err(QgridError::data_shape(
            format!("{} predictions", first_rows.len()),
            format!("{}", unique_values.len()),
        ));
    }
    let values: Array1<f32> = inverse.iter().map(|&slot| unique_values[slot]).collect();
    let duplicate_pct = 100.0 * (total - first_rows.len()) as f32 / total as f32;

    log::debug!(
        "{} state actions, {} unique, {:.0}% duplicates",
        total,
        first_rows.len(),
        duplicate_pct
    );

    Ok(DedupPrediction {
        values,
        unique_rows: first_rows.len(),
        duplicate_pct,
    })
}

/// `reward + max(discount * next_value)` per transition, or the bare reward
/// when the transition ended its episode.
///
/// `next_values` holds the candidate scores of all transitions back to back;
/// `lengths[k]` is how many of them belong to transition `k`.
pub fn bellman_targets(
    rewards: ArrayView1<f32>,
    next_values: ArrayView1<f32>,
    lengths: &[usize],
    dones: &[bool],
    discount: f32,
) -> Result<Array1<f32>> {
    if lengths.len() != rewards.len() || dones.len() != rewards.len() {
        return Err(QgridError::data_shape(
            format!("{} lengths and dones", rewards.len()),
            format!("{} lengths, {} dones", lengths.len(), dones.len()),
        ));
    }
    let total: usize = lengths.iter().sum();
    if total != next_values.len() {
        return Err(QgridError::data_shape(
            format!("{} next values", total),
            format!("{}", next_values.len()),
        ));
    }

    let mut targets = Array1::zeros(rewards.len());
    let mut start = 0;
    for (k, (&length, &done)) in lengths.iter().zip(dones).enumerate() {
        let stop = start + length;
        let continuation = if done || length == 0 {
            0.0
        } else {
            next_values
                .slice(s![start..stop])
                .iter()
                .map(|&v| discount * v)
                .fold(f32::NEG_INFINITY, f32::max)
        };
        targets[k] = rewards[k] + continuation;
        start = stop;
    }
    Ok(targets)
}

/// Divides by the population standard deviation without shifting the mean.
/// A batch with no spread is returned unchanged.
pub fn scale_by_std(targets: ArrayView1<f32>) -> Array1<f32> {
    let std = targets.std(0.0);
    if std > 0.0 && std.is_finite() {
        &targets / std
    } else {
        log::warn!("target standard deviation is {}, leaving targets unscaled", std);
        targets.to_owned()
    }
}

/// Inputs and targets for one `improve` call.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingBatch {
    /// Normalized `state ⧺ action` rows
    pub features: Array2<f32>,
    pub targets: Array1<f32>,
    /// Targets before optional scaling
    pub unscaled_targets: Array1<f32>,
    pub duplicate_pct: f32,
}

/// Result of one training step.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainStep {
    pub record: TrainingRecord,
    /// `None` when nothing was trained
    pub batch: Option<TrainingBatch>,
}

impl TrainStep {
    fn skipped() -> Self {
        TrainStep {
            record: TrainingRecord::empty(),
            batch: None,
        }
    }
}

/// Hyperparameters of the update rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Trainer {
    pub batch_size: usize,
    pub discount: f32,
    pub memory_length: usize,
    pub scale_targets: bool,
}

impl Trainer {
    pub fn new(batch_size: usize, discount: f32, memory_length: usize, scale_targets: bool) -> Self {
        Trainer {
            batch_size,
            discount,
            memory_length,
            scale_targets,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.batch_size,
            config.discount,
            config.memory_length,
            config.scale_targets,
        )
    }

    /// Builds features and Bellman targets for `batch`, scoring next states with `q_target`.
    pub fn build_targets<Q: QFunction>(
        &self,
        batch: &Batch,
        discretizer: &Discretizer,
        normalizer: &Normalizer,
        q_target: &mut Q,
    ) -> Result<TrainingBatch> {
        let raw = concatenate(Axis(1), &[batch.observations.view(), batch.actions.view()])
            .map_err(|e| {
                QgridError::data_shape("stackable observations and actions".to_string(), e.to_string())
            })?;
        if raw.ncols() != normalizer.dim() {
            return Err(QgridError::data_shape(
                format!("{} state-action columns", normalizer.dim()),
                format!("{}", raw.ncols()),
            ));
        }
        let features = normalizer.normalize(raw.view())?;

        let mut lengths = Vec::with_capacity(batch.len());
        let mut candidate_blocks = Vec::with_capacity(batch.len());
        for next_state in batch.next_observations.outer_iter() {
            let candidates = discretizer.candidates(next_state, normalizer)?;
            lengths.push(candidates.len());
            candidate_blocks.push(candidates.state_actions);
        }
        let views: Vec<ArrayView2<f32>> = candidate_blocks.iter().map(|b| b.view()).collect();
        let next_state_actions = concatenate(Axis(0), &views).map_err(|e| {
            QgridError::data_shape("stackable candidate sets".to_string(), e.to_string())
        })?;

        let prediction = predict_unique(q_target, next_state_actions.view())?;
        let unscaled_targets = bellman_targets(
            batch.rewards.view(),
            prediction.values.view(),
            &lengths,
            &batch.dones,
            self.discount,
        )?;
        log::info!(
            "batch of {}: avg unscaled target {:.3}",
            batch.len(),
            unscaled_targets.mean().unwrap_or(0.0)
        );

        let targets = if self.scale_targets {
            scale_by_std(unscaled_targets.view())
        } else {
            unscaled_targets.clone()
        };

        Ok(TrainingBatch {
            features,
            targets,
            unscaled_targets,
            duplicate_pct: prediction.duplicate_pct,
        })
    }

    /// Fits `q_actor` to the Bellman targets of an explicit batch.
    ///
    /// With `q_target = None` the actor produces its own targets.
    pub fn learn_batch<Q: QFunction>(
        &self,
        batch: &Batch,
        discretizer: &Discretizer,
        normalizer: &Normalizer,
        q_actor: &mut Q,
        q_target: Option<&mut Q>,
    ) -> Result<TrainStep> {
        if batch.is_empty() {
            return Ok(TrainStep::skipped());
        }
        let training = match q_target {
            Some(target) => self.build_targets(batch, discretizer, normalizer, target)?,
            None => self.build_targets(batch, discretizer, normalizer, q_actor)?,
        };
        log::debug!(
            "improving actor with inputs {:?} and targets {:?}",
            training.features.dim(),
            training.targets.dim()
        );
        let record = q_actor.improve(training.features.view(), training.targets.view())?;
        log::info!("training step done, loss {:.5}", record.final_loss());

        Ok(TrainStep {
            record,
            batch: Some(training),
        })
    }

    /// One Q-learning update of `q_actor` from a sample of `memory`.
    ///
    /// A batch size of zero is a no-op that reports zero loss.
    pub fn train_model<Q: QFunction, R: Rng + ?Sized>(
        &self,
        memory: &Memory,
        discretizer: &Discretizer,
        normalizer: &Normalizer,
        q_actor: &mut Q,
        q_target: Option<&mut Q>,
        rng: &mut R,
    ) -> Result<TrainStep> {
        if self.batch_size == 0 {
            return Ok(TrainStep::skipped());
        }
        if memory.is_empty() {
            return Err(QgridError::State(
                "cannot train before any experience is recorded".to_string(),
            ));
        }

        let sample = memory.sample_with(self.batch_size, self.memory_length, rng);
        let batch = Batch::from_experiences(&sample)?;
        self.learn_batch(&batch, discretizer, normalizer, q_actor, q_target)
    }
}
