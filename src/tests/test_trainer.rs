use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::discretizer::{Discretizer, Resolution};
use crate::error::QgridError;
use crate::memory::{Batch, Experience, Memory, MemoryKind};
use crate::normalizer::Normalizer;
use crate::tests::{LineEnv, RecordingQ};
use crate::trainer::{bellman_targets, predict_unique, scale_by_std, Trainer};
use crate::value_function::QFunction;

fn line_setup() -> (Discretizer, Normalizer) {
    let env = LineEnv::new(10);
    (
        Discretizer::from_env(&env, Resolution::Integer).unwrap(),
        Normalizer::from_env(&env).unwrap(),
    )
}

fn single_transition(done: bool) -> Batch {
    Batch::new(
        array![[5.0]],
        array![[1.0]],
        array![1.0],
        array![[6.0]],
        vec![done],
    )
    .unwrap()
}

#[test]
fn test_single_transition_target() {
    let (discretizer, normalizer) = line_setup();
    let trainer = Trainer::new(1, 0.9, 100, false);
    let mut actor = RecordingQ::new(array![0.0, 0.0]);
    let mut target = RecordingQ::new(array![1.0, 1.0]);

    let step = trainer
        .learn_batch(
            &single_transition(false),
            &discretizer,
            &normalizer,
            &mut actor,
            Some(&mut target),
        )
        .unwrap();

    // Next-state candidates score 0.6, 1.1 and 1.6
    assert_eq!(target.predicted_rows, 3);
    assert_eq!(actor.predicted_rows, 0);
    assert_eq!(actor.improve_calls.len(), 1);
    let (features, targets) = &actor.improve_calls[0];
    assert_eq!(features, &array![[0.5, 0.5]]);
    assert_eq!(targets.len(), 1);
    assert!((targets[0] - 2.44).abs() < 1e-5);
    assert_eq!(step.record.final_loss(), 0.5);
    assert!(step.batch.is_some());
}

#[test]
fn test_terminal_target_is_reward() {
    let (discretizer, normalizer) = line_setup();
    let trainer = Trainer::new(1, 0.9, 100, false);
    let mut actor = RecordingQ::new(array![0.0, 0.0]);
    let mut target = RecordingQ::new(array![1.0, 1.0]);

    trainer
        .learn_batch(
            &single_transition(true),
            &discretizer,
            &normalizer,
            &mut actor,
            Some(&mut target),
        )
        .unwrap();
    assert_eq!(actor.improve_calls[0].1, array![1.0]);
}

#[test]
fn test_mirror_mode_scores_with_actor() {
    let (discretizer, normalizer) = line_setup();
    let trainer = Trainer::new(1, 0.5, 100, false);
    let mut actor = RecordingQ::new(array![1.0, 1.0]);

    trainer
        .learn_batch(&single_transition(false), &discretizer, &normalizer, &mut actor, None)
        .unwrap();

    assert_eq!(actor.predicted_rows, 3);
    let target = actor.improve_calls[0].1[0];
    assert!((target - 1.8).abs() < 1e-5);
}

#[test]
fn test_empty_batch_is_skipped() {
    let (discretizer, normalizer) = line_setup();
    let trainer = Trainer::new(4, 0.9, 100, false);
    let batch = Batch::new(
        Array2::zeros((0, 1)),
        Array2::zeros((0, 1)),
        Array1::zeros(0),
        Array2::zeros((0, 1)),
        vec![],
    )
    .unwrap();
    let mut actor = RecordingQ::new(array![1.0, 1.0]);

    let step = trainer
        .learn_batch(&batch, &discretizer, &normalizer, &mut actor, None)
        .unwrap();
    assert!(step.batch.is_none());
    assert_eq!(step.record.final_loss(), 0.0);
    assert!(actor.improve_calls.is_empty());
}

#[test]
fn test_dedup_matches_direct_prediction() {
    let rows = array![
        [0.1, 0.2],
        [0.3, 0.4],
        [0.1, 0.2],
        [0.1, 0.2],
        [0.5, 0.5],
        [0.3, 0.4]
    ];
    let mut direct = RecordingQ::new(array![2.0, -1.0]);
    let mut deduped = direct.clone();

    let expected = direct.predict(rows.view()).unwrap();
    let prediction = predict_unique(&mut deduped, rows.view()).unwrap();

    assert_eq!(prediction.values, expected);
    assert_eq!(prediction.unique_rows, 3);
    assert_eq!(deduped.predicted_rows, 3);
    assert!((prediction.duplicate_pct - 50.0).abs() < 1e-4);
}

#[test]
fn test_dedup_of_nothing() {
    let mut q = RecordingQ::new(array![1.0]);
    let prediction = predict_unique(&mut q, Array2::zeros((0, 1)).view()).unwrap();
    assert!(prediction.values.is_empty());
    assert_eq!(q.predicted_rows, 0);
}

#[test]
fn test_bellman_targets_segments() {
    let targets = bellman_targets(
        array![1.0, 2.0, 3.0].view(),
        array![1.0, 4.0, 2.0, 10.0, 10.0].view(),
        &[2, 1, 2],
        &[false, false, true],
        0.5,
    )
    .unwrap();
    assert_eq!(targets, array![3.0, 3.0, 3.0]);

    let mismatch = bellman_targets(
        array![1.0].view(),
        array![1.0, 2.0].view(),
        &[1],
        &[false],
        0.5,
    );
    assert!(matches!(mismatch, Err(QgridError::DataShape { .. })));
}

#[test]
fn test_negative_discount_products_take_max() {
    let targets = bellman_targets(
        array![0.0].view(),
        array![-4.0, -2.0].view(),
        &[2],
        &[false],
        0.5,
    )
    .unwrap();
    assert_eq!(targets, array![-1.0]);
}

#[test]
fn test_scale_by_std() {
    let scaled = scale_by_std(array![1.0, 3.0].view());
    assert_eq!(scaled, array![1.0, 3.0]);

    let scaled = scale_by_std(array![2.0, 6.0].view());
    assert_eq!(scaled, array![1.0, 3.0]);

    let flat = scale_by_std(array![4.0, 4.0, 4.0].view());
    assert_eq!(flat, array![4.0, 4.0, 4.0]);
}

#[test]
fn test_scaled_targets_keep_unscaled_copy() {
    let (discretizer, normalizer) = line_setup();
    let trainer = Trainer::new(2, 0.0, 100, true);
    let batch = Batch::new(
        array![[5.0], [5.0]],
        array![[1.0], [1.0]],
        array![2.0, 6.0],
        array![[6.0], [6.0]],
        vec![false, false],
    )
    .unwrap();
    let mut actor = RecordingQ::new(array![0.0, 0.0]);

    let step = trainer
        .learn_batch(&batch, &discretizer, &normalizer, &mut actor, None)
        .unwrap();
    let training = step.batch.unwrap();
    assert_eq!(training.unscaled_targets, array![2.0, 6.0]);
    assert_eq!(training.targets, array![1.0, 3.0]);
    assert_eq!(actor.improve_calls[0].1, array![1.0, 3.0]);
}

#[test]
fn test_train_model_samples_memory() {
    let (discretizer, normalizer) = line_setup();
    let mut memory = Memory::new(MemoryKind::Array, None).unwrap();
    for position in 0..8 {
        let state = array![position as f32];
        memory.remember(Experience::new(
            state.clone(),
            array![2.0],
            0.1,
            state + 1.0,
            false,
        ));
    }
    let trainer = Trainer::new(4, 0.9, 100, false);
    let mut actor = RecordingQ::new(array![1.0, 0.0]);
    let mut target = actor.clone();
    let mut rng = StdRng::seed_from_u64(7);

    trainer
        .train_model(&memory, &discretizer, &normalizer, &mut actor, Some(&mut target), &mut rng)
        .unwrap();

    assert_eq!(actor.improve_calls.len(), 1);
    assert_eq!(actor.improve_calls[0].0.dim(), (4, 2));
    // 4 next states, 3 candidates each, all distinct
    assert_eq!(target.predicted_rows, 12);
}

#[test]
fn test_train_model_edge_cases() {
    let (discretizer, normalizer) = line_setup();
    let memory = Memory::unbounded();
    let mut actor = RecordingQ::new(array![1.0, 0.0]);
    let mut rng = StdRng::seed_from_u64(0);

    let skipped = Trainer::new(0, 0.9, 10, false)
        .train_model(&memory, &discretizer, &normalizer, &mut actor, None, &mut rng)
        .unwrap();
    assert!(skipped.batch.is_none());

    let result = Trainer::new(8, 0.9, 10, false).train_model(
        &memory,
        &discretizer,
        &normalizer,
        &mut actor,
        None,
        &mut rng,
    );
    assert!(matches!(result, Err(QgridError::State(_))));
}
