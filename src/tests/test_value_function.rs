use ndarray::{array, Array2};
use tempfile::tempdir;

use crate::error::QgridError;
use crate::value_function::{DenseQ, LinearQ, QFunction, TrainingRecord};

#[test]
fn test_dense_q_shapes() {
    let mut q = DenseQ::seeded(3, &[8, 4], 0.01, 1, 42).unwrap();
    assert_eq!(q.layer_sizes(), &[3, 8, 4, 1]);

    let predictions = q.predict(Array2::zeros((5, 3)).view()).unwrap();
    assert_eq!(predictions.len(), 5);

    let wrong = q.predict(Array2::zeros((5, 2)).view());
    assert!(matches!(wrong, Err(QgridError::DataShape { .. })));
}

#[test]
fn test_dense_q_rejects_empty_layers() {
    assert!(DenseQ::seeded(0, &[4], 0.01, 1, 0).is_err());
    assert!(DenseQ::seeded(2, &[4, 0], 0.01, 1, 0).is_err());
}

#[test]
fn test_seeded_networks_agree() {
    let inputs = array![[0.1, 0.9], [0.4, 0.2]];
    let mut a = DenseQ::seeded(2, &[6], 0.01, 1, 9).unwrap();
    let mut b = DenseQ::seeded(2, &[6], 0.01, 1, 9).unwrap();
    assert_eq!(a.predict(inputs.view()).unwrap(), b.predict(inputs.view()).unwrap());
}

#[test]
fn test_dense_q_learns_constant() {
    let mut q = DenseQ::seeded(2, &[16], 0.05, 50, 3).unwrap();
    let inputs = array![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0], [0.2, 0.8]];
    let targets = array![1.0, 1.0, 1.0, 1.0];

    let mut record = TrainingRecord::default();
    for _ in 0..20 {
        record = q.improve(inputs.view(), targets.view()).unwrap();
    }
    assert_eq!(record.losses.len(), 50);
    let loss = q.improve(inputs.view(), targets.view()).unwrap().final_loss();
    assert!(loss < 0.05, "loss stayed at {}", loss);
}

#[test]
fn test_improve_checks_target_count() {
    let mut q = DenseQ::seeded(2, &[4], 0.01, 1, 0).unwrap();
    let result = q.improve(array![[0.0, 1.0]].view(), array![1.0, 2.0].view());
    assert!(matches!(result, Err(QgridError::DataShape { .. })));
}

#[test]
fn test_copy_weights_and_reset() {
    let inputs = array![[0.3, 0.7]];
    let mut source = DenseQ::seeded(2, &[5], 0.01, 1, 1).unwrap();
    let mut copy = DenseQ::seeded(2, &[5], 0.01, 1, 2).unwrap();
    assert_ne!(source.predict(inputs.view()).unwrap(), copy.predict(inputs.view()).unwrap());

    copy.copy_weights(&source).unwrap();
    assert_eq!(source.predict(inputs.view()).unwrap(), copy.predict(inputs.view()).unwrap());

    copy.reset_weights();
    assert_ne!(source.predict(inputs.view()).unwrap(), copy.predict(inputs.view()).unwrap());

    let mut other = DenseQ::seeded(2, &[3], 0.01, 1, 1).unwrap();
    assert!(other.copy_weights(&source).is_err());
}

#[test]
fn test_dense_q_save_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("q.bin");
    let inputs = array![[0.3, 0.7], [1.0, 0.0]];

    let mut saved = DenseQ::seeded(2, &[4], 0.01, 1, 11).unwrap();
    saved.save(&path).unwrap();

    let mut loaded = DenseQ::seeded(2, &[4], 0.01, 1, 12).unwrap();
    loaded.load(&path).unwrap();
    assert_eq!(saved.predict(inputs.view()).unwrap(), loaded.predict(inputs.view()).unwrap());

    let mut mismatched = DenseQ::seeded(2, &[8], 0.01, 1, 12).unwrap();
    assert!(mismatched.load(&path).is_err());
}

#[test]
fn test_linear_q_fits_line() {
    let mut q = LinearQ::new(1, 0.5, 500);
    let inputs = array![[0.0], [0.5], [1.0]];
    let targets = array![1.0, 2.0, 3.0];

    q.improve(inputs.view(), targets.view()).unwrap();
    assert!((q.weights[0] - 2.0).abs() < 1e-2);
    assert!((q.bias - 1.0).abs() < 1e-2);
}

#[test]
fn test_linear_q_predict_and_copy() {
    let mut q = LinearQ::new(2, 0.1, 1).with_weights(array![1.0, -1.0], 0.5);
    assert_eq!(q.predict(array![[2.0, 1.0]].view()).unwrap(), array![1.5]);

    let mut other = LinearQ::new(2, 0.1, 1);
    other.copy_weights(&q).unwrap();
    assert_eq!(other.weights, array![1.0, -1.0]);

    other.reset_weights();
    assert_eq!(other.bias, 0.0);
}
