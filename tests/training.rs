use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use ndarray::array;
use strata::{
    spawn_training, ActivationFunction, Adam, Dataset, DenseLayer, Error, LayerSpec, LossType, NetworkSpec,
    NeuralNetwork, Optimizer, Sgd, SharedModel, TrainConfig, TrainingStats,
};

fn xor_spec() -> NetworkSpec {
    NetworkSpec {
        name: "xor".into(),
        layers: vec![
            LayerSpec::new(2, 4, ActivationFunction::ReLU),
            LayerSpec::new(4, 1, ActivationFunction::Sigmoid),
        ],
        loss: LossType::BinaryCrossEntropy,
    }
}

fn xor_network() -> NeuralNetwork {
    // Fixed starting point; the fourth hidden unit starts dead on every sample.
    NeuralNetwork::from_layers(vec![
        DenseLayer::from_parameters(
            array![[0.5, -0.6, 0.8, -0.3], [-0.4, 0.7, 0.6, -0.9]],
            array![0.0, 0.0, 0.0, 0.0],
            ActivationFunction::ReLU,
        )
        .unwrap(),
        DenseLayer::from_parameters(
            array![[0.6], [0.5], [-0.4], [0.3]],
            array![0.0],
            ActivationFunction::Sigmoid,
        )
        .unwrap(),
    ])
    .unwrap()
}

#[test]
fn learns_xor() {
    let data = Dataset::xor();
    let model = SharedModel::new(xor_network());
    let stats = TrainingStats::new();
    let mut opt: Optimizer = Adam::new(0.05).into();
    let config = TrainConfig::new(1000, 4, LossType::BinaryCrossEntropy).with_seed(1);

    let summary = NeuralNetwork::train(&model, &data, &mut opt, &stats, &config).unwrap();
    assert_eq!(stats.len(), 1000);
    let records = stats.snapshot();
    assert!(records[999].loss < records[0].loss);

    let final_loss = summary.final_loss.unwrap();
    assert!(final_loss < 0.1, "final loss {final_loss}");
    let out = model.predict(data.inputs()).unwrap();
    let rounded: Vec<f32> = out.iter().map(|v| v.round()).collect();
    assert_eq!(rounded, vec![0.0, 1.0, 1.0, 0.0]);
}

#[test]
fn readers_predict_while_training_runs() {
    let model = SharedModel::new(xor_spec().build(Some(5)).unwrap());
    let stats = TrainingStats::new();
    let epochs = 300;
    let handle = spawn_training(
        model.clone(),
        Dataset::xor(),
        None,
        Adam::new(0.01).into(),
        stats.clone(),
        TrainConfig::new(epochs, 1, LossType::BinaryCrossEntropy).with_seed(5),
    );

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let model = model.clone();
            let stats = stats.clone();
            thread::spawn(move || {
                let mut reads = 0;
                while stats.len() < epochs && reads < 100_000 {
                    let out = model.predict(&array![[0.0, 1.0], [1.0, 1.0]]).unwrap();
                    assert_eq!(out.shape(), &[2, 1]);
                    assert!(out.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));

                    let snapshot = stats.snapshot();
                    for (i, record) in snapshot.iter().enumerate() {
                        assert_eq!(record.epoch, i + 1);
                    }
                    reads += 1;
                }
            })
        })
        .collect();

    let outcome = handle.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(outcome.summary.epochs_completed, epochs);
    let records = stats.snapshot();
    assert_eq!(records.len(), epochs);
    assert!(records.iter().enumerate().all(|(i, r)| r.epoch == i + 1 && r.total_epochs == epochs));
}

#[test]
fn stopping_keeps_applied_updates_and_recorded_epochs() {
    let model = SharedModel::new(xor_spec().build(Some(9)).unwrap());
    let initial = model.snapshot();
    let stats = TrainingStats::new();
    let flag = Arc::new(AtomicBool::new(false));
    let handle = spawn_training(
        model.clone(),
        Dataset::xor(),
        None,
        Sgd::new(0.1).into(),
        stats.clone(),
        TrainConfig::new(usize::MAX, 1, LossType::BinaryCrossEntropy).with_stop_flag(flag.clone()),
    );

    while stats.len() < 3 {
        thread::yield_now();
    }
    flag.store(true, Ordering::Relaxed);
    let outcome = handle.join().unwrap();

    assert!(outcome.summary.stopped);
    assert!(outcome.summary.epochs_completed >= 3);
    assert_eq!(stats.len(), outcome.summary.epochs_completed);

    let trained = model.snapshot();
    let changed = trained
        .layers()
        .iter()
        .zip(initial.layers())
        .any(|(a, b)| a.weights() != b.weights());
    assert!(changed);
}

#[test]
fn non_finite_input_aborts_without_touching_weights() {
    let model = SharedModel::new(xor_spec().build(Some(2)).unwrap());
    let before = model.snapshot();
    let stats = TrainingStats::new();
    let data = Dataset::from_rows(&[vec![f32::NAN, 1.0]], &[vec![1.0]]).unwrap();
    let mut opt: Optimizer = Adam::new(0.01).into();

    let err = NeuralNetwork::train(
        &model,
        &data,
        &mut opt,
        &stats,
        &TrainConfig::new(5, 1, LossType::BinaryCrossEntropy),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NonFiniteValue(_)));
    assert!(stats.is_empty());

    let after = model.snapshot();
    for (a, b) in after.layers().iter().zip(before.layers()) {
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.biases(), b.biases());
    }
    if let Optimizer::Adam(adam) = &opt {
        assert_eq!(adam.tracked_layers(), 0);
    }
}

#[test]
fn validation_metrics_are_recorded() {
    let model = SharedModel::new(xor_spec().build(Some(4)).unwrap());
    let stats = TrainingStats::new();
    let mut opt: Optimizer = Adam::new(0.05).into();
    let config = TrainConfig::new(10, 2, LossType::BinaryCrossEntropy).with_seed(4);
    let data = Dataset::xor();
    strata::train_loop(&model, &data, Some(&data), &mut opt, &stats, &config).unwrap();

    for record in stats.snapshot() {
        let val_loss = record.val_loss.unwrap();
        let val_accuracy = record.val_accuracy.unwrap();
        assert!(val_loss.is_finite() && val_loss >= 0.0);
        assert!((0.0..=1.0).contains(&val_accuracy));
        assert!((0.0..=1.0).contains(&record.accuracy));
    }
}
