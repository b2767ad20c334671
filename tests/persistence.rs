use ndarray::array;
use strata::{
    ActivationFunction, Adam, Dataset, Error, LayerSpec, LossType, NetworkSpec, NeuralNetwork,
    Optimizer, PersistenceError, SharedModel, TrainConfig, TrainingStats,
};

#[test]
fn trained_model_round_trips_through_disk() {
    let spec = NetworkSpec {
        name: "or".into(),
        layers: vec![
            LayerSpec::new(2, 3, ActivationFunction::Gelu),
            LayerSpec::new(3, 1, ActivationFunction::Sigmoid),
        ],
        loss: LossType::Mse,
    };
    let model = SharedModel::new(spec.build(Some(8)).unwrap());
    let data = Dataset::from_rows(
        &[vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        &[vec![0.0], vec![1.0], vec![1.0], vec![1.0]],
    )
    .unwrap();
    let mut opt: Optimizer = Adam::new(0.05).into();
    NeuralNetwork::train(&model, &data, &mut opt, &TrainingStats::new(), &TrainConfig::new(50, 2, LossType::Mse))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("or.json");
    model.save(&path).unwrap();
    let loaded = NeuralNetwork::load(&path).unwrap();

    let sample = array![[0.0, 0.0], [0.25, 0.75], [1.0, 1.0]];
    let expected = model.predict(&sample).unwrap();
    let actual = loaded.predict(&sample).unwrap();
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() <= 1e-6, "{a} vs {e}");
    }
}

#[test]
fn failed_load_returns_no_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"format_version": 1, "layers": [
            {"input_size": 1, "output_size": 1, "activation": {"type": "linear"},
             "weights": [1.0], "biases": [0.0]},
            {"input_size": 1, "output_size": 1, "activation": {"type": "softplus"},
             "weights": [1.0], "biases": [0.0]}
        ]}"#,
    )
    .unwrap();
    assert!(matches!(
        NeuralNetwork::load(&path),
        Err(Error::Persistence(PersistenceError::Format(_)))
    ));
}
