/// XOR with a 2 → 4 (ReLU) → 1 (Sigmoid) network.
///
/// Loss:      BinaryCrossEntropy
/// Optimizer: Adam, lr = 0.05
/// Epochs:    1000, full batch
///
/// Run with:
///   cargo run --example xor

use strata::{
    ActivationFunction, Adam, Dataset, LayerSpec, LossType, NetworkSpec, Optimizer, SharedModel,
    TrainConfig, TrainingStats,
};

fn main() -> strata::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let spec = NetworkSpec {
        name: "xor".into(),
        layers: vec![
            LayerSpec::new(2, 4, ActivationFunction::ReLU),
            LayerSpec::new(4, 1, ActivationFunction::Sigmoid),
        ],
        loss: LossType::BinaryCrossEntropy,
    };
    let model = SharedModel::new(spec.build(Some(1))?);
    let data = Dataset::xor();
    let stats = TrainingStats::new();
    let mut optimizer: Optimizer = Adam::new(0.05).into();
    let config = TrainConfig::new(1000, 4, spec.loss).with_seed(1);

    strata::NeuralNetwork::train(&model, &data, &mut optimizer, &stats, &config)?;

    for record in stats.snapshot().iter().filter(|r| r.epoch % 100 == 0) {
        println!("Epoch {}: loss = {:.6}, accuracy = {:.2}", record.epoch, record.loss, record.accuracy);
    }

    let output = model.predict(data.inputs())?;
    for (input, out) in data.inputs().rows().into_iter().zip(output.rows()) {
        println!("Input: {:?} -> Output: {:.4}", input.to_vec(), out[0]);
    }
    Ok(())
}
