//! strata command-line interface.
//!
//! Trains a network from a JSON run configuration, queries a saved model, or
//! prints its architecture.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use strata::{spawn_training, Dataset, NeuralNetwork, RunConfig, SharedModel, TrainingStats};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Dense-layer neural network training engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network and save it
    Train {
        /// Run configuration (network + hyperparameters)
        #[arg(short, long)]
        config: PathBuf,

        /// Training data: {"inputs": [[..]], "targets": [[..]]}
        #[arg(short, long)]
        data: PathBuf,

        /// Where to write the trained model
        #[arg(short, long, default_value = "model.json")]
        out: PathBuf,

        /// Optional validation data, same layout as --data
        #[arg(long)]
        validation: Option<PathBuf>,
    },

    /// Run a saved model on one input row
    Predict {
        /// Model file written by `train`
        #[arg(short, long)]
        model: PathBuf,

        /// Comma-separated input values
        #[arg(short, long)]
        input: String,
    },

    /// Print the architecture of a saved model
    Inspect {
        /// Model file written by `train`
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Train { config, data, out, validation } => train(config, data, out, validation),
        Commands::Predict { model, input } => predict(model, &input),
        Commands::Inspect { model } => inspect(model),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // Rejected input exits with 2, failures while running with 1.
        Err(e) if e.is_validation() => {
            error!("invalid input: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn train(
    config: PathBuf,
    data: PathBuf,
    out: PathBuf,
    validation: Option<PathBuf>,
) -> strata::Result<()> {
    let run = RunConfig::load_json(&config)?;
    let train_data = Dataset::load_json(&data)?;
    let validation = validation.map(Dataset::load_json).transpose()?;

    let network = run.network.build(run.hyperparams.seed)?;
    info!(
        name = %run.network.name,
        layers = network.len(),
        parameters = network.parameter_count(),
        "built network"
    );

    let model = SharedModel::new(network);
    let stats = TrainingStats::new();
    let handle = spawn_training(
        model.clone(),
        train_data,
        validation,
        run.hyperparams.optimizer()?,
        stats.clone(),
        run.train_config(),
    );

    // Poll the shared history while the trainer runs.
    let mut seen = 0;
    loop {
        let finished = handle.is_finished();
        for record in stats.since(seen) {
            seen += 1;
            match (record.val_loss, record.val_accuracy) {
                (Some(val_loss), Some(val_accuracy)) => println!(
                    "epoch {:>5}/{}  loss {:.6}  acc {:.3}  val_loss {:.6}  val_acc {:.3}",
                    record.epoch, record.total_epochs, record.loss, record.accuracy, val_loss, val_accuracy
                ),
                _ => println!(
                    "epoch {:>5}/{}  loss {:.6}  acc {:.3}",
                    record.epoch, record.total_epochs, record.loss, record.accuracy
                ),
            }
        }
        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    let outcome = handle.join()?;
    model.save(&out)?;
    info!(
        path = %out.display(),
        epochs = outcome.summary.epochs_completed,
        final_loss = ?outcome.summary.final_loss,
        "model saved"
    );
    Ok(())
}

fn predict(model: PathBuf, input: &str) -> strata::Result<()> {
    let network = NeuralNetwork::load(&model)?;
    let row = input
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| strata::Error::Configuration(format!("bad input value `{v}`: {e}")))
        })
        .collect::<strata::Result<Vec<f32>>>()?;
    let input = strata::math::tensor::from_rows(&[row])?;
    let output = network.predict(&input)?;
    let values: Vec<String> = output.iter().map(|v| format!("{v:.6}")).collect();
    println!("{}", values.join(","));
    Ok(())
}

fn inspect(model: PathBuf) -> strata::Result<()> {
    let network = NeuralNetwork::load(&model)?;
    println!("{} layers, {} parameters", network.len(), network.parameter_count());
    for (i, layer) in network.layers().iter().enumerate() {
        println!(
            "  [{i}] {:>4} -> {:<4} {}",
            layer.input_size(),
            layer.output_size(),
            layer.activation().name()
        );
    }
    Ok(())
}
