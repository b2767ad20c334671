//! Run configuration: architecture plus hyperparameters, read from JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Error, PersistenceError, Result};
use crate::loss::loss_type::LossType;
use crate::network::spec::NetworkSpec;
use crate::optim::optimizer::{Optimizer, OptimizerKind};
use crate::train::train_config::TrainConfig;

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub learning_rate: f32,
    #[serde(default)]
    pub l2: f32,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    /// Seeds weight initialization and shuffling.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_batch_size() -> usize { 32 }

impl Hyperparams {
    pub fn validate(&self) -> Result<()> {
        self.train_config(LossType::Mse).validate()?;
        self.optimizer().map(|_| ())
    }

    pub fn train_config(&self, loss_type: LossType) -> TrainConfig {
        let config = TrainConfig::new(self.epochs, self.batch_size, loss_type);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    pub fn optimizer(&self) -> Result<Optimizer> {
        self.optimizer.build(self.learning_rate, self.l2)
    }
}

/// Everything the `train` command needs besides data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub network: NetworkSpec,
    pub hyperparams: Hyperparams,
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<RunConfig> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let config: RunConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(PersistenceError::Format)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.hyperparams.validate()
    }

    pub fn train_config(&self) -> TrainConfig {
        self.hyperparams.train_config(self.network.loss)
    }
}

impl std::str::FromStr for RunConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<RunConfig> {
        let config: RunConfig = serde_json::from_str(s).map_err(PersistenceError::Format)?;
        config.validate()?;
        Ok(config)
    }
}
