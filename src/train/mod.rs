pub mod dataset;
pub mod epoch_stats;
pub mod loop_fn;
pub mod stats;
pub mod train_config;
pub mod trainer;

pub use dataset::Dataset;
pub use epoch_stats::EpochStats;
pub use loop_fn::{train_loop, TrainSummary};
pub use stats::TrainingStats;
pub use train_config::TrainConfig;
pub use trainer::{spawn_training, TrainOutcome, TrainingHandle};
