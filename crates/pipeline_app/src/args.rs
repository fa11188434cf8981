use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pipeline_core::{ProblemType, TrainingRequest};
use pipeline_logging::LogDestination;

use crate::config::CONFIG_FILENAME;

#[derive(Debug, Parser)]
#[command(name = "pipeline", version, about = "Run preprocessing and training jobs against the pipeline backend")]
pub struct Cli {
    /// Configuration file (RON). Missing file means defaults.
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Overrides the backend base URL from the configuration.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a preprocessing job on an uploaded dataset.
    Preprocess(PreprocessArgs),
    /// Train models on an uploaded dataset.
    Train(TrainArgs),
    /// Run a feature engineering job on an uploaded dataset.
    FeatureEngineer(FeatureEngineerArgs),
    /// Write a configuration file with default values.
    InitConfig,
}

#[derive(Debug, Args)]
pub struct PreprocessArgs {
    /// Dataset filename as known to the backend.
    pub file: String,

    /// Step configuration as a JSON object.
    #[arg(long, default_value = "{}")]
    pub steps: String,
}

#[derive(Debug, Args)]
pub struct FeatureEngineerArgs {
    /// Dataset filename as known to the backend.
    pub file: String,

    /// Step list as a JSON array.
    #[arg(long, default_value = "[]")]
    pub steps: String,
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Dataset filename as known to the backend.
    pub file: String,

    /// Column to predict.
    #[arg(long)]
    pub target: String,

    #[arg(long, default_value = "classification")]
    pub problem_type: ProblemType,

    #[arg(long, default_value_t = TrainingRequest::DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    #[arg(long, default_value_t = TrainingRequest::DEFAULT_RANDOM_STATE)]
    pub random_state: u64,

    /// Model to train; repeat for several. Omit to train all.
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Save the best model once training completes.
    #[arg(long)]
    pub save: bool,
}

impl TrainArgs {
    pub fn to_request(&self) -> TrainingRequest {
        TrainingRequest {
            filename: self.file.clone(),
            target_column: self.target.clone(),
            problem_type: self.problem_type,
            test_size: self.test_size,
            random_state: self.random_state,
            models_to_train: if self.models.is_empty() {
                None
            } else {
                Some(self.models.clone())
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
