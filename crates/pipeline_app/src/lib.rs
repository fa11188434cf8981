//! Terminal front end: runs one pipeline job and renders its progress.
mod app;
mod args;
mod config;
mod render;
mod toast;

pub use app::run;
pub use args::{Cli, Command, FeatureEngineerArgs, LogTarget, PreprocessArgs, TrainArgs};
pub use config::{load_config, save_config, AppConfig, ConfigError, CONFIG_FILENAME};
pub use render::{metric_lines, progress_line, summary_lines};
pub use toast::TerminalToastSink;
