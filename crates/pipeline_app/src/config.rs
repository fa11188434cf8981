use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pipeline_engine::{BackendSettings, EngineSettings, PollSettings};
use pipeline_logging::{pipeline_info, pipeline_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const CONFIG_FILENAME: &str = "pipeline.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}

/// On-disk overrides for [`EngineSettings`]. Absent fields keep the engine defaults.
///
/// Auto-reset delays of `0` disable the automatic return to idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub clock_interval_ms: Option<u64>,
    pub preprocess_auto_reset_ms: Option<u64>,
    pub training_auto_reset_ms: Option<u64>,
    pub feature_engineering_auto_reset_ms: Option<u64>,
    /// Upper bound on waiting for queued notifications before exiting.
    pub notice_drain_ms: Option<u64>,
}

impl AppConfig {
    pub const DEFAULT_NOTICE_DRAIN: Duration = Duration::from_secs(8);

    /// Every field spelled out with the engine defaults, for `init-config`.
    pub fn with_defaults() -> Self {
        let backend = BackendSettings::default();
        let poll = PollSettings::default();
        Self {
            base_url: Some(backend.base_url.to_string()),
            connect_timeout_ms: Some(millis(backend.connect_timeout)),
            request_timeout_ms: Some(millis(backend.request_timeout)),
            poll_interval_ms: Some(millis(poll.poll_interval)),
            clock_interval_ms: Some(millis(poll.clock_interval)),
            preprocess_auto_reset_ms: Some(poll.preprocess_auto_reset.map_or(0, millis)),
            training_auto_reset_ms: Some(poll.training_auto_reset.map_or(0, millis)),
            feature_engineering_auto_reset_ms: Some(
                poll.feature_engineering_auto_reset.map_or(0, millis),
            ),
            notice_drain_ms: Some(millis(Self::DEFAULT_NOTICE_DRAIN)),
        }
    }

    /// Applies the overrides on top of the engine defaults.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let mut settings = EngineSettings::default();

        if let Some(raw) = &self.base_url {
            settings.backend.base_url =
                Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
                    url: raw.clone(),
                    source,
                })?;
        }
        if let Some(ms) = self.connect_timeout_ms {
            settings.backend.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout_ms {
            settings.backend.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            settings.poll.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = self.clock_interval_ms {
            settings.poll.clock_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = self.preprocess_auto_reset_ms {
            settings.poll.preprocess_auto_reset = optional_delay(ms);
        }
        if let Some(ms) = self.training_auto_reset_ms {
            settings.poll.training_auto_reset = optional_delay(ms);
        }
        if let Some(ms) = self.feature_engineering_auto_reset_ms {
            settings.poll.feature_engineering_auto_reset = optional_delay(ms);
        }

        Ok(settings)
    }

    pub fn notice_drain(&self) -> Duration {
        self.notice_drain_ms
            .map_or(Self::DEFAULT_NOTICE_DRAIN, Duration::from_millis)
    }
}

/// Loads `path`. A missing file yields the default (empty) config.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            pipeline_info!("No config at {:?}, using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(source) => {
            pipeline_warn!("Failed to read config from {:?}: {}", path, source);
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    pipeline_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Writes `config` as pretty RON through a temporary sibling file.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(config, pretty)?;

    let temp_path = path.with_extension("ron.tmp");
    fs::write(&temp_path, content).map_err(|source| ConfigError::Write {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    pipeline_info!("Wrote config to {:?}", path);
    Ok(())
}

fn optional_delay(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
