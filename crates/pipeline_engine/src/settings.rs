use std::time::Duration;

use pipeline_core::JobKind;
use url::Url;

/// Interval between status requests. Every tick of one job uses the same value.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
/// Refresh rate of the local elapsed-time clock.
pub const DEFAULT_CLOCK_INTERVAL: Duration = Duration::from_millis(100);
/// Delay before a finished preprocessing job returns to idle.
pub const DEFAULT_PREPROCESS_AUTO_RESET: Duration = Duration::from_millis(1800);
/// Delay before a finished feature engineering job returns to idle.
pub const DEFAULT_FEATURE_ENGINEERING_AUTO_RESET: Duration = Duration::from_millis(1800);

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub clock_interval: Duration,
    /// `None` keeps a finished job visible until an explicit reset.
    pub preprocess_auto_reset: Option<Duration>,
    pub training_auto_reset: Option<Duration>,
    pub feature_engineering_auto_reset: Option<Duration>,
}

impl PollSettings {
    pub fn auto_reset_after(&self, kind: JobKind) -> Option<Duration> {
        match kind {
            JobKind::Preprocess => self.preprocess_auto_reset,
            JobKind::Training => self.training_auto_reset,
            JobKind::FeatureEngineering => self.feature_engineering_auto_reset,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            clock_interval: DEFAULT_CLOCK_INTERVAL,
            preprocess_auto_reset: Some(DEFAULT_PREPROCESS_AUTO_RESET),
            // The trained model must stay addressable for saving.
            training_auto_reset: None,
            feature_engineering_auto_reset: Some(DEFAULT_FEATURE_ENGINEERING_AUTO_RESET),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub backend: BackendSettings,
    pub poll: PollSettings,
}
