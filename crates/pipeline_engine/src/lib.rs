//! Pipeline engine: backend IO, timers and effect execution.
mod backend;
mod client;
mod notify;
mod poller;
mod settings;
mod timer;
mod types;

pub use backend::{JobBackend, ReqwestBackend};
pub use client::PipelineClient;
pub use notify::{Notifier, ToastSink};
pub use poller::JobPoller;
pub use settings::{
    BackendSettings, EngineSettings, PollSettings, DEFAULT_BASE_URL, DEFAULT_CLOCK_INTERVAL,
    DEFAULT_FEATURE_ENGINEERING_AUTO_RESET, DEFAULT_POLL_INTERVAL, DEFAULT_PREPROCESS_AUTO_RESET,
};
pub use timer::{TimerHandle, MIN_TIMER_PERIOD};
pub use types::{FailureKind, RequestError, SaveError, StartError};
