//! Pipeline core: pure job state machine, notice queue and view-model helpers.
mod effect;
mod format;
mod msg;
mod notice;
mod request;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use format::{clamp_progress, format_elapsed, format_metric_value};
pub use msg::{Msg, StatusReport};
pub use notice::{
    EnqueueOutcome, Notice, NoticeKind, NoticeQueue, DEFAULT_AFTER_DELAY, DEFAULT_DURATION,
};
pub use request::{
    FeatureEngineeringRequest, JobRequest, PreprocessRequest, ProblemType, TrainingRequest,
};
pub use state::{Generation, JobId, JobKind, JobState, JobStatus};
pub use update::update;
pub use view_model::JobViewModel;
