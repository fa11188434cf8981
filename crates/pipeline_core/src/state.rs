use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::view_model::JobViewModel;

/// Opaque job identifier issued by the backend.
pub type JobId = String;

/// Counter bumped on every start and reset. Asynchronous callbacks carry the
/// generation they were issued under and are dropped when it is stale.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Preprocess,
    Training,
    FeatureEngineering,
}

impl JobKind {
    /// Capitalised name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Preprocess => "Preprocessing",
            JobKind::Training => "Training",
            JobKind::FeatureEngineering => "Feature engineering",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Preprocess => write!(f, "preprocess"),
            JobKind::Training => write!(f, "training"),
            JobKind::FeatureEngineering => write!(f, "feature-engineering"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Queued,
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Parses a backend status string. Unknown values yield `None`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(JobStatus::Queued),
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Queued => "queued",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Queued, pending or running.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobStatus::Queued | JobStatus::Pending | JobStatus::Running
        )
    }

    /// Position in the lifecycle; status never moves to a lower rank within one job.
    fn rank(self) -> u8 {
        match self {
            JobStatus::Idle => 0,
            JobStatus::Queued => 1,
            JobStatus::Pending => 2,
            JobStatus::Running => 3,
            JobStatus::Completed | JobStatus::Failed => 4,
        }
    }

    pub(crate) fn can_advance_to(self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the single job tracked by one poller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobState {
    generation: Generation,
    kind: Option<JobKind>,
    job_id: Option<JobId>,
    status: JobStatus,
    progress: f64,
    message: String,
    result: Option<Value>,
    error: Option<String>,
    elapsed: Duration,
    last_job_id: Option<JobId>,
    saved_model_id: Option<String>,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> JobViewModel {
        JobViewModel {
            kind: self.kind,
            job_id: self.job_id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            elapsed: self.elapsed,
            saved_model_id: self.saved_model_id.clone(),
            dirty: self.dirty,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn kind(&self) -> Option<JobKind> {
        self.kind
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Identifier of the most recently completed job, kept after `job_id` is cleared.
    pub fn last_job_id(&self) -> Option<&str> {
        self.last_job_id.as_deref()
    }

    pub fn saved_model_id(&self) -> Option<&str> {
        self.saved_model_id.as_deref()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Returns whether the state changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears every job field and invalidates callbacks of the previous generation.
    pub(crate) fn clear(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            dirty: true,
            ..Self::default()
        };
    }

    pub(crate) fn begin(&mut self, kind: JobKind) {
        self.clear();
        self.kind = Some(kind);
        self.status = JobStatus::Queued;
        self.message = "Queued and preparing job...".to_string();
    }

    pub(crate) fn accept(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.status = JobStatus::Pending;
        self.progress = 0.0;
        self.message = match self.kind {
            Some(JobKind::Training) => "Initializing training job...".to_string(),
            Some(JobKind::FeatureEngineering) => {
                "Initializing feature engineering pipeline...".to_string()
            }
            _ => "Initializing preprocessing pipeline...".to_string(),
        };
        self.mark_dirty();
    }

    pub(crate) fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.can_advance_to(status) && !status.is_terminal() {
            if self.status != status {
                self.status = status;
                self.mark_dirty();
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn set_progress(&mut self, progress: f64) {
        if self.progress != progress {
            self.progress = progress;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_message(&mut self, message: String) {
        if self.message != message {
            self.message = message;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        if elapsed > self.elapsed {
            self.elapsed = elapsed;
            self.mark_dirty();
        }
    }

    pub(crate) fn complete(&mut self, result: Option<Value>, message: String) {
        let best_model_id = result
            .as_ref()
            .and_then(|value| value.get("best_model_id"))
            .and_then(|id| match id {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            });
        if self.kind == Some(JobKind::Training) {
            if let Some(id) = best_model_id {
                self.saved_model_id = Some(id);
            }
        }
        self.last_job_id = self.job_id.take();
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        self.message = message;
        self.result = result;
        self.error = None;
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, error: String, progress: f64, message: String) {
        self.job_id = None;
        self.status = JobStatus::Failed;
        self.progress = progress;
        self.message = message;
        self.result = None;
        self.error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn set_saved_model_id(&mut self, model_id: String) {
        self.saved_model_id = Some(model_id);
        self.mark_dirty();
    }
}
