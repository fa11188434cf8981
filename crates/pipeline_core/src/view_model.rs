use std::time::Duration;

use serde_json::Value;

use crate::{format_elapsed, JobId, JobKind, JobStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobViewModel {
    pub kind: Option<JobKind>,
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    pub progress: f64,
    pub message: String,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub elapsed: Duration,
    pub saved_model_id: Option<String>,
    pub dirty: bool,
}

impl JobViewModel {
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }

    /// Progress rounded to a whole percent for display.
    pub fn percent(&self) -> u8 {
        self.progress.round() as u8
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}
