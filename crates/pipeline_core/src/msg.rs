use std::time::Duration;

use serde_json::Value;

use crate::{Generation, JobId, JobRequest, JobStatus};

/// One status response from the backend, with every field optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    /// `None` when the backend omitted the field or sent an unknown value.
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Caller asked to start a new job.
    StartRequested(JobRequest),
    /// Backend accepted the creation call.
    StartAccepted { generation: Generation, job_id: JobId },
    /// Creation call failed (transport, non-2xx or missing job id).
    StartFailed { generation: Generation, error: String },
    /// A status poll returned.
    StatusReceived {
        generation: Generation,
        report: StatusReport,
    },
    /// A status poll could not be completed.
    PollFailed { generation: Generation, error: String },
    /// Local elapsed-time clock.
    ClockTick {
        generation: Generation,
        elapsed: Duration,
    },
    /// Delay after a terminal state elapsed.
    AutoResetDue { generation: Generation },
    /// Trained model was persisted by the backend.
    ModelSaved {
        generation: Generation,
        model_id: String,
    },
    /// Saving the trained model failed.
    SaveFailed { generation: Generation, error: String },
    /// Explicit reset from the caller.
    ResetRequested,
}
