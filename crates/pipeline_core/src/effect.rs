use crate::{Generation, JobId, JobKind, JobRequest, Notice};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Issue the creation call for `request`.
    Submit {
        generation: Generation,
        request: JobRequest,
    },
    /// Start was refused before any request was made.
    RejectStart { reason: String },
    /// Poll the status endpoint on the fixed interval, first request immediately.
    StartPolling {
        generation: Generation,
        kind: JobKind,
        job_id: JobId,
    },
    StopPolling,
    /// Start the local elapsed-time clock.
    StartClock { generation: Generation },
    /// Stop the clock and report its final reading once.
    StopClock { generation: Generation },
    /// Return to idle after the configured delay for `kind`.
    ScheduleAutoReset {
        generation: Generation,
        kind: JobKind,
    },
    CancelAutoReset,
    Notify(Notice),
}
