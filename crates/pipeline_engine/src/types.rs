use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedBody,
    MissingJobId,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::MissingJobId => write!(f, "missing job identifier"),
        }
    }
}

/// A failed backend call. `message` is suitable for showing to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: FailureKind,
    pub message: String,
}

impl RequestError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// Required input missing; nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Request(#[from] RequestError),
    /// A reset or newer start replaced this job before the backend answered.
    #[error("job {job_id} was superseded before it could be tracked")]
    Superseded { job_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("No training job to save")]
    NothingToSave,
    #[error(transparent)]
    Request(#[from] RequestError),
}
