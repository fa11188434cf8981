use pipeline_core::{JobId, JobKind, JobRequest, JobStatus, StatusReport};
use pipeline_logging::pipeline_debug;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::{BackendSettings, FailureKind, RequestError};

/// REST calls the poller depends on.
#[async_trait::async_trait]
pub trait JobBackend: Send + Sync {
    /// Creation call; returns the backend's job identifier.
    async fn submit(&self, request: &JobRequest) -> Result<JobId, RequestError>;

    async fn status(&self, kind: JobKind, job_id: &str) -> Result<StatusReport, RequestError>;

    /// Persists the model trained by `job_id`; returns the model identifier.
    async fn save_model(&self, job_id: &str) -> Result<String, RequestError>;
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    job_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: Option<String>,
    progress: Option<Value>,
    message: Option<String>,
    error: Option<String>,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    model_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
    error: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, RequestError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| RequestError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            base_url: settings.base_url,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RequestError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T, RequestError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body).unwrap_or_default();
            let message = detail
                .detail
                .or(detail.error)
                .map(describe)
                .unwrap_or_else(|| fallback.to_string());
            return Err(RequestError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        serde_json::from_slice(&body).map_err(|err| {
            RequestError::new(FailureKind::MalformedBody, format!("{fallback}: {err}"))
        })
    }

    fn submission(&self, request: &JobRequest) -> Result<(Url, Value, &'static str), RequestError> {
        match request {
            JobRequest::Preprocess(preprocess) => Ok((
                self.endpoint(&["api", "data", "preprocess", preprocess.base_filename()])?,
                json!({ "steps": preprocess.steps }),
                "Failed to start preprocessing job",
            )),
            JobRequest::Training(training) => Ok((
                self.endpoint(&[
                    "api",
                    "model-training",
                    "training",
                    "train",
                    training.filename.as_str(),
                ])?,
                json!({
                    "target_column": training.target_column,
                    "problem_type": training.problem_type.as_str(),
                    "test_size": training.test_size,
                    "random_state": training.random_state,
                    "models_to_train": training.models_to_train,
                }),
                "Failed to start training",
            )),
            JobRequest::FeatureEngineering(engineering) => Ok((
                self.endpoint(&["api", "feature-engineering", "run"])?,
                json!({
                    "filename": engineering.filename,
                    "steps": engineering.steps,
                }),
                "Failed to start feature engineering job",
            )),
        }
    }
}

#[async_trait::async_trait]
impl JobBackend for ReqwestBackend {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, RequestError> {
        let kind = request.kind();
        let (url, body, fallback) = self.submission(request)?;
        pipeline_debug!("POST {} kind={}", url, kind);
        let builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        let response: StartResponse = self.send(builder, fallback).await?;

        response.job_id.and_then(identifier).ok_or_else(|| {
            let message = match kind {
                JobKind::Preprocess => "Failed to obtain preprocessing job identifier",
                JobKind::Training => "Failed to obtain training job identifier",
                JobKind::FeatureEngineering => {
                    "Failed to obtain feature engineering job identifier"
                }
            };
            RequestError::new(FailureKind::MissingJobId, message)
        })
    }

    async fn status(&self, kind: JobKind, job_id: &str) -> Result<StatusReport, RequestError> {
        let (url, fallback) = match kind {
            JobKind::Preprocess => (
                self.endpoint(&["api", "data", "preprocess", "status", job_id])?,
                "Unable to fetch preprocessing status",
            ),
            JobKind::Training => (
                self.endpoint(&["api", "model-training", "training", "status", job_id])?,
                "Failed to fetch status",
            ),
            JobKind::FeatureEngineering => (
                self.endpoint(&["api", "feature-engineering", "status", job_id])?,
                "Unable to fetch feature engineering status",
            ),
        };
        let payload: StatusPayload = self.send(self.client.get(url), fallback).await?;

        Ok(StatusReport {
            status: payload.status.as_deref().and_then(JobStatus::from_wire),
            progress: payload.progress.as_ref().and_then(Value::as_f64),
            message: payload.message,
            error: payload.error,
            result: payload.result.filter(|value| !value.is_null()),
        })
    }

    async fn save_model(&self, job_id: &str) -> Result<String, RequestError> {
        let url = self.endpoint(&["api", "model-training", "training", "save", job_id])?;
        let response: SaveResponse = self
            .send(self.client.post(url), "Failed to save model")
            .await?;
        response
            .model_id
            .and_then(identifier)
            .ok_or_else(|| RequestError::new(FailureKind::MalformedBody, "Failed to save model"))
    }
}

/// Backends issue identifiers as strings or integers.
fn identifier(value: Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn describe(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        return RequestError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return RequestError::new(FailureKind::MalformedBody, err.to_string());
    }
    RequestError::new(FailureKind::Network, err.to_string())
}
