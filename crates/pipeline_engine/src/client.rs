use std::sync::Arc;

use crate::{EngineSettings, JobBackend, JobPoller, Notifier, ReqwestBackend, RequestError, ToastSink};

/// Shared wiring for a UI session: one backend client and one notifier,
/// handed to every poller created from it.
#[derive(Clone)]
pub struct PipelineClient {
    backend: Arc<dyn JobBackend>,
    notifier: Notifier,
    settings: EngineSettings,
}

impl PipelineClient {
    /// Builds the reqwest backend from `settings`. Must be called from within
    /// a Tokio runtime.
    pub fn new(settings: EngineSettings, sink: Arc<dyn ToastSink>) -> Result<Self, RequestError> {
        let backend = Arc::new(ReqwestBackend::new(settings.backend.clone())?);
        Ok(Self::with_backend(backend, Notifier::new(sink), settings))
    }

    pub fn with_backend(
        backend: Arc<dyn JobBackend>,
        notifier: Notifier,
        settings: EngineSettings,
    ) -> Self {
        Self {
            backend,
            notifier,
            settings,
        }
    }

    /// A fresh poller tracking its own job, sharing this session's notifier.
    pub fn job_poller(&self) -> JobPoller {
        JobPoller::new(
            self.backend.clone(),
            self.notifier.clone(),
            self.settings.poll.clone(),
        )
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
