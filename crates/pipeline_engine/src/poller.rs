use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use pipeline_core::{
    update, Effect, Generation, JobId, JobKind, JobRequest, JobState, JobViewModel, Msg,
};
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::{JobBackend, Notifier, PollSettings, SaveError, StartError, TimerHandle};

/// Drives one backend job at a time from submission to a terminal status.
///
/// All state transitions go through [`pipeline_core::update`]; this type only
/// executes the resulting effects (requests, timers, notifications). Clones
/// share the same job. Dropping the last clone cancels every timer.
#[derive(Clone)]
pub struct JobPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn JobBackend>,
    notifier: Notifier,
    settings: PollSettings,
    runtime: Handle,
    state: Mutex<JobState>,
    timers: Mutex<Timers>,
    view_tx: watch::Sender<JobViewModel>,
}

#[derive(Default)]
struct Timers {
    poll: Option<TimerHandle>,
    clock: Option<Clock>,
    auto_reset: Option<TimerHandle>,
}

struct Clock {
    generation: Generation,
    started_at: Instant,
    handle: TimerHandle,
}

impl JobPoller {
    /// Must be called from within a Tokio runtime; timers run on it.
    pub fn new(backend: Arc<dyn JobBackend>, notifier: Notifier, settings: PollSettings) -> Self {
        let state = JobState::new();
        let (view_tx, _) = watch::channel(state.view());
        Self {
            inner: Arc::new(PollerInner {
                backend,
                notifier,
                settings,
                runtime: Handle::current(),
                state: Mutex::new(state),
                timers: Mutex::new(Timers::default()),
                view_tx,
            }),
        }
    }

    /// Submits `request` and starts polling its status.
    ///
    /// Any job already tracked by this poller is abandoned first. Validation
    /// failures return without contacting the backend.
    pub async fn start(&self, request: JobRequest) -> Result<JobId, StartError> {
        let kind = request.kind();
        for effect in self.inner.dispatch(Msg::StartRequested(request)) {
            match effect {
                Effect::RejectStart { reason } => {
                    pipeline_info!("{} start rejected: {}", kind, reason);
                    return Err(StartError::Validation(reason));
                }
                Effect::Submit {
                    generation,
                    request,
                } => return self.submit(generation, request).await,
                other => pipeline_warn!("unexpected deferred effect {:?}", other),
            }
        }
        Err(StartError::Validation(format!("{} could not be started", kind.label())))
    }

    async fn submit(&self, generation: Generation, request: JobRequest) -> Result<JobId, StartError> {
        let kind = request.kind();
        match self.inner.backend.submit(&request).await {
            Ok(job_id) => {
                pipeline_info!("{} job {} accepted", kind, job_id);
                self.inner.dispatch(Msg::StartAccepted {
                    generation,
                    job_id: job_id.clone(),
                });
                if self.inner.is_current(generation) {
                    Ok(job_id)
                } else {
                    Err(StartError::Superseded { job_id })
                }
            }
            Err(err) => {
                pipeline_warn!("{} job submission failed: {}", kind, err);
                self.inner.dispatch(Msg::StartFailed {
                    generation,
                    error: err.message.clone(),
                });
                Err(StartError::Request(err))
            }
        }
    }

    /// Saves the model produced by the last completed training job.
    pub async fn save_model(&self) -> Result<String, SaveError> {
        let (generation, job_id) = {
            let state = self.inner.lock_state();
            let job_id = match state.kind() {
                Some(JobKind::Training) => state.last_job_id().map(ToOwned::to_owned),
                _ => None,
            };
            (state.generation(), job_id)
        };

        let Some(job_id) = job_id else {
            let err = SaveError::NothingToSave;
            self.inner.dispatch(Msg::SaveFailed {
                generation,
                error: err.to_string(),
            });
            return Err(err);
        };

        match self.inner.backend.save_model(&job_id).await {
            Ok(model_id) => {
                pipeline_info!("model {} saved from job {}", model_id, job_id);
                self.inner.dispatch(Msg::ModelSaved {
                    generation,
                    model_id: model_id.clone(),
                });
                Ok(model_id)
            }
            Err(err) => {
                pipeline_warn!("saving model from job {} failed: {}", job_id, err);
                self.inner.dispatch(Msg::SaveFailed {
                    generation,
                    error: err.message.clone(),
                });
                Err(SaveError::Request(err))
            }
        }
    }

    /// Cancels every timer and returns to idle. Safe to call in any state.
    pub fn reset(&self) {
        self.inner.dispatch(Msg::ResetRequested);
    }

    pub fn snapshot(&self) -> JobViewModel {
        self.inner.lock_state().view()
    }

    /// Receives a new view model after every state change.
    pub fn subscribe(&self) -> watch::Receiver<JobViewModel> {
        self.inner.view_tx.subscribe()
    }

    /// Resolves with the first view whose status is terminal.
    pub async fn wait_until_settled(&self) -> JobViewModel {
        let mut rx = self.subscribe();
        let view = match rx.wait_for(JobViewModel::is_settled).await {
            Ok(view) => view.clone(),
            Err(_) => self.snapshot(),
        };
        view
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// `true` while a status poll timer is scheduled.
    pub fn is_polling(&self) -> bool {
        self.inner
            .lock_timers()
            .poll
            .as_ref()
            .is_some_and(TimerHandle::is_active)
    }
}

impl PollerInner {
    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.lock_state().is_current(generation)
    }

    /// Applies `msg` and any follow-up messages, running effects as they appear.
    ///
    /// Returns the effects that need an `.await` (submission) or belong to
    /// the caller (start rejection).
    fn dispatch(self: &Arc<Self>, msg: Msg) -> Vec<Effect> {
        let mut inbox = VecDeque::from([msg]);
        let mut deferred = Vec::new();
        while let Some(msg) = inbox.pop_front() {
            for effect in self.apply(msg) {
                match effect {
                    Effect::Submit { .. } | Effect::RejectStart { .. } => deferred.push(effect),
                    other => {
                        if let Some(follow_up) = self.run_effect(other) {
                            inbox.push_back(follow_up);
                        }
                    }
                }
            }
        }
        deferred
    }

    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = self.lock_state();
        let state = std::mem::take(&mut *guard);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.view_tx.send_replace(state.view());
        }
        *guard = state;
        effects
    }

    fn run_effect(self: &Arc<Self>, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::StartPolling {
                generation,
                kind,
                job_id,
            } => {
                self.start_polling(generation, kind, job_id);
                None
            }
            Effect::StopPolling => {
                if let Some(mut poll) = self.lock_timers().poll.take() {
                    pipeline_debug!("stopping status polling");
                    poll.cancel();
                }
                None
            }
            Effect::StartClock { generation } => {
                self.start_clock(generation);
                None
            }
            Effect::StopClock { generation } => {
                let mut timers = self.lock_timers();
                match timers.clock.take() {
                    Some(mut clock) if clock.generation == generation => {
                        clock.handle.cancel();
                        Some(Msg::ClockTick {
                            generation,
                            elapsed: clock.started_at.elapsed(),
                        })
                    }
                    other => {
                        timers.clock = other;
                        None
                    }
                }
            }
            Effect::ScheduleAutoReset { generation, kind } => {
                let delay = self.settings.auto_reset_after(kind)?;
                let weak = Arc::downgrade(self);
                let handle = TimerHandle::once(&self.runtime, delay, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.dispatch(Msg::AutoResetDue { generation });
                    }
                });
                self.lock_timers().auto_reset = Some(handle);
                None
            }
            Effect::CancelAutoReset => {
                if let Some(mut handle) = self.lock_timers().auto_reset.take() {
                    handle.cancel();
                }
                None
            }
            Effect::Notify(notice) => {
                self.notifier.enqueue(notice);
                None
            }
            Effect::Submit { .. } | Effect::RejectStart { .. } => None,
        }
    }

    fn start_polling(self: &Arc<Self>, generation: Generation, kind: JobKind, job_id: JobId) {
        pipeline_info!(
            "polling {} job {} every {:?}",
            kind,
            job_id,
            self.settings.poll_interval
        );
        let weak: Weak<PollerInner> = Arc::downgrade(self);
        let handle = TimerHandle::repeating(&self.runtime, self.settings.poll_interval, move || {
            let weak = weak.clone();
            let job_id = job_id.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                if !inner.is_current(generation) {
                    return ControlFlow::Break(());
                }
                let msg = match inner.backend.status(kind, &job_id).await {
                    Ok(report) => {
                        pipeline_debug!(
                            "{} job {} status={:?} progress={:?}",
                            kind,
                            job_id,
                            report.status,
                            report.progress
                        );
                        Msg::StatusReceived { generation, report }
                    }
                    Err(err) => {
                        pipeline_warn!("{} job {} status poll failed: {}", kind, job_id, err);
                        Msg::PollFailed {
                            generation,
                            error: err.message,
                        }
                    }
                };
                inner.dispatch(msg);

                let still_polling = {
                    let state = inner.lock_state();
                    state.is_current(generation) && state.job_id().is_some()
                };
                if still_polling {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        });

        let mut timers = self.lock_timers();
        if let Some(mut previous) = timers.poll.replace(handle) {
            previous.cancel();
        }
    }

    fn start_clock(self: &Arc<Self>, generation: Generation) {
        let started_at = Instant::now();
        let weak: Weak<PollerInner> = Arc::downgrade(self);
        let handle = TimerHandle::repeating(&self.runtime, self.settings.clock_interval, move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                if !inner.is_current(generation) {
                    return ControlFlow::Break(());
                }
                inner.dispatch(Msg::ClockTick {
                    generation,
                    elapsed: started_at.elapsed(),
                });
                ControlFlow::Continue(())
            }
        });

        let mut timers = self.lock_timers();
        if let Some(mut previous) = timers.clock.replace(Clock {
            generation,
            started_at,
            handle,
        }) {
            previous.handle.cancel();
        }
    }
}
