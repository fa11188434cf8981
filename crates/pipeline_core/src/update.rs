use crate::{
    clamp_progress, Effect, Generation, JobKind, JobRequest, JobState, JobStatus, Msg, Notice,
    StatusReport,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages tagged with a generation other than the current one are stale
/// (issued before a reset or a newer start) and leave the state untouched.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested(request) => start(&mut state, request),
        Msg::StartAccepted { generation, job_id } => {
            if !state.is_current(generation) || state.status() != JobStatus::Queued {
                return (state, Vec::new());
            }
            let Some(kind) = state.kind() else {
                return (state, Vec::new());
            };
            state.accept(job_id.clone());
            vec![
                Effect::StartPolling {
                    generation,
                    kind,
                    job_id,
                },
                Effect::Notify(started_notice(kind)),
            ]
        }
        Msg::StartFailed { generation, error } => {
            if !state.is_current(generation) || state.status() != JobStatus::Queued {
                return (state, Vec::new());
            }
            let kind = state.kind().unwrap_or(JobKind::Preprocess);
            state.fail(error.clone(), 0.0, String::new());
            vec![
                Effect::StopClock { generation },
                Effect::Notify(start_failed_notice(kind, &error)),
                Effect::ScheduleAutoReset { generation, kind },
            ]
        }
        Msg::StatusReceived { generation, report } => {
            if !is_polling(&state, generation) {
                return (state, Vec::new());
            }
            apply_report(&mut state, report)
        }
        Msg::PollFailed { generation, error } => {
            if !is_polling(&state, generation) {
                return (state, Vec::new());
            }
            let kind = state.kind().unwrap_or(JobKind::Preprocess);
            let notice = Notice::error(format!("Progress tracking failed: {error}"));
            state.fail(error, 100.0, "Progress tracking interrupted".to_string());
            terminal_effects(generation, kind, notice)
        }
        Msg::ClockTick {
            generation,
            elapsed,
        } => {
            if state.is_current(generation) {
                state.set_elapsed(elapsed);
            }
            Vec::new()
        }
        Msg::AutoResetDue { generation } => {
            if state.is_current(generation) && state.status().is_terminal() {
                state.clear();
            }
            Vec::new()
        }
        Msg::ModelSaved {
            generation,
            model_id,
        } => {
            if !state.is_current(generation) {
                return (state, Vec::new());
            }
            state.set_saved_model_id(model_id);
            vec![Effect::Notify(
                Notice::success("Model saved successfully").with_key("train-save-success"),
            )]
        }
        Msg::SaveFailed { generation, error } => {
            if !state.is_current(generation) {
                return (state, Vec::new());
            }
            vec![Effect::Notify(
                Notice::error(error).with_key("train-save-error"),
            )]
        }
        Msg::ResetRequested => {
            let generation = state.generation();
            state.clear();
            vec![
                Effect::StopPolling,
                Effect::StopClock { generation },
                Effect::CancelAutoReset,
            ]
        }
    };

    (state, effects)
}

fn start(state: &mut JobState, request: JobRequest) -> Vec<Effect> {
    let kind = request.kind();
    if let Err(reason) = request.validate() {
        return vec![
            Effect::Notify(validation_notice(&request, &reason)),
            Effect::RejectStart { reason },
        ];
    }

    state.begin(kind);
    let generation = state.generation();
    vec![
        Effect::StopPolling,
        Effect::CancelAutoReset,
        Effect::StartClock { generation },
        Effect::Submit {
            generation,
            request,
        },
    ]
}

fn is_polling(state: &JobState, generation: Generation) -> bool {
    state.is_current(generation) && state.job_id().is_some() && !state.status().is_terminal()
}

fn apply_report(state: &mut JobState, report: StatusReport) -> Vec<Effect> {
    let generation = state.generation();
    let kind = state.kind().unwrap_or(JobKind::Preprocess);
    let label = kind.label();

    match report.status {
        Some(JobStatus::Completed) => {
            let message = report
                .message
                .unwrap_or_else(|| format!("{label} complete"));
            state.complete(report.result, message);
            terminal_effects(generation, kind, completed_notice(kind))
        }
        Some(JobStatus::Failed) => {
            let error = report.error.unwrap_or_else(|| format!("{label} failed"));
            let progress = report
                .progress
                .map(clamp_progress)
                .unwrap_or_else(|| state.progress());
            let message = report
                .message
                .unwrap_or_else(|| format!("{label} failed"));
            let notice = Notice::error(error.clone());
            state.fail(error, progress, message);
            terminal_effects(generation, kind, notice)
        }
        status => {
            if let Some(status) = status {
                state.advance(status);
            }
            if let Some(progress) = report.progress {
                state.set_progress(clamp_progress(progress));
            }
            if let Some(message) = report.message {
                state.set_message(message);
            }
            Vec::new()
        }
    }
}

fn terminal_effects(generation: Generation, kind: JobKind, notice: Notice) -> Vec<Effect> {
    vec![
        Effect::StopPolling,
        Effect::StopClock { generation },
        Effect::Notify(notice),
        Effect::ScheduleAutoReset { generation, kind },
    ]
}

fn validation_notice(request: &JobRequest, reason: &str) -> Notice {
    let notice = Notice::error(reason);
    match request {
        JobRequest::Training(training)
            if !training.filename.trim().is_empty() && training.target_column.trim().is_empty() =>
        {
            notice.with_key("train-select-target")
        }
        _ => notice,
    }
}

fn started_notice(kind: JobKind) -> Notice {
    match kind {
        JobKind::Preprocess => Notice::success(
            "Preprocessing started. Hang tight while we work through your steps.",
        ),
        JobKind::Training => Notice::success("Training job started!").with_key("train-started"),
        JobKind::FeatureEngineering => {
            Notice::success("Feature engineering started. We'll keep you posted on progress.")
        }
    }
}

fn start_failed_notice(kind: JobKind, error: &str) -> Notice {
    match kind {
        JobKind::Preprocess => Notice::error(format!("Failed to preprocess: {error}")),
        JobKind::Training => Notice::error(error).with_key("train-start-error"),
        JobKind::FeatureEngineering => {
            Notice::error(format!("Failed to start feature engineering: {error}"))
        }
    }
}

fn completed_notice(kind: JobKind) -> Notice {
    match kind {
        JobKind::Preprocess => Notice::success("Preprocessing completed!"),
        JobKind::Training => Notice::info("Model training complete").with_key("train-complete"),
        JobKind::FeatureEngineering => Notice::success("Feature engineering completed!"),
    }
}
