use pipeline_core::{format_metric_value, JobKind, JobStatus, JobViewModel};
use serde_json::Value;

/// One status line, e.g. `running    42%  12s  Dropping duplicates`.
pub fn progress_line(view: &JobViewModel) -> String {
    let mut line = format!(
        "{:<9} {:>3}%  {}",
        view.status.as_str(),
        view.percent(),
        view.elapsed_label()
    );
    if !view.message.is_empty() {
        line.push_str("  ");
        line.push_str(&view.message);
    }
    line
}

/// Lines printed once the job has settled.
pub fn summary_lines(view: &JobViewModel) -> Vec<String> {
    let label = view.kind.map_or("Job", JobKind::label);

    match view.status {
        JobStatus::Completed => {
            let mut lines = vec![format!("{label} completed in {}", view.elapsed_label())];
            match (view.kind, &view.result) {
                (Some(JobKind::Training), Some(result)) => lines.extend(training_lines(result)),
                (_, Some(result)) => lines.extend(json_lines(result)),
                (_, None) => {}
            }
            if let Some(model_id) = &view.saved_model_id {
                lines.push(format!("Model ID: {model_id}"));
            }
            lines
        }
        JobStatus::Failed => vec![format!(
            "{label} failed after {}: {}",
            view.elapsed_label(),
            view.error.as_deref().unwrap_or(&view.message)
        )],
        other => vec![format!("{label} is {}", other.as_str())],
    }
}

/// `NAME: value` for each displayable entry of `best_model.metrics`.
pub fn metric_lines(result: &Value) -> Vec<String> {
    let Some(metrics) = result
        .get("best_model")
        .and_then(|best| best.get("metrics"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    metrics
        .iter()
        .filter_map(|(key, value)| {
            let formatted = format_metric_value(value)?;
            Some(format!("  {}: {formatted}", key.replace('_', " ").to_uppercase()))
        })
        .collect()
}

fn training_lines(result: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    let best = result.get("best_model");
    if let Some(name) = best.and_then(|best| best.get("model_name")).and_then(Value::as_str) {
        match best.and_then(|best| best.get("model_type")).and_then(Value::as_str) {
            Some(model_type) => lines.push(format!("Best model: {name} ({model_type})")),
            None => lines.push(format!("Best model: {name}")),
        }
    }
    lines.extend(metric_lines(result));
    if let Some(seconds) = best
        .and_then(|best| best.get("training_time"))
        .and_then(Value::as_f64)
    {
        lines.push(format!("Training time: {seconds:.2}s"));
    }
    lines
}

fn json_lines(result: &Value) -> Vec<String> {
    serde_json::to_string_pretty(result)
        .map(|text| text.lines().map(str::to_owned).collect())
        .unwrap_or_default()
}
