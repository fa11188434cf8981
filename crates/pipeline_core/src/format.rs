use std::time::Duration;

use serde_json::Value;

/// Clamps a reported progress percentage into `[0, 100]`. Non-finite input reads as 0.
pub fn clamp_progress(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `"42s"` below a minute, `"3m 7s"` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {remaining}s")
    } else {
        format!("{remaining}s")
    }
}

/// Renders a training metric. Numbers below 1000 get four decimals, larger
/// ones are grouped with at most two decimals. Null and empty values yield `None`.
pub fn format_metric_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => {
            let number = number.as_f64()?;
            if number.abs() >= 1000.0 {
                Some(group_thousands(number))
            } else {
                Some(format!("{number:.4}"))
            }
        }
        other => Some(other.to_string()),
    }
}

fn group_thousands(number: f64) -> String {
    let fixed = format!("{:.2}", number.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if number < 0.0 { "-" } else { "" };
    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}
