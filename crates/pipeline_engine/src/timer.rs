use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest period a repeating timer runs with.
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// A scheduled task that stops when cancelled or dropped.
///
/// Cancellation aborts the task at its next suspension point, so a callback
/// that is mid-flight when `cancel` runs never reaches its next tick.
#[derive(Debug, Default)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Runs `tick` immediately and then every `period` until it returns
    /// `ControlFlow::Break` or the handle is cancelled. Ticks never overlap.
    /// A `period` below [`MIN_TIMER_PERIOD`] is raised to it.
    pub fn repeating<F, Fut>(runtime: &Handle, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let period = period.max(MIN_TIMER_PERIOD);
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick().await.is_break() {
                    break;
                }
            }
        });
        Self { task: Some(task) }
    }

    /// Runs `callback` once after `delay` unless cancelled first.
    pub fn once<F>(runtime: &Handle, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Self { task: Some(task) }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// `true` until cancelled or the task has run to completion.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
