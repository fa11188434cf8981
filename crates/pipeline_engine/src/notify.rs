use std::sync::{Arc, Mutex, MutexGuard, Weak};

use pipeline_core::{EnqueueOutcome, Notice, NoticeQueue};
use pipeline_logging::pipeline_debug;
use tokio::runtime::Handle;

/// Presentation side of the notifier.
pub trait ToastSink: Send + Sync {
    fn show(&self, notice: &Notice);

    /// Called when the notice's display time is over, before the gap.
    fn dismiss(&self, _notice: &Notice) {}
}

/// Process-wide notification coalescer.
///
/// Shows one notice at a time in submission order, drops notices whose key is
/// already waiting or showing, and keeps `after_delay` of quiet time between
/// consecutive notices. Clones share the same queue.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    queue: Mutex<NoticeQueue>,
    sink: Arc<dyn ToastSink>,
    runtime: Handle,
}

impl Notifier {
    /// Must be called from within a Tokio runtime; display timers run on it.
    pub fn new(sink: Arc<dyn ToastSink>) -> Self {
        Self::with_runtime(sink, Handle::current())
    }

    pub fn with_runtime(sink: Arc<dyn ToastSink>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                queue: Mutex::new(NoticeQueue::new()),
                sink,
                runtime,
            }),
        }
    }

    pub fn enqueue(&self, notice: Notice) -> EnqueueOutcome {
        let key = notice.key();
        let outcome = self.inner.lock_queue().enqueue(notice);
        match outcome {
            EnqueueOutcome::Queued => show_next(&self.inner),
            EnqueueOutcome::Duplicate => pipeline_debug!("dropping duplicate notice {}", key),
        }
        outcome
    }

    pub fn success(&self, message: impl Into<String>) -> EnqueueOutcome {
        self.enqueue(Notice::success(message))
    }

    pub fn info(&self, message: impl Into<String>) -> EnqueueOutcome {
        self.enqueue(Notice::info(message))
    }

    pub fn error(&self, message: impl Into<String>) -> EnqueueOutcome {
        self.enqueue(Notice::error(message))
    }

    /// Like [`Notifier::success`], with `options` setting key, title or timing:
    /// `notifier.success_with("Saved", |n| n.with_key("save"))`.
    pub fn success_with(
        &self,
        message: impl Into<String>,
        options: impl FnOnce(Notice) -> Notice,
    ) -> EnqueueOutcome {
        self.enqueue(options(Notice::success(message)))
    }

    pub fn info_with(
        &self,
        message: impl Into<String>,
        options: impl FnOnce(Notice) -> Notice,
    ) -> EnqueueOutcome {
        self.enqueue(options(Notice::info(message)))
    }

    pub fn error_with(
        &self,
        message: impl Into<String>,
        options: impl FnOnce(Notice) -> Notice,
    ) -> EnqueueOutcome {
        self.enqueue(options(Notice::error(message)))
    }

    /// `true` while a notice with `key` is waiting or showing.
    pub fn is_active(&self, key: &str) -> bool {
        self.inner.lock_queue().is_active(key)
    }

    /// `true` when nothing is showing or waiting.
    pub fn is_idle(&self) -> bool {
        self.inner.lock_queue().is_idle()
    }
}

impl NotifierInner {
    fn lock_queue(&self) -> MutexGuard<'_, NoticeQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn show_next(inner: &Arc<NotifierInner>) {
    let next = inner.lock_queue().begin_next();
    let Some(notice) = next else {
        return;
    };

    inner.sink.show(&notice);

    let weak: Weak<NotifierInner> = Arc::downgrade(inner);
    inner.runtime.spawn(async move {
        tokio::time::sleep(notice.duration).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.sink.dismiss(&notice);
        drop(inner);

        tokio::time::sleep(notice.after_delay).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.lock_queue().finish_current();
        show_next(&inner);
    });
}
