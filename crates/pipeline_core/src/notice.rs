use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

/// How long a notice stays on screen.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(2800);
/// Gap after a notice is dismissed before the next one may show.
pub const DEFAULT_AFTER_DELAY: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Info => "info",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub title: Option<String>,
    pub duration: Duration,
    pub after_delay: Duration,
    /// Explicit de-duplication key; falls back to kind and message.
    pub id_key: Option<String>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            title: None,
            duration: DEFAULT_DURATION,
            after_delay: DEFAULT_AFTER_DELAY,
            id_key: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = Some(key.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_after_delay(mut self, after_delay: Duration) -> Self {
        self.after_delay = after_delay;
        self
    }

    /// De-duplication identity: `id_key`, else `"{kind}::{message}"`.
    pub fn key(&self) -> String {
        match &self.id_key {
            Some(key) => key.clone(),
            None => format!("{}::{}", self.kind, self.message),
        }
    }

    /// Display time plus the gap before the next notice.
    pub fn window(&self) -> Duration {
        self.duration + self.after_delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// A notice with the same key is waiting or showing.
    Duplicate,
}

/// FIFO of pending notices with at most one showing and one active entry per key.
///
/// Timing is left to the caller: `begin_next` when nothing is showing, and
/// `finish_current` once the shown notice's window has elapsed.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue {
    pending: VecDeque<Notice>,
    showing: Option<Notice>,
    active: HashSet<String>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, notice: Notice) -> EnqueueOutcome {
        if !self.active.insert(notice.key()) {
            return EnqueueOutcome::Duplicate;
        }
        self.pending.push_back(notice);
        EnqueueOutcome::Queued
    }

    /// Moves the head of the queue to showing. `None` if one is already showing
    /// or the queue is empty.
    pub fn begin_next(&mut self) -> Option<Notice> {
        if self.showing.is_some() {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.showing = Some(next.clone());
        Some(next)
    }

    /// Ends the current notice's window and releases its key.
    pub fn finish_current(&mut self) -> Option<Notice> {
        let done = self.showing.take()?;
        self.active.remove(&done.key());
        Some(done)
    }

    pub fn showing(&self) -> Option<&Notice> {
        self.showing.as_ref()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    /// Number of notices waiting, excluding the one showing.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.showing.is_none() && self.pending.is_empty()
    }
}
