use std::io::Write;

use chrono::Local;
use pipeline_core::{Notice, NoticeKind};
use pipeline_engine::ToastSink;
use pipeline_logging::{pipeline_debug, pipeline_info, pipeline_warn};

/// Prints each notification to stderr with a local timestamp.
#[derive(Debug, Default)]
pub struct TerminalToastSink;

impl TerminalToastSink {
    pub fn format(notice: &Notice) -> String {
        let marker = match notice.kind {
            NoticeKind::Success => "ok",
            NoticeKind::Info => "info",
            NoticeKind::Error => "error",
        };
        match &notice.title {
            Some(title) => format!("[{marker}] {title}: {}", notice.message),
            None => format!("[{marker}] {}", notice.message),
        }
    }
}

impl ToastSink for TerminalToastSink {
    fn show(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Error => pipeline_warn!("Notification: {}", notice.message),
            _ => pipeline_info!("Notification: {}", notice.message),
        }
        let stamp = Local::now().format("%H:%M:%S");
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{stamp} {}", Self::format(notice));
    }

    fn dismiss(&self, notice: &Notice) {
        pipeline_debug!("Notification dismissed: {}", notice.key());
    }
}
