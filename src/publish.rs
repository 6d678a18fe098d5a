//! Result publishing: the clipboard and a desktop notification.

use crate::capture::{CaptureError, clipboard};
use crate::job::{JobReport, UploadOutcome};
use crate::util::PRODUCT_NAME;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use zbus::{Connection, proxy};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Clipboard(#[from] CaptureError),

    #[error("Failed to send notification: {0}")]
    Notification(#[from] zbus::Error),
}

/// Where finished jobs announce themselves.
///
/// The clipboard calls block and are run off the async threads by the caller.
#[async_trait]
pub trait ResultSink: Send + Sync {
    fn set_clipboard_text(&self, text: &str) -> Result<(), PublishError>;

    fn set_clipboard_image(&self, data: &[u8], mime_type: &str) -> Result<(), PublishError>;

    async fn display_results(&self, report: &JobReport) -> Result<(), PublishError>;
}

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Returns the notification id.
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Wayland clipboard plus freedesktop notifications.
#[derive(Debug, Clone)]
pub struct DesktopSink {
    notify: bool,
    timeout_ms: i32,
}

impl DesktopSink {
    pub fn new(notify: bool) -> Self {
        Self {
            notify,
            timeout_ms: 5000,
        }
    }
}

impl Default for DesktopSink {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ResultSink for DesktopSink {
    fn set_clipboard_text(&self, text: &str) -> Result<(), PublishError> {
        clipboard::copy_text(text)?;
        Ok(())
    }

    fn set_clipboard_image(&self, data: &[u8], mime_type: &str) -> Result<(), PublishError> {
        clipboard::copy_image(data, mime_type)?;
        Ok(())
    }

    async fn display_results(&self, report: &JobReport) -> Result<(), PublishError> {
        if !self.notify {
            return Ok(());
        }
        let (summary, body) = summarize(report);

        let connection = Connection::session().await?;
        let proxy = NotificationsProxy::new(&connection).await?;
        let icon = if report.has_upload_errors() {
            "dialog-warning"
        } else {
            "camera-photo"
        };
        proxy
            .notify(
                PRODUCT_NAME,
                0,
                icon,
                &summary,
                &body,
                vec![],
                HashMap::new(),
                self.timeout_ms,
            )
            .await?;
        Ok(())
    }
}

/// Notification title and body for a finished job.
pub fn summarize(report: &JobReport) -> (String, String) {
    let mut lines = Vec::new();
    for upload in &report.uploads {
        match &upload.outcome {
            UploadOutcome::Success(location) => lines.push(location.clone()),
            UploadOutcome::Error(message) => {
                lines.push(format!("{}: {}", upload.destination, message))
            }
        }
    }
    if let Some(path) = &report.local_path {
        lines.push(path.display().to_string());
    }

    let failed = report.uploads.iter().filter(|u| u.is_error()).count();
    let summary = if report.uploads.is_empty() {
        if report.local_path.is_some() {
            "Capture saved".to_string()
        } else {
            "Capture complete".to_string()
        }
    } else if failed == 0 {
        "Upload complete".to_string()
    } else {
        format!("{} of {} uploads failed", failed, report.uploads.len())
    };

    (summary, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::UploadResult;
    use std::path::PathBuf;

    #[test]
    fn summary_lists_links_then_errors_in_order() {
        let mut report = JobReport::new(7);
        report.uploads = vec![
            UploadResult::success("imgur", "https://i.imgur.com/a.png"),
            UploadResult::error("paste", "network error"),
        ];
        report.local_path = Some(PathBuf::from("/tmp/shot.png"));

        let (summary, body) = summarize(&report);
        assert_eq!(summary, "1 of 2 uploads failed");
        assert_eq!(
            body,
            "https://i.imgur.com/a.png\npaste: network error\n/tmp/shot.png"
        );
    }

    #[test]
    fn local_only_jobs_report_the_saved_file() {
        let mut report = JobReport::new(1);
        report.local_path = Some(PathBuf::from("/tmp/shot.png"));
        assert_eq!(summarize(&report).0, "Capture saved");

        report.uploads.push(UploadResult::success("imgur", "https://x/y"));
        assert_eq!(summarize(&report).0, "Upload complete");
    }

    #[tokio::test]
    async fn disabled_notifications_do_nothing() {
        let sink = DesktopSink::new(false);
        assert!(sink.display_results(&JobReport::new(1)).await.is_ok());
    }
}
