//! Data types for jobs and their reports.

use crate::capture::{CaptureError, CaptureType};
use crate::upload::Uploader;
use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// What a job acquires its content from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// A rectangle chosen by the user.
    Region,
    ActiveWindow,
    /// A window picked by clicking on it.
    SelectedWindow,
    EntireScreen,
    /// A freehand selection.
    Freehand,
    /// Whatever the clipboard currently holds.
    Clipboard,
    /// A file already on disk.
    File(PathBuf),
}

impl JobKind {
    /// The capture request for screen-capture kinds.
    pub fn capture_type(&self) -> Option<CaptureType> {
        match self {
            JobKind::Region => Some(CaptureType::Region),
            JobKind::ActiveWindow => Some(CaptureType::ActiveWindow),
            JobKind::SelectedWindow => Some(CaptureType::SelectedWindow),
            JobKind::EntireScreen => Some(CaptureType::FullScreen),
            JobKind::Freehand => Some(CaptureType::Freehand),
            JobKind::Clipboard | JobKind::File(_) => None,
        }
    }
}

/// Where a job's result should go.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDestination {
    Clipboard,
    LocalDisk,
    RemoteHost,
    SharedFolder,
    Printer,
}

impl OutputDestination {
    pub const ALL: [OutputDestination; 5] = [
        OutputDestination::Clipboard,
        OutputDestination::LocalDisk,
        OutputDestination::RemoteHost,
        OutputDestination::SharedFolder,
        OutputDestination::Printer,
    ];

    /// Command line code.
    pub fn code(self) -> u8 {
        match self {
            OutputDestination::Clipboard => 0,
            OutputDestination::LocalDisk => 1,
            OutputDestination::RemoteHost => 2,
            OutputDestination::SharedFolder => 3,
            OutputDestination::Printer => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputDestination::Clipboard => "clipboard",
            OutputDestination::LocalDisk => "local disk",
            OutputDestination::RemoteHost => "remote host",
            OutputDestination::SharedFolder => "shared folder",
            OutputDestination::Printer => "printer",
        }
    }
}

/// What is put on the clipboard once a job finishes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardContent {
    /// The image or text itself.
    Data,
    /// Path of the saved file.
    Local,
    /// First uploaded URL, or the saved path when nothing was uploaded.
    Remote,
}

impl ClipboardContent {
    pub const ALL: [ClipboardContent; 3] = [
        ClipboardContent::Data,
        ClipboardContent::Local,
        ClipboardContent::Remote,
    ];

    pub fn code(self) -> u8 {
        match self {
            ClipboardContent::Data => 0,
            ClipboardContent::Local => 1,
            ClipboardContent::Remote => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            ClipboardContent::Data => "data",
            ClipboardContent::Local => "local path",
            ClipboardContent::Remote => "remote URL",
        }
    }
}

/// Adapters chosen for a job, per content kind.
#[derive(Clone, Default)]
pub struct UploaderSelection {
    pub image: Vec<Arc<dyn Uploader>>,
    pub text: Vec<Arc<dyn Uploader>>,
    pub file: Vec<Arc<dyn Uploader>>,
    pub link: Vec<Arc<dyn Uploader>>,
    /// Target of the SharedFolder output.
    pub shared_folder: Option<Arc<dyn Uploader>>,
}

impl fmt::Debug for UploaderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Arc<dyn Uploader>]| list.iter().map(|u| u.name().to_string()).collect::<Vec<_>>();
        f.debug_struct("UploaderSelection")
            .field("image", &names(&self.image))
            .field("text", &names(&self.text))
            .field("file", &names(&self.file))
            .field("link", &names(&self.link))
            .field("shared_folder", &self.shared_folder.as_ref().map(|u| u.name().to_string()))
            .finish()
    }
}

/// One unit of work. Immutable once handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Job {
    id: u64,
    pub kind: JobKind,
    pub outputs: Vec<OutputDestination>,
    pub uploaders: UploaderSelection,
    pub clipboard_content: ClipboardContent,
    pub overwrite: bool,
    /// Wait before capturing (gives the user time to arrange the screen).
    pub capture_delay: Duration,
    pub created_at: DateTime<Local>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            outputs: vec![OutputDestination::Clipboard, OutputDestination::LocalDisk],
            uploaders: UploaderSelection::default(),
            clipboard_content: ClipboardContent::Remote,
            overwrite: false,
            capture_delay: Duration::ZERO,
            created_at: Local::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Sets the outputs; duplicates are dropped, first occurrence wins.
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = OutputDestination>) -> Self {
        let mut unique = Vec::new();
        for output in outputs {
            if !unique.contains(&output) {
                unique.push(output);
            }
        }
        self.outputs = unique;
        self
    }

    pub fn with_uploaders(mut self, uploaders: UploaderSelection) -> Self {
        self.uploaders = uploaders;
        self
    }

    pub fn with_clipboard_content(mut self, content: ClipboardContent) -> Self {
        self.clipboard_content = content;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    pub fn wants(&self, output: OutputDestination) -> bool {
        self.outputs.contains(&output)
    }
}

/// Pipeline states. `Canceled` and `Failed` are only reachable from `Acquiring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Acquiring,
    PostProcessing,
    Persisting,
    Uploading,
    Publishing,
    Completed,
    Canceled,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Created => "created",
            JobState::Acquiring => "acquiring",
            JobState::PostProcessing => "post-processing",
            JobState::Persisting => "persisting",
            JobState::Uploading => "uploading",
            JobState::Publishing => "publishing",
            JobState::Completed => "completed",
            JobState::Canceled => "canceled",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one destination attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// URL, or a path for folder-style destinations.
    Success(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub destination: String,
    pub outcome: UploadOutcome,
    pub timestamp: DateTime<Local>,
}

impl UploadResult {
    pub fn success(destination: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            outcome: UploadOutcome::Success(location.into()),
            timestamp: Local::now(),
        }
    }

    pub fn error(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            outcome: UploadOutcome::Error(message.into()),
            timestamp: Local::now(),
        }
    }

    pub fn location(&self) -> Option<&str> {
        match &self.outcome {
            UploadOutcome::Success(location) => Some(location.as_str()),
            UploadOutcome::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Error(_))
    }
}

/// Errors that end a job before anything was produced.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Canceled: {0}")]
    Canceled(String),
}

impl From<CaptureError> for JobError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Cancelled(reason) => JobError::Canceled(reason),
            other => JobError::Acquisition(other.to_string()),
        }
    }
}

/// Everything a finished job produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: u64,
    pub state: JobState,
    /// States visited, in order, ending with `state`.
    pub trace: Vec<JobState>,
    pub local_path: Option<PathBuf>,
    pub uploads: Vec<UploadResult>,
    pub warnings: Vec<String>,
    /// Why the job was canceled or failed.
    pub error: Option<String>,
}

impl JobReport {
    pub fn new(job_id: u64) -> Self {
        Self {
            job_id,
            state: JobState::Created,
            trace: vec![JobState::Created],
            local_path: None,
            uploads: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn enter(&mut self, state: JobState) {
        log::info!("Job {}: {} -> {}", self.job_id, self.state, state);
        self.state = state;
        self.trace.push(state);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("Job {}: {}", self.job_id, message);
        self.warnings.push(message);
    }

    /// Successful upload locations, in selection order.
    pub fn links(&self) -> Vec<&str> {
        self.uploads.iter().filter_map(UploadResult::location).collect()
    }

    /// First successful upload location.
    pub fn first_link(&self) -> Option<&str> {
        self.uploads.iter().find_map(UploadResult::location)
    }

    pub fn has_upload_errors(&self) -> bool {
        self.uploads.iter().any(UploadResult::is_error)
    }
}
