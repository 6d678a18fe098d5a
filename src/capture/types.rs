//! Data types for screen capture and clipboard acquisition.

use std::path::PathBuf;
use thiserror::Error;

/// Type of screenshot capture to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureType {
    /// Capture the entire screen (all outputs).
    FullScreen,
    /// Capture the currently focused window.
    ActiveWindow,
    /// Let the user click the window to capture.
    SelectedWindow,
    /// Capture a user-selected rectangular region.
    Region,
    /// Freehand selection; captured as the selection's bounding box.
    Freehand,
}

/// Content read from the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardData {
    /// Encoded image bytes and their MIME type.
    Image { data: Vec<u8>, mime_type: String },
    Text(String),
    /// Files copied in a file manager.
    Files(Vec<PathBuf>),
    Empty,
}

/// Errors that can occur while acquiring content.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("D-Bus communication error: {0}")]
    DBusError(#[from] zbus::Error),

    #[error("Capture tool failed: {0}")]
    ToolFailed(String),

    #[error("Clipboard operation failed: {0}")]
    ClipboardError(String),

    #[error("Failed to read captured data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Portal returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("Capture cancelled: {0}")]
    Cancelled(String),
}
