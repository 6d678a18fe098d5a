use async_trait::async_trait;

use crate::capture::{
    clipboard, sources,
    types::{CaptureError, CaptureType, ClipboardData},
};

/// Abstraction over how image data is captured for the different capture types.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self, capture_type: CaptureType) -> Result<Vec<u8>, CaptureError>;
}

/// Abstraction over reading the current clipboard selection.
#[async_trait]
pub trait ClipboardReader: Send + Sync {
    async fn read(&self) -> Result<ClipboardData, CaptureError>;
}

/// grim/slurp with portal fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopCaptureSource;

/// wl-clipboard-rs paste side.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaylandClipboardReader;

#[async_trait]
impl CaptureSource for DesktopCaptureSource {
    async fn capture(&self, capture_type: CaptureType) -> Result<Vec<u8>, CaptureError> {
        sources::capture_image(capture_type).await
    }
}

#[async_trait]
impl ClipboardReader for WaylandClipboardReader {
    async fn read(&self) -> Result<ClipboardData, CaptureError> {
        tokio::task::spawn_blocking(clipboard::read_clipboard)
            .await
            .map_err(|e| CaptureError::ClipboardError(format!("clipboard task failed: {}", e)))?
    }
}
