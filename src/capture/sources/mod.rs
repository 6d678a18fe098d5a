//! Screen capture backends and the fallback order between them.

use crate::capture::types::{CaptureError, CaptureType};

mod portal;
pub(crate) mod reader;
mod wlroots;

/// Captures `capture_type` and returns encoded image bytes.
///
/// The compositor tools are tried first. A tool failure falls back to the desktop
/// portal; a dismissed selection does not.
pub async fn capture_image(capture_type: CaptureType) -> Result<Vec<u8>, CaptureError> {
    let fast_path = match capture_type {
        CaptureType::FullScreen => wlroots::capture_full_screen().await,
        CaptureType::ActiveWindow => wlroots::capture_active_window().await,
        CaptureType::SelectedWindow => wlroots::capture_selected_window().await,
        CaptureType::Region | CaptureType::Freehand => wlroots::capture_region().await,
    };

    match fast_path {
        Ok(data) => Ok(data),
        Err(CaptureError::Cancelled(reason)) => Err(CaptureError::Cancelled(reason)),
        Err(e) => {
            log::warn!(
                "{:?} capture via grim/slurp failed: {}. Falling back to portal.",
                capture_type,
                e
            );
            portal::capture_via_portal_bytes(capture_type).await
        }
    }
}
