use crate::capture::{
    portal,
    types::{CaptureError, CaptureType},
};

use super::reader::read_image_from_uri;

/// Runs the portal request, then reads the file it produced off the runtime threads.
pub async fn capture_via_portal_bytes(capture_type: CaptureType) -> Result<Vec<u8>, CaptureError> {
    let uri = portal::capture_via_portal(capture_type).await?;
    log::debug!("Portal returned URI: {}", uri);

    tokio::task::spawn_blocking(move || read_image_from_uri(&uri))
        .await
        .map_err(|e| CaptureError::ToolFailed(format!("portal reader task failed: {}", e)))?
}
