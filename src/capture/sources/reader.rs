use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crate::capture::types::CaptureError;

const POLL_ATTEMPTS: usize = 60;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Reads the screenshot behind a portal `file://` URI and deletes the temporary file.
pub fn read_image_from_uri(uri: &str) -> Result<Vec<u8>, CaptureError> {
    let path = uri_to_path(uri)?;
    let data = read_when_ready(&path, POLL_ATTEMPTS, POLL_INTERVAL)?;
    log::debug!("Read {} bytes from {}", data.len(), path.display());

    if let Err(e) = fs::remove_file(&path) {
        log::warn!("Failed to remove portal temp file {}: {}", path.display(), e);
    }
    Ok(data)
}

fn uri_to_path(uri: &str) -> Result<PathBuf, CaptureError> {
    let url = url::Url::parse(uri)
        .map_err(|e| CaptureError::InvalidResponse(format!("Invalid file URI '{}': {}", uri, e)))?;
    if url.scheme() != "file" {
        return Err(CaptureError::InvalidResponse(format!(
            "Expected a file URI, got '{}'",
            uri
        )));
    }
    url.to_file_path()
        .map_err(|_| CaptureError::InvalidResponse(format!("Cannot convert URI to path: {}", uri)))
}

/// Some portals hand out the URI before the file is flushed; poll until it has content.
fn read_when_ready(path: &Path, attempts: usize, interval: Duration) -> Result<Vec<u8>, CaptureError> {
    for attempt in 1..=attempts {
        match fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => return Ok(bytes),
            Ok(_) => log::trace!("{} still empty ({}/{})", path.display(), attempt, attempts),
            Err(e) => log::trace!("{} not ready ({}/{}): {}", path.display(), attempt, attempts, e),
        }
        if attempt < attempts {
            thread::sleep(interval);
        }
    }
    Err(CaptureError::ToolFailed(format!(
        "screenshot file {} not ready after {} attempts",
        path.display(),
        attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_and_removes_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("capture file.png");
        fs::write(&file_path, b"portal-bytes").unwrap();
        let uri = url::Url::from_file_path(&file_path).unwrap().to_string();
        assert!(uri.contains("%20"));

        let data = read_image_from_uri(&uri).unwrap();
        assert_eq!(data, b"portal-bytes");
        assert!(!file_path.exists());
    }

    #[test]
    fn non_file_uris_are_rejected() {
        let err = read_image_from_uri("https://example.com/shot.png").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidResponse(_)));
    }

    #[test]
    fn missing_file_gives_up_after_polling() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("never.png");
        let err = read_when_ready(&path, 3, Duration::from_millis(1)).unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
