//! Wayland clipboard access: `wl-copy` first, `wl-clipboard-rs` as fallback.
//!
//! Everything here blocks; async callers go through `spawn_blocking`.

use super::types::{CaptureError, ClipboardData};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use wl_clipboard_rs::copy::{self, Options, ServeRequests, Source};
use wl_clipboard_rs::paste::{self, ClipboardType, Seat};

const TEXT_MIME: &str = "text/plain;charset=utf-8";
const URI_LIST_MIME: &str = "text/uri-list";
const TEXT_MIMES: [&str; 5] = [TEXT_MIME, "text/plain", "UTF8_STRING", "STRING", "TEXT"];

/// Places text on the clipboard.
pub fn copy_text(text: &str) -> Result<(), CaptureError> {
    copy_bytes(text.as_bytes(), TEXT_MIME)
}

/// Places encoded image bytes on the clipboard under `mime_type`.
pub fn copy_image(data: &[u8], mime_type: &str) -> Result<(), CaptureError> {
    copy_bytes(data, mime_type)
}

fn copy_bytes(data: &[u8], mime_type: &str) -> Result<(), CaptureError> {
    log::debug!("Copying {} bytes of {} to clipboard", data.len(), mime_type);

    match copy_via_command(data, mime_type) {
        Ok(()) => Ok(()),
        Err(cmd_err) => {
            log::warn!("wl-copy failed ({}). Falling back to wl-clipboard-rs", cmd_err);
            copy_via_library(data, mime_type).map_err(|lib_err| {
                CaptureError::ClipboardError(format!(
                    "wl-copy failed: {} ; wl-clipboard-rs failed: {}",
                    cmd_err, lib_err
                ))
            })
        }
    }
}

fn copy_via_command(data: &[u8], mime_type: &str) -> Result<(), CaptureError> {
    let mut child = Command::new("wl-copy")
        .args(["--type", mime_type])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CaptureError::ClipboardError(format!("Failed to spawn wl-copy: {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(data).map_err(|e| {
            CaptureError::ClipboardError(format!("Failed to write to wl-copy stdin: {}", e))
        })?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| CaptureError::ClipboardError(format!("Failed to wait for wl-copy: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ClipboardError(format!(
            "wl-copy exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn copy_via_library(data: &[u8], mime_type: &str) -> Result<(), CaptureError> {
    let mime = if mime_type == TEXT_MIME {
        copy::MimeType::Text
    } else {
        copy::MimeType::Specific(mime_type.to_string())
    };

    let mut opts = Options::new();
    // Keep the selection alive for one paste after we exit.
    opts.serve_requests(ServeRequests::Only(1));
    opts.copy(Source::Bytes(data.into()), mime)
        .map_err(|e| CaptureError::ClipboardError(format!("wl-clipboard-rs error: {}", e)))
}

/// What the clipboard offer should be read as.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Offer {
    Files,
    Image(String),
    Text(&'static str),
}

/// File lists win over images, images over text.
fn choose_offer(mime_types: &HashSet<String>) -> Option<Offer> {
    if mime_types.contains(URI_LIST_MIME) {
        return Some(Offer::Files);
    }
    if mime_types.contains("image/png") {
        return Some(Offer::Image("image/png".to_string()));
    }
    let mut images: Vec<&String> = mime_types
        .iter()
        .filter(|m| m.starts_with("image/"))
        .collect();
    images.sort();
    if let Some(image) = images.first() {
        return Some(Offer::Image((*image).clone()));
    }
    TEXT_MIMES
        .into_iter()
        .find(|m| mime_types.contains(*m))
        .map(Offer::Text)
}

/// Parses a `text/uri-list` body into local paths, skipping comments and remote URIs.
fn parse_uri_list(body: &str) -> Vec<PathBuf> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| url::Url::parse(line).ok())
        .filter_map(|url| url.to_file_path().ok())
        .collect()
}

/// Reads the current clipboard selection.
pub fn read_clipboard() -> Result<ClipboardData, CaptureError> {
    let mime_types = match paste::get_mime_types(ClipboardType::Regular, Seat::Unspecified) {
        Ok(types) => types,
        Err(paste::Error::ClipboardEmpty | paste::Error::NoSeats) => {
            return Ok(ClipboardData::Empty);
        }
        Err(e) => {
            return Err(CaptureError::ClipboardError(format!(
                "Failed to list clipboard types: {}",
                e
            )));
        }
    };
    log::debug!("Clipboard offers: {:?}", mime_types);

    let Some(offer) = choose_offer(&mime_types) else {
        return Ok(ClipboardData::Empty);
    };

    let data = match &offer {
        Offer::Files => read_offer(URI_LIST_MIME)?,
        Offer::Image(mime) => read_offer(mime)?,
        Offer::Text(mime) => read_offer(mime)?,
    };
    if data.is_empty() {
        return Ok(ClipboardData::Empty);
    }

    Ok(match offer {
        Offer::Files => {
            let files = parse_uri_list(&String::from_utf8_lossy(&data));
            if files.is_empty() {
                ClipboardData::Empty
            } else {
                ClipboardData::Files(files)
            }
        }
        Offer::Image(mime_type) => ClipboardData::Image { data, mime_type },
        Offer::Text(_) => ClipboardData::Text(String::from_utf8_lossy(&data).into_owned()),
    })
}

fn read_offer(mime_type: &str) -> Result<Vec<u8>, CaptureError> {
    let (mut pipe, _) = paste::get_contents(
        ClipboardType::Regular,
        Seat::Unspecified,
        paste::MimeType::Specific(mime_type),
    )
    .map_err(|e| CaptureError::ClipboardError(format!("Failed to read {}: {}", mime_type, e)))?;

    let mut data = Vec::new();
    pipe.read_to_end(&mut data)?;
    Ok(data)
}
