//! Capture through `grim`, `slurp` and `hyprctl` (wlroots/Hyprland fast path).

use crate::capture::types::CaptureError;
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use tokio::task;

/// Rectangle in global compositor coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    fn scaled(self, scale: f64) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
            width: self.width * scale,
            height: self.height * scale,
        }
    }

    /// grim/slurp geometry string: `x,y wxh`.
    pub fn to_grim(self) -> String {
        format!(
            "{},{} {}x{}",
            self.x.round() as i32,
            self.y.round() as i32,
            self.width.round() as u32,
            self.height.round() as u32
        )
    }
}

/// Captures every output.
pub async fn capture_full_screen() -> Result<Vec<u8>, CaptureError> {
    blocking("full screen", || run_grim(None)).await
}

/// Captures the focused Hyprland window.
pub async fn capture_active_window() -> Result<Vec<u8>, CaptureError> {
    blocking("active window", || {
        let window = hyprctl_json(&["activewindow", "-j"])?;
        let mut geometry = window_geometry(&window)?;

        if let Some(scale) = monitor_scale(window.get("monitor"))?
            && (scale - 1.0).abs() > f64::EPSILON
        {
            log::debug!("Applying monitor scale {:.2} to active window capture", scale);
            geometry = geometry.scaled(scale);
        }

        run_grim(Some(&geometry.to_grim()))
    })
    .await
}

/// Lets the user click one of the visible windows, then captures it.
pub async fn capture_selected_window() -> Result<Vec<u8>, CaptureError> {
    blocking("window selection", || {
        let clients = hyprctl_json(&["clients", "-j"])?;
        let boxes: Vec<String> = clients
            .as_array()
            .map(|list| {
                list.iter()
                    .filter(|c| c.get("mapped").and_then(Value::as_bool).unwrap_or(true))
                    .filter_map(|c| window_geometry(c).ok())
                    .map(Geometry::to_grim)
                    .collect()
            })
            .unwrap_or_default();

        if boxes.is_empty() {
            return Err(CaptureError::ToolFailed("no windows to select".into()));
        }

        let geometry = run_slurp(&["-r", "-f", "%x,%y %wx%h"], Some(&boxes.join("\n")))?;
        run_grim(Some(&geometry))
    })
    .await
}

/// Lets the user drag a region, then captures it.
pub async fn capture_region() -> Result<Vec<u8>, CaptureError> {
    blocking("region selection", || {
        let geometry = run_slurp(&["-f", "%x,%y %wx%h"], None)?;
        run_grim(Some(&geometry))
    })
    .await
}

async fn blocking<F>(what: &'static str, f: F) -> Result<Vec<u8>, CaptureError>
where
    F: FnOnce() -> Result<Vec<u8>, CaptureError> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| CaptureError::ToolFailed(format!("{} capture task failed to join: {}", what, e)))?
}

fn run_grim(geometry: Option<&str>) -> Result<Vec<u8>, CaptureError> {
    let mut command = Command::new("grim");
    if let Some(geometry) = geometry {
        log::debug!("Capturing via grim: {}", geometry);
        command.args(["-g", geometry]);
    }
    let output = command
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CaptureError::ToolFailed(format!("Failed to run grim: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ToolFailed(format!("grim failed: {}", stderr.trim())));
    }
    if output.stdout.is_empty() {
        return Err(CaptureError::ToolFailed("grim returned empty screenshot".into()));
    }
    Ok(output.stdout)
}

/// Runs slurp and returns the selected geometry. Escape in slurp means cancellation.
fn run_slurp(args: &[&str], boxes: Option<&str>) -> Result<String, CaptureError> {
    let mut child = Command::new("slurp")
        .args(args)
        .stdin(if boxes.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CaptureError::ToolFailed(format!("Failed to run slurp: {}", e)))?;

    if let (Some(boxes), Some(mut stdin)) = (boxes, child.stdin.take()) {
        stdin.write_all(boxes.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        if stderr.contains("cancel") || output.stdout.is_empty() {
            return Err(CaptureError::Cancelled("selection dismissed".into()));
        }
        return Err(CaptureError::ToolFailed(format!("slurp failed: {}", stderr.trim())));
    }

    let geometry = String::from_utf8(output.stdout)
        .map_err(|e| CaptureError::InvalidResponse(format!("Invalid slurp output: {}", e)))?;
    let geometry = geometry.trim();
    if geometry.is_empty() {
        return Err(CaptureError::Cancelled("empty selection".into()));
    }
    Ok(geometry.to_string())
}

fn hyprctl_json(args: &[&str]) -> Result<Value, CaptureError> {
    let output = Command::new("hyprctl")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CaptureError::ToolFailed(format!("Failed to run hyprctl {}: {}", args[0], e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ToolFailed(format!(
            "hyprctl {} failed: {}",
            args[0],
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| {
        CaptureError::InvalidResponse(format!("Failed to parse hyprctl {} output: {}", args[0], e))
    })
}

/// Reads `at: [x, y]` and `size: [w, h]` from a hyprctl window object.
pub(crate) fn window_geometry(window: &Value) -> Result<Geometry, CaptureError> {
    let pair = |key: &str| -> Result<(f64, f64), CaptureError> {
        let values = window
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| CaptureError::InvalidResponse(format!("Missing '{}' in hyprctl output", key)))?;
        let first = values.first().and_then(Value::as_f64);
        let second = values.get(1).and_then(Value::as_f64);
        match (first, second) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(CaptureError::InvalidResponse(format!("Invalid '{}' value", key))),
        }
    };

    let (x, y) = pair("at")?;
    let (width, height) = pair("size")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(CaptureError::InvalidResponse(
            "Window has non-positive dimensions".into(),
        ));
    }
    Ok(Geometry {
        x,
        y,
        width,
        height,
    })
}

/// Scale of the monitor a window is on; `monitor` is either an id or a name.
fn monitor_scale(monitor: Option<&Value>) -> Result<Option<f64>, CaptureError> {
    let Some(monitor) = monitor else {
        return Ok(None);
    };
    let monitors = hyprctl_json(&["monitors", "-j"])?;
    let list = monitors.as_array().ok_or_else(|| {
        CaptureError::InvalidResponse("hyprctl monitors did not return an array".into())
    })?;
    Ok(find_monitor_scale(list, monitor))
}

pub(crate) fn find_monitor_scale(monitors: &[Value], target: &Value) -> Option<f64> {
    monitors
        .iter()
        .find(|m| match (target.as_i64(), target.as_str()) {
            (Some(id), _) => m.get("id").and_then(Value::as_i64) == Some(id),
            (_, Some(name)) => m.get("name").and_then(Value::as_str) == Some(name),
            _ => false,
        })
        .map(|m| m.get("scale").and_then(Value::as_f64).unwrap_or(1.0))
}
