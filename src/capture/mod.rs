//! Content acquisition: screenshots and the clipboard.
//!
//! Screenshots go through `grim`/`slurp` (and `hyprctl` for window geometry) and
//! fall back to xdg-desktop-portal. Clipboard reads and writes use `wl-copy` and
//! `wl-clipboard-rs`.

pub mod clipboard;
pub mod portal;
pub mod types;

mod dependencies;
mod sources;

pub use dependencies::{CaptureSource, ClipboardReader, DesktopCaptureSource, WaylandClipboardReader};
pub use types::{CaptureError, CaptureType, ClipboardData};
