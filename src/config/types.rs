//! Configuration type definitions.

use super::enums::{
    Anchor, ColorSpec, CustomUploaderKind, GradientDirection, ImageFormatSpec, ResizeMode,
    WatermarkKind,
};
use crate::job::{ClipboardContent, OutputDestination};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where captured and uploaded content is written on disk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PathsConfig {
    /// Directory for saved screenshots (supports `~/`)
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    /// Directory for saved text snippets (supports `~/`)
    #[serde(default = "default_text_dir")]
    pub text_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            text_dir: default_text_dir(),
        }
    }
}

/// File naming settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamingConfig {
    /// Name pattern without extension. Supports chrono format specifiers
    /// (`%Y`, `%m`, `%d`, `%H`, `%M`, `%S`, ...) plus `%i` (incrementing
    /// number) and `%pn` (product name).
    #[serde(default = "default_name_pattern")]
    pub pattern: String,

    /// Maximum length of the base name, extension excluded (valid range: 8 - 255)
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Replace existing files instead of adding a `(N)` suffix
    #[serde(default)]
    pub overwrite: bool,

    /// First value used by the `%i` token
    #[serde(default = "default_counter_start")]
    pub counter_start: u64,

    /// Zero padding applied to the `%i` token (valid range: 1 - 10)
    #[serde(default = "default_counter_width")]
    pub counter_width: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pattern: default_name_pattern(),
            max_name_length: default_max_name_length(),
            overwrite: false,
            counter_start: default_counter_start(),
            counter_width: default_counter_width(),
        }
    }
}

/// Image encoding and size settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageConfig {
    /// Primary encoding format
    #[serde(default = "default_image_format")]
    pub format: ImageFormatSpec,

    /// Re-encode with `switch_format` when the encoded file exceeds this many KiB.
    /// 0 disables the switch.
    #[serde(default)]
    pub switch_after_kb: u64,

    /// Fallback (usually lossy) format used above `switch_after_kb`
    #[serde(default = "default_switch_format")]
    pub switch_format: ImageFormatSpec,

    /// JPEG quality (valid range: 1 - 100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Size change applied before effects
    #[serde(default = "default_resize_mode")]
    pub resize: ResizeMode,

    /// Percentage used by `resize = "scale"` (valid range: 1 - 400)
    #[serde(default = "default_resize_percent")]
    pub resize_percent: u32,

    /// Bounds used by `resize = "fit"` and `resize = "crop"`
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    #[serde(default = "default_max_height")]
    pub max_height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            format: default_image_format(),
            switch_after_kb: 0,
            switch_format: default_switch_format(),
            jpeg_quality: default_jpeg_quality(),
            resize: default_resize_mode(),
            resize_percent: default_resize_percent(),
            max_width: default_max_width(),
            max_height: default_max_height(),
        }
    }
}

/// Cosmetic effects applied after resizing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EffectsConfig {
    /// Convert the screenshot to grayscale
    #[serde(default)]
    pub grayscale: bool,

    /// Border width in pixels, 0 disables the border (valid range: 0 - 50)
    #[serde(default)]
    pub border_width: u32,

    #[serde(default = "default_border_color")]
    pub border_color: ColorSpec,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            grayscale: false,
            border_width: 0,
            border_color: default_border_color(),
        }
    }
}

/// Watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WatermarkConfig {
    #[serde(default = "default_watermark_kind")]
    pub mode: WatermarkKind,

    /// Label text for `mode = "text"`; expanded like the file name pattern
    #[serde(default = "default_watermark_text")]
    pub text: String,

    #[serde(default = "default_watermark_font_family")]
    pub font_family: String,

    /// Font size in points (valid range: 6.0 - 72.0)
    #[serde(default = "default_watermark_font_size")]
    pub font_size: f64,

    #[serde(default = "default_watermark_font_color")]
    pub font_color: ColorSpec,

    /// Text opacity, 0 - 255
    #[serde(default = "default_opaque")]
    pub font_opacity: u8,

    /// Label background opacity, 0 - 255
    #[serde(default = "default_background_opacity")]
    pub background_opacity: u8,

    #[serde(default = "default_gradient_start")]
    pub gradient_start: ColorSpec,

    #[serde(default = "default_gradient_end")]
    pub gradient_end: ColorSpec,

    #[serde(default = "default_gradient_direction")]
    pub gradient: GradientDirection,

    #[serde(default = "default_label_border_color")]
    pub border_color: ColorSpec,

    /// Label corner radius in pixels, 0 for square corners (valid range: 0.0 - 50.0)
    #[serde(default = "default_corner_radius")]
    pub corner_radius: f64,

    #[serde(default = "default_watermark_position")]
    pub position: Anchor,

    /// Distance from the anchored edges in pixels (valid range: 0 - 500)
    #[serde(default = "default_watermark_offset")]
    pub offset: u32,

    /// Skip the watermark when the image is too small to hold it
    #[serde(default = "default_true")]
    pub auto_hide: bool,

    /// Draw a fading mirror image below the watermark
    #[serde(default)]
    pub reflection: bool,

    /// Image file for `mode = "image"` (supports `~/`)
    #[serde(default)]
    pub image_path: String,

    /// Scale applied to the watermark image (valid range: 1 - 400)
    #[serde(default = "default_resize_percent")]
    pub image_scale_percent: u32,

    /// Draw a 1px black border around the watermark image
    #[serde(default)]
    pub image_border: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            mode: default_watermark_kind(),
            text: default_watermark_text(),
            font_family: default_watermark_font_family(),
            font_size: default_watermark_font_size(),
            font_color: default_watermark_font_color(),
            font_opacity: default_opaque(),
            background_opacity: default_background_opacity(),
            gradient_start: default_gradient_start(),
            gradient_end: default_gradient_end(),
            gradient: default_gradient_direction(),
            border_color: default_label_border_color(),
            corner_radius: default_corner_radius(),
            position: default_watermark_position(),
            offset: default_watermark_offset(),
            auto_hide: true,
            reflection: false,
            image_path: String::new(),
            image_scale_percent: default_resize_percent(),
            image_border: false,
        }
    }
}

/// Upload behaviour shared by all adapters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UploadConfig {
    /// Per-attempt timeout for a single adapter call (valid range: 1 - 600)
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,

    /// Retry once after timeouts, connection failures and HTTP 5xx responses
    #[serde(default = "default_true")]
    pub retry_transient: bool,

    /// Delay before the retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Number of jobs a batch runs at the same time (valid range: 1 - 32)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_upload_timeout(),
            retry_transient: true,
            retry_backoff_ms: default_retry_backoff_ms(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

/// Credentials and endpoints for the uploader adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UploadersConfig {
    #[serde(default)]
    pub imgur: ImgurConfig,

    #[serde(default)]
    pub paste: PasteConfig,

    #[serde(default)]
    pub isgd: IsgdConfig,

    /// User-defined HTTP uploaders
    #[serde(default)]
    pub custom: Vec<CustomUploaderConfig>,

    /// Target of the `shared-folder` output
    #[serde(default)]
    pub shared_folder: SharedFolderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImgurConfig {
    /// Anonymous upload client id; empty leaves Imgur unconfigured
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_imgur_url")]
    pub api_url: String,
}

impl Default for ImgurConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_url: default_imgur_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PasteConfig {
    #[serde(default = "default_paste_url")]
    pub url: String,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            url: default_paste_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IsgdConfig {
    #[serde(default = "default_isgd_url")]
    pub url: String,
}

impl Default for IsgdConfig {
    fn default() -> Self {
        Self {
            url: default_isgd_url(),
        }
    }
}

/// A user-defined multipart upload endpoint.
///
/// # Example TOML
/// ```toml
/// [[uploaders.custom]]
/// name = "my-host"
/// kind = "image"
/// request_url = "https://example.com/upload"
/// file_form_name = "file"
/// json_path = "data.url"
///
/// [uploaders.custom.arguments]
/// key = "secret"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CustomUploaderConfig {
    pub name: String,

    pub kind: CustomUploaderKind,

    pub request_url: String,

    #[serde(default = "default_file_form_name")]
    pub file_form_name: String,

    /// Extra multipart text fields
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Dot-separated path to the URL inside a JSON response (`data.link`)
    #[serde(default)]
    pub json_path: Option<String>,

    /// Regex whose first capture group is the URL; used when `json_path` is unset
    #[serde(default)]
    pub regex: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SharedFolderConfig {
    /// Directory payloads are copied into (supports `~/`); empty leaves it unconfigured
    #[serde(default)]
    pub directory: String,

    /// Public URL prefix of `directory`; the file path is reported when empty
    #[serde(default)]
    pub base_url: String,
}

/// Destinations used when the command line does not select any.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DefaultsConfig {
    #[serde(default = "default_outputs")]
    pub outputs: Vec<OutputDestination>,

    #[serde(default = "default_clipboard_content")]
    pub clipboard_content: ClipboardContent,

    /// Adapter names, e.g. `["imgur"]`
    #[serde(default)]
    pub image_uploaders: Vec<String>,

    #[serde(default)]
    pub text_uploaders: Vec<String>,

    #[serde(default)]
    pub file_uploaders: Vec<String>,

    #[serde(default)]
    pub link_uploaders: Vec<String>,

    /// Show a desktop notification when a job finishes
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            outputs: default_outputs(),
            clipboard_content: default_clipboard_content(),
            image_uploaders: Vec::new(),
            text_uploaders: Vec::new(),
            file_uploaders: Vec::new(),
            link_uploaders: Vec::new(),
            notifications: true,
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_images_dir() -> String {
    "~/Pictures/capshare".to_string()
}

fn default_text_dir() -> String {
    "~/Documents/capshare".to_string()
}

fn default_name_pattern() -> String {
    "screenshot_%Y-%m-%d_%H%M%S".to_string()
}

fn default_max_name_length() -> usize {
    100
}

fn default_counter_start() -> u64 {
    1
}

fn default_counter_width() -> usize {
    3
}

fn default_image_format() -> ImageFormatSpec {
    ImageFormatSpec::Png
}

fn default_switch_format() -> ImageFormatSpec {
    ImageFormatSpec::Jpeg
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_resize_mode() -> ResizeMode {
    ResizeMode::None
}

fn default_resize_percent() -> u32 {
    100
}

fn default_max_width() -> u32 {
    1920
}

fn default_max_height() -> u32 {
    1080
}

fn default_border_color() -> ColorSpec {
    ColorSpec::Name("black".to_string())
}

fn default_watermark_kind() -> WatermarkKind {
    WatermarkKind::None
}

fn default_watermark_text() -> String {
    "%pn".to_string()
}

fn default_watermark_font_family() -> String {
    "Sans".to_string()
}

fn default_watermark_font_size() -> f64 {
    10.0
}

fn default_watermark_font_color() -> ColorSpec {
    ColorSpec::Name("white".to_string())
}

fn default_opaque() -> u8 {
    255
}

fn default_background_opacity() -> u8 {
    200
}

fn default_gradient_start() -> ColorSpec {
    ColorSpec::Rgb([70, 70, 70])
}

fn default_gradient_end() -> ColorSpec {
    ColorSpec::Rgb([20, 20, 20])
}

fn default_gradient_direction() -> GradientDirection {
    GradientDirection::Vertical
}

fn default_label_border_color() -> ColorSpec {
    ColorSpec::Name("black".to_string())
}

fn default_corner_radius() -> f64 {
    4.0
}

fn default_watermark_position() -> Anchor {
    Anchor::BottomRight
}

fn default_watermark_offset() -> u32 {
    5
}

fn default_upload_timeout() -> u64 {
    60
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_imgur_url() -> String {
    "https://api.imgur.com/3/image".to_string()
}

fn default_paste_url() -> String {
    "https://paste.rs".to_string()
}

fn default_isgd_url() -> String {
    "https://is.gd/create.php".to_string()
}

fn default_file_form_name() -> String {
    "file".to_string()
}

fn default_outputs() -> Vec<OutputDestination> {
    vec![OutputDestination::Clipboard, OutputDestination::LocalDisk]
}

fn default_clipboard_content() -> ClipboardContent {
    ClipboardContent::Remote
}
