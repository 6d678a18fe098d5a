//! Configuration enum types.

use crate::process::color::{BLACK, Color, name_to_color};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Watermark anchor on the image.
///
/// Combined with the configured offset, this decides where a watermark lands.
/// Both text and image watermarks use the same anchor set.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

/// Which kind of watermark (if any) is drawn onto captured images.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkKind {
    None,
    Text,
    Image,
}

/// Direction of the watermark label's background gradient.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GradientDirection {
    Horizontal,
    Vertical,
    ForwardDiagonal,
    BackwardDiagonal,
}

/// How captured images are resized before effects are applied.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeMode {
    /// Keep the captured size.
    None,
    /// Scale both dimensions by `resize_percent`.
    Scale,
    /// Shrink (never enlarge) to fit inside `max_width` x `max_height`.
    Fit,
    /// Cut the image down to `max_width` x `max_height` from the top-left corner.
    Crop,
}

/// Encoded image format for saved and uploaded screenshots.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormatSpec {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormatSpec {
    /// File extension used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormatSpec::Png => "png",
            ImageFormatSpec::Jpeg => "jpg",
            ImageFormatSpec::Gif => "gif",
            ImageFormatSpec::Bmp => "bmp",
            ImageFormatSpec::Tiff => "tif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormatSpec::Png => "image/png",
            ImageFormatSpec::Jpeg => "image/jpeg",
            ImageFormatSpec::Gif => "image/gif",
            ImageFormatSpec::Bmp => "image/bmp",
            ImageFormatSpec::Tiff => "image/tiff",
        }
    }
}

/// Content category a custom uploader accepts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CustomUploaderKind {
    Image,
    Text,
    File,
}

/// Color specification - either a named color or RGB values.
///
/// # Examples
/// ```toml
/// # Named color
/// font_color = "white"
///
/// # Custom RGB color (0-255 per component)
/// gradient_start = [255, 128, 0]
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Named color: red, green, blue, yellow, orange, pink, white, black, gray
    Name(String),
    /// RGB color as [red, green, blue] where each component is 0-255
    Rgb([u8; 3]),
}

impl ColorSpec {
    /// Converts the color specification to an opaque [`Color`].
    ///
    /// Unknown color names fall back to black with a warning.
    pub fn to_color(&self) -> Color {
        match self {
            ColorSpec::Name(name) => name_to_color(name).unwrap_or_else(|| {
                warn!("Unknown color '{}', using black", name);
                BLACK
            }),
            ColorSpec::Rgb([r, g, b]) => Color {
                r: *r as f64 / 255.0,
                g: *g as f64 / 255.0,
                b: *b as f64 / 255.0,
                a: 1.0,
            },
        }
    }
}
