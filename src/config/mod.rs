//! Configuration file support for capshare.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/capshare/config.toml`. Settings include output folders, file
//! naming, image encoding, effects, watermarking, uploader credentials and the default
//! destinations used by the command line.
//!
//! The configuration is read once at startup and then shared read-only (`Arc<Config>`)
//! by every job for the rest of the process lifetime. Nothing in the pipeline writes it.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

pub use enums::{
    Anchor, ColorSpec, CustomUploaderKind, GradientDirection, ImageFormatSpec, ResizeMode,
    WatermarkKind,
};
pub use types::{
    CustomUploaderConfig, DefaultsConfig, EffectsConfig, ImageConfig, ImgurConfig, IsgdConfig,
    NamingConfig, PasteConfig, PathsConfig, SharedFolderConfig, UploadConfig, UploadersConfig,
    WatermarkConfig,
};

use crate::util::expand_tilde;
use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all user settings.
///
/// This is the root configuration type that gets deserialized from the TOML file.
/// All fields have sensible defaults and will use those if not specified in the config file.
///
/// # Example TOML
/// ```toml
/// [paths]
/// images_dir = "~/Pictures/capshare"
///
/// [naming]
/// pattern = "shot_%Y%m%d_%i"
///
/// [image]
/// format = "png"
/// switch_after_kb = 500
/// switch_format = "jpeg"
///
/// [watermark]
/// mode = "text"
/// text = "%pn"
/// position = "bottom-right"
///
/// [uploaders.imgur]
/// client_id = "0123456789abcde"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub effects: EffectsConfig,

    #[serde(default)]
    pub watermark: WatermarkConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub uploaders: UploadersConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning is logged.
    ///
    /// Validated ranges:
    /// - `naming.max_name_length`: 8 - 255
    /// - `naming.counter_width`: 1 - 10
    /// - `image.jpeg_quality`: 1 - 100
    /// - `image.resize_percent`, `watermark.image_scale_percent`: 1 - 400
    /// - `effects.border_width`: 0 - 50
    /// - `watermark.font_size`: 6.0 - 72.0
    /// - `watermark.corner_radius`: 0.0 - 50.0
    /// - `watermark.offset`: 0 - 500
    /// - `upload.timeout_secs`: 1 - 600
    /// - `upload.max_concurrent_jobs`: 1 - 32
    pub fn validate_and_clamp(&mut self) {
        if !(8..=255).contains(&self.naming.max_name_length) {
            log::warn!(
                "Invalid max_name_length {}, clamping to 8-255 range",
                self.naming.max_name_length
            );
            self.naming.max_name_length = self.naming.max_name_length.clamp(8, 255);
        }

        if !(1..=10).contains(&self.naming.counter_width) {
            log::warn!(
                "Invalid counter_width {}, clamping to 1-10 range",
                self.naming.counter_width
            );
            self.naming.counter_width = self.naming.counter_width.clamp(1, 10);
        }

        if self.naming.pattern.trim().is_empty() {
            log::warn!("Empty naming pattern, falling back to 'screenshot_%Y-%m-%d_%H%M%S'");
            self.naming.pattern = NamingConfig::default().pattern;
        }

        if !(1..=100).contains(&self.image.jpeg_quality) {
            log::warn!(
                "Invalid jpeg_quality {}, clamping to 1-100 range",
                self.image.jpeg_quality
            );
            self.image.jpeg_quality = self.image.jpeg_quality.clamp(1, 100);
        }

        if !(1..=400).contains(&self.image.resize_percent) {
            log::warn!(
                "Invalid resize_percent {}, clamping to 1-400 range",
                self.image.resize_percent
            );
            self.image.resize_percent = self.image.resize_percent.clamp(1, 400);
        }

        if self.image.max_width == 0 || self.image.max_height == 0 {
            log::warn!(
                "Invalid resize bounds {}x{}, using 1920x1080",
                self.image.max_width,
                self.image.max_height
            );
            self.image.max_width = 1920;
            self.image.max_height = 1080;
        }

        if self.effects.border_width > 50 {
            log::warn!(
                "Invalid border_width {}, clamping to 0-50 range",
                self.effects.border_width
            );
            self.effects.border_width = 50;
        }

        if !(6.0..=72.0).contains(&self.watermark.font_size) {
            log::warn!(
                "Invalid watermark font_size {:.1}, clamping to 6.0-72.0 range",
                self.watermark.font_size
            );
            self.watermark.font_size = self.watermark.font_size.clamp(6.0, 72.0);
        }

        if !(0.0..=50.0).contains(&self.watermark.corner_radius) {
            log::warn!(
                "Invalid watermark corner_radius {:.1}, clamping to 0.0-50.0 range",
                self.watermark.corner_radius
            );
            self.watermark.corner_radius = self.watermark.corner_radius.clamp(0.0, 50.0);
        }

        if self.watermark.offset > 500 {
            log::warn!(
                "Invalid watermark offset {}, clamping to 0-500 range",
                self.watermark.offset
            );
            self.watermark.offset = 500;
        }

        if !(1..=400).contains(&self.watermark.image_scale_percent) {
            log::warn!(
                "Invalid watermark image_scale_percent {}, clamping to 1-400 range",
                self.watermark.image_scale_percent
            );
            self.watermark.image_scale_percent = self.watermark.image_scale_percent.clamp(1, 400);
        }

        if !(1..=600).contains(&self.upload.timeout_secs) {
            log::warn!(
                "Invalid upload timeout_secs {}, clamping to 1-600 range",
                self.upload.timeout_secs
            );
            self.upload.timeout_secs = self.upload.timeout_secs.clamp(1, 600);
        }

        if !(1..=32).contains(&self.upload.max_concurrent_jobs) {
            log::warn!(
                "Invalid max_concurrent_jobs {}, clamping to 1-32 range",
                self.upload.max_concurrent_jobs
            );
            self.upload.max_concurrent_jobs = self.upload.max_concurrent_jobs.clamp(1, 32);
        }

        self.uploaders.custom.retain(|custom| {
            let keep = !custom.name.trim().is_empty() && !custom.request_url.trim().is_empty();
            if !keep {
                log::warn!("Ignoring custom uploader without a name or request_url");
            }
            keep
        });
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/capshare/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("capshare");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file is missing.
    ///
    /// All loaded values are validated and clamped to acceptable ranges.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Directory screenshots are saved into, with `~/` expanded.
    pub fn images_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.images_dir)
    }

    /// Directory text snippets are saved into, with `~/` expanded.
    pub fn text_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.text_dir)
    }

    /// JSON schema of the configuration file, used by editor tooling.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}
