//! Image post-processing: size change, cosmetic effects and watermarking.
//!
//! Stages always run in that fixed order. Each stage returns a fresh image, so a stage
//! that fails leaves its input untouched; the failure is recorded as a warning and the
//! remaining stages still run on the unmodified image.

pub mod color;
pub mod effects;
pub mod geometry;
pub mod size;
pub mod surface;
pub mod watermark;

use crate::config::Config;
use chrono::{DateTime, Local};
use image::RgbaImage;
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

pub use effects::EffectsStage;
pub use size::SizeStage;
pub use watermark::WatermarkStage;

/// Errors raised while decoding or transforming an image.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("Surface access failed: {0}")]
    Surface(String),

    #[error("Watermark unavailable: {0}")]
    Watermark(String),

    #[error("Stage panicked: {0}")]
    Panicked(String),
}

/// Result of running a single stage.
#[derive(Debug)]
pub enum StageOutcome {
    Changed(RgbaImage),
    /// The stage had nothing to do for this image.
    Unchanged,
    /// The stage chose not to run (for example an auto-hidden watermark).
    Skipped(String),
}

/// Per-image values a stage may depend on.
#[derive(Debug, Clone, Copy)]
pub struct StageContext {
    pub timestamp: DateTime<Local>,
}

/// One step of the post-processing chain.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, image: &RgbaImage, ctx: &StageContext) -> Result<StageOutcome, ProcessingError>;
}

/// What the processor did to an image.
#[derive(Debug)]
pub struct ProcessedImage {
    pub image: RgbaImage,
    pub applied: Vec<&'static str>,
    pub warnings: Vec<String>,
}

/// Ordered stage chain built from the configuration.
pub struct ImagePostProcessor {
    stages: Vec<Box<dyn Stage>>,
}

impl ImagePostProcessor {
    /// Builds the size, effects and watermark stages in that order.
    pub fn from_config(config: &Config) -> Self {
        Self::with_stages(vec![
            Box::new(SizeStage::from_config(&config.image)),
            Box::new(EffectsStage::from_config(&config.effects)),
            Box::new(WatermarkStage::from_config(&config.watermark)),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Runs every stage over `image`. Never fails; stage errors become warnings.
    pub fn process(&self, image: RgbaImage, timestamp: DateTime<Local>) -> ProcessedImage {
        let ctx = StageContext { timestamp };
        let mut current = image;
        let mut applied = Vec::new();
        let mut warnings = Vec::new();

        for stage in &self.stages {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage.apply(&current, &ctx)))
                .unwrap_or_else(|payload| Err(ProcessingError::Panicked(panic_message(&*payload))));
            match outcome {
                Ok(StageOutcome::Changed(next)) => {
                    debug!(
                        "Stage '{}' produced {}x{}",
                        stage.name(),
                        next.width(),
                        next.height()
                    );
                    current = next;
                    applied.push(stage.name());
                }
                Ok(StageOutcome::Unchanged) => {}
                Ok(StageOutcome::Skipped(reason)) => {
                    info!("Skipping {} stage: {}", stage.name(), reason);
                }
                Err(e) => {
                    warn!("{} stage failed, keeping previous image: {}", stage.name(), e);
                    warnings.push(format!("{} stage failed: {}", stage.name(), e));
                }
            }
        }

        ProcessedImage {
            image: current,
            applied,
            warnings,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decodes PNG/JPEG/GIF/BMP/TIFF bytes into an RGBA buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ProcessingError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatermarkKind;
    use image::Rgba;

    struct Fails;

    impl Stage for Fails {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn apply(&self, _: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
            Err(ProcessingError::Watermark("missing".into()))
        }
    }

    struct Paint(Rgba<u8>);

    impl Stage for Paint {
        fn name(&self) -> &'static str {
            "paint"
        }

        fn apply(&self, image: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
            Ok(StageOutcome::Changed(RgbaImage::from_pixel(
                image.width(),
                image.height(),
                self.0,
            )))
        }
    }

    #[test]
    fn failing_stage_passes_its_input_through() {
        let processor = ImagePostProcessor::with_stages(vec![
            Box::new(Fails),
            Box::new(Paint(Rgba([1, 2, 3, 255]))),
        ]);
        let result = processor.process(RgbaImage::new(4, 4), Local::now());

        assert_eq!(result.applied, vec!["paint"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("broken"));
        assert_eq!(result.image.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    struct Panics;

    impl Stage for Panics {
        fn name(&self) -> &'static str {
            "explodes"
        }

        fn apply(&self, _: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
            panic!("stage blew up")
        }
    }

    #[test]
    fn panicking_stage_is_contained() {
        let processor = ImagePostProcessor::with_stages(vec![
            Box::new(Panics),
            Box::new(Paint(Rgba([4, 5, 6, 255]))),
        ]);
        let result = processor.process(RgbaImage::new(3, 3), Local::now());

        assert_eq!(result.applied, vec!["paint"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("stage blew up"));
        assert_eq!(result.image.get_pixel(2, 2), &Rgba([4, 5, 6, 255]));
    }

    #[test]
    fn auto_hidden_watermark_leaves_pixels_untouched() {
        let mut config = Config::default();
        config.watermark.mode = WatermarkKind::Text;
        config.watermark.text = "ZScreen".to_string();
        config.watermark.offset = 10;
        config.watermark.auto_hide = true;
        let processor = ImagePostProcessor::from_config(&config);

        let input = RgbaImage::from_fn(16, 12, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 7, 255]));
        let result = processor.process(input.clone(), Local::now());

        assert!(result.applied.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.image, input);
    }

    #[test]
    fn default_config_leaves_image_untouched() {
        let processor = ImagePostProcessor::from_config(&Config::default());
        let input = RgbaImage::from_pixel(8, 6, Rgba([9, 9, 9, 255]));
        let result = processor.process(input.clone(), Local::now());

        assert!(result.applied.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.image, input);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(ProcessingError::Decode(_))
        ));
    }
}
