//! Resize stage.

use super::{ProcessingError, Stage, StageContext, StageOutcome};
use crate::config::{ImageConfig, ResizeMode};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Applies the configured [`ResizeMode`].
#[derive(Debug, Clone)]
pub struct SizeStage {
    mode: ResizeMode,
    percent: u32,
    max_width: u32,
    max_height: u32,
}

impl SizeStage {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            mode: config.resize,
            percent: config.resize_percent,
            max_width: config.max_width,
            max_height: config.max_height,
        }
    }

    fn target_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        match self.mode {
            ResizeMode::None => None,
            ResizeMode::Scale => {
                if self.percent == 100 {
                    return None;
                }
                let scale = |v: u32| ((v as u64 * self.percent as u64) / 100).max(1) as u32;
                Some((scale(width), scale(height)))
            }
            ResizeMode::Fit => {
                if width <= self.max_width && height <= self.max_height {
                    return None;
                }
                let ratio = (self.max_width as f64 / width as f64)
                    .min(self.max_height as f64 / height as f64);
                Some((
                    ((width as f64 * ratio).round() as u32).max(1),
                    ((height as f64 * ratio).round() as u32).max(1),
                ))
            }
            ResizeMode::Crop => {
                if width <= self.max_width && height <= self.max_height {
                    return None;
                }
                Some((width.min(self.max_width), height.min(self.max_height)))
            }
        }
    }
}

impl Stage for SizeStage {
    fn name(&self) -> &'static str {
        "size"
    }

    fn apply(&self, image: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
        let Some((width, height)) = self.target_size(image.width(), image.height()) else {
            return Ok(StageOutcome::Unchanged);
        };

        let resized = if self.mode == ResizeMode::Crop {
            imageops::crop_imm(image, 0, 0, width, height).to_image()
        } else {
            imageops::resize(image, width, height, FilterType::Lanczos3)
        };
        Ok(StageOutcome::Changed(resized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn stage(mode: ResizeMode, percent: u32, max_width: u32, max_height: u32) -> SizeStage {
        SizeStage {
            mode,
            percent,
            max_width,
            max_height,
        }
    }

    fn run(stage: &SizeStage, w: u32, h: u32) -> Option<(u32, u32)> {
        let ctx = StageContext {
            timestamp: Local::now(),
        };
        match stage.apply(&RgbaImage::new(w, h), &ctx).unwrap() {
            StageOutcome::Changed(img) => Some(img.dimensions()),
            _ => None,
        }
    }

    #[test]
    fn scale_uses_percentage() {
        assert_eq!(run(&stage(ResizeMode::Scale, 50, 0, 0), 200, 100), Some((100, 50)));
        assert_eq!(run(&stage(ResizeMode::Scale, 100, 0, 0), 200, 100), None);
    }

    #[test]
    fn fit_keeps_aspect_and_never_enlarges() {
        assert_eq!(run(&stage(ResizeMode::Fit, 100, 100, 100), 400, 200), Some((100, 50)));
        assert_eq!(run(&stage(ResizeMode::Fit, 100, 100, 100), 80, 40), None);
    }

    #[test]
    fn crop_cuts_from_top_left() {
        assert_eq!(run(&stage(ResizeMode::Crop, 100, 50, 300), 120, 80), Some((50, 80)));
    }

    #[test]
    fn none_mode_is_a_no_op() {
        assert_eq!(run(&stage(ResizeMode::None, 10, 1, 1), 120, 80), None);
    }
}
