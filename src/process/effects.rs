//! Grayscale and border effects.

use super::color::Color;
use super::surface::{from_surface, to_surface};
use super::{ProcessingError, Stage, StageContext, StageOutcome};
use crate::config::EffectsConfig;
use image::{DynamicImage, RgbaImage};

#[derive(Debug, Clone)]
pub struct EffectsStage {
    grayscale: bool,
    border_width: u32,
    border_color: Color,
}

impl EffectsStage {
    pub fn from_config(config: &EffectsConfig) -> Self {
        Self {
            grayscale: config.grayscale,
            border_width: config.border_width,
            border_color: config.border_color.to_color(),
        }
    }

    fn draw_border(&self, image: &RgbaImage) -> Result<RgbaImage, ProcessingError> {
        let surface = to_surface(image)?;
        {
            let ctx = cairo::Context::new(&surface)?;
            let c = self.border_color;
            ctx.set_source_rgba(c.r, c.g, c.b, c.a);
            // Half of a centered stroke falls outside the surface and is clipped.
            ctx.set_line_width(self.border_width as f64 * 2.0);
            ctx.rectangle(0.0, 0.0, image.width() as f64, image.height() as f64);
            ctx.stroke()?;
        }
        from_surface(&surface)
    }
}

/// Luma conversion through `LumaA8`, so alpha survives.
fn to_grayscale(image: &RgbaImage) -> RgbaImage {
    DynamicImage::ImageRgba8(image.clone()).grayscale().to_rgba8()
}

impl Stage for EffectsStage {
    fn name(&self) -> &'static str {
        "effects"
    }

    fn apply(&self, image: &RgbaImage, _: &StageContext) -> Result<StageOutcome, ProcessingError> {
        if !self.grayscale && self.border_width == 0 {
            return Ok(StageOutcome::Unchanged);
        }

        let mut out = if self.grayscale {
            to_grayscale(image)
        } else {
            image.clone()
        };
        if self.border_width > 0 {
            out = self.draw_border(&out)?;
        }
        Ok(StageOutcome::Changed(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::color::RED;
    use chrono::Local;
    use image::Rgba;

    fn ctx() -> StageContext {
        StageContext {
            timestamp: Local::now(),
        }
    }

    #[test]
    fn grayscale_equalizes_channels_and_keeps_alpha() {
        let stage = EffectsStage {
            grayscale: true,
            border_width: 0,
            border_color: RED,
        };
        let image = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 128]));
        let StageOutcome::Changed(out) = stage.apply(&image, &ctx()).unwrap() else {
            panic!("expected a changed image");
        };
        let [r, g, b, a] = out.get_pixel(1, 1).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 128);
        assert!(r > 50 && r < 200, "luma {} outside the channel range", r);
    }

    #[test]
    fn border_paints_edges_only() {
        let stage = EffectsStage {
            grayscale: false,
            border_width: 2,
            border_color: RED,
        };
        let image = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let StageOutcome::Changed(out) = stage.apply(&image, &ctx()).unwrap() else {
            panic!("expected a changed image");
        };
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn disabled_effects_do_nothing() {
        let stage = EffectsStage::from_config(&EffectsConfig::default());
        assert!(matches!(
            stage.apply(&RgbaImage::new(3, 3), &ctx()).unwrap(),
            StageOutcome::Unchanged
        ));
    }
}
