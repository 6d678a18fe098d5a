//! Text and image watermarks.
//!
//! A text watermark is a pango-rendered label on a rounded, gradient-filled background.
//! An image watermark is a scaled copy of a user-supplied picture. Both are placed with
//! [`anchor_position`] and can be followed by a fading reflection.

use super::color::Color;
use super::geometry::{anchor_position, fits_with_offset, rounded_rectangle};
use super::surface::{from_surface, to_surface};
use super::{ProcessingError, Stage, StageContext, StageOutcome};
use crate::config::{Anchor, GradientDirection, WatermarkConfig, WatermarkKind};
use crate::naming::expand_tokens;
use crate::util::expand_tilde;
use cairo::{Context, Format, ImageSurface, LinearGradient};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::PathBuf;

/// Padding between the label edge and its text.
const LABEL_PADDING: f64 = 5.0;

/// Highest alpha a reflection row can reach.
const REFLECTION_ALPHA: f64 = 200.0;

#[derive(Debug, Clone)]
struct LabelStyle {
    pattern: String,
    font: String,
    font_color: Color,
    gradient_start: Color,
    gradient_end: Color,
    gradient: GradientDirection,
    border_color: Color,
    corner_radius: f64,
}

#[derive(Debug, Clone)]
struct PictureStyle {
    path: PathBuf,
    scale_percent: u32,
    border: bool,
}

#[derive(Debug, Clone)]
enum Mark {
    None,
    Label(LabelStyle),
    Picture(PictureStyle),
}

/// Draws the configured watermark onto each image.
#[derive(Debug, Clone)]
pub struct WatermarkStage {
    mark: Mark,
    position: Anchor,
    offset: i32,
    auto_hide: bool,
    reflection: bool,
}

impl WatermarkStage {
    pub fn from_config(config: &WatermarkConfig) -> Self {
        let mark = match config.mode {
            WatermarkKind::None => Mark::None,
            WatermarkKind::Text => Mark::Label(LabelStyle {
                pattern: config.text.clone(),
                font: format!("{} {}", config.font_family, config.font_size),
                font_color: config.font_color.to_color().with_opacity(config.font_opacity),
                gradient_start: config
                    .gradient_start
                    .to_color()
                    .with_opacity(config.background_opacity),
                gradient_end: config
                    .gradient_end
                    .to_color()
                    .with_opacity(config.background_opacity),
                gradient: config.gradient,
                border_color: config
                    .border_color
                    .to_color()
                    .with_opacity(config.background_opacity),
                corner_radius: config.corner_radius,
            }),
            WatermarkKind::Image => Mark::Picture(PictureStyle {
                path: expand_tilde(&config.image_path),
                scale_percent: config.image_scale_percent,
                border: config.image_border,
            }),
        };

        Self {
            mark,
            position: config.position,
            offset: config.offset as i32,
            auto_hide: config.auto_hide,
            reflection: config.reflection,
        }
    }

    fn render_overlay(&self, ctx: &StageContext) -> Result<Option<Overlay>, ProcessingError> {
        match &self.mark {
            Mark::None => Ok(None),
            Mark::Label(style) => {
                let text = expand_tokens(&style.pattern, ctx.timestamp, None, 1);
                if text.trim().is_empty() {
                    return Ok(None);
                }
                render_label(style, &text).map(|surface| {
                    Some(Overlay {
                        surface,
                        border: false,
                    })
                })
            }
            Mark::Picture(style) => load_picture(style).map(|surface| {
                Some(Overlay {
                    surface,
                    border: style.border,
                })
            }),
        }
    }
}

struct Overlay {
    surface: ImageSurface,
    border: bool,
}

impl Stage for WatermarkStage {
    fn name(&self) -> &'static str {
        "watermark"
    }

    fn apply(&self, image: &RgbaImage, ctx: &StageContext) -> Result<StageOutcome, ProcessingError> {
        let Some(overlay) = self.render_overlay(ctx)? else {
            return Ok(StageOutcome::Unchanged);
        };

        let (canvas_w, canvas_h) = (image.width() as i32, image.height() as i32);
        let (mark_w, mark_h) = (overlay.surface.width(), overlay.surface.height());
        let reflection = if self.reflection {
            Some(reflect(&overlay.surface)?)
        } else {
            None
        };
        // The reflection starts on the label's last row.
        let box_h = mark_h + reflection.as_ref().map_or(0, |r| r.height() - 1);

        if self.auto_hide && !fits_with_offset(canvas_w, canvas_h, mark_w, box_h, self.offset) {
            return Ok(StageOutcome::Skipped(format!(
                "{}x{} watermark does not fit a {}x{} image",
                mark_w, box_h, canvas_w, canvas_h
            )));
        }

        let (x, y) = anchor_position(self.position, self.offset, canvas_w, canvas_h, mark_w, box_h);

        let target = to_surface(image)?;
        {
            let cr = Context::new(&target)?;
            cr.set_source_surface(&overlay.surface, x as f64, y as f64)?;
            cr.paint()?;

            if let Some(reflection) = &reflection {
                cr.set_source_surface(reflection, x as f64, (y + mark_h - 1) as f64)?;
                cr.paint()?;
            }

            if overlay.border {
                cr.set_source_rgb(0.0, 0.0, 0.0);
                cr.set_line_width(1.0);
                cr.rectangle(x as f64 - 0.5, y as f64 - 0.5, mark_w as f64 + 1.0, mark_h as f64 + 1.0);
                cr.stroke()?;
            }
        }

        Ok(StageOutcome::Changed(from_surface(&target)?))
    }
}

fn build_layout(cr: &Context, style: &LabelStyle, text: &str) -> pango::Layout {
    let layout = pangocairo::functions::create_layout(cr);
    let font_desc = pango::FontDescription::from_string(&style.font);
    layout.set_font_description(Some(&font_desc));
    layout.set_text(text);
    layout
}

fn gradient_for(direction: GradientDirection, w: f64, h: f64) -> LinearGradient {
    match direction {
        GradientDirection::Horizontal => LinearGradient::new(0.0, 0.0, w, 0.0),
        GradientDirection::Vertical => LinearGradient::new(0.0, 0.0, 0.0, h),
        GradientDirection::ForwardDiagonal => LinearGradient::new(0.0, 0.0, w, h),
        GradientDirection::BackwardDiagonal => LinearGradient::new(w, 0.0, 0.0, h),
    }
}

/// Renders the label for `text`. The surface is one pixel larger than the label so the
/// outline stroke is not clipped.
fn render_label(style: &LabelStyle, text: &str) -> Result<ImageSurface, ProcessingError> {
    let (text_w, text_h) = {
        let scratch = ImageSurface::create(Format::ARgb32, 1, 1)?;
        let cr = Context::new(&scratch)?;
        build_layout(&cr, style, text).pixel_size()
    };

    let label_w = text_w as f64 + LABEL_PADDING * 2.0;
    let label_h = text_h as f64 + LABEL_PADDING * 2.0;
    let surface = ImageSurface::create(
        Format::ARgb32,
        label_w as i32 + 1,
        label_h as i32 + 1,
    )?;

    {
        let cr = Context::new(&surface)?;
        rounded_rectangle(&cr, 0.5, 0.5, label_w, label_h, style.corner_radius);

        let gradient = gradient_for(style.gradient, label_w, label_h);
        let (s, e) = (style.gradient_start, style.gradient_end);
        gradient.add_color_stop_rgba(0.0, s.r, s.g, s.b, s.a);
        gradient.add_color_stop_rgba(1.0, e.r, e.g, e.b, e.a);
        cr.set_source(&gradient)?;
        cr.fill_preserve()?;

        let b = style.border_color;
        cr.set_source_rgba(b.r, b.g, b.b, b.a);
        cr.set_line_width(1.0);
        cr.stroke()?;

        let layout = build_layout(&cr, style, text);
        let c = style.font_color;
        cr.set_source_rgba(c.r, c.g, c.b, c.a);
        cr.move_to(LABEL_PADDING, LABEL_PADDING);
        pangocairo::functions::show_layout(&cr, &layout);
    }

    surface.flush();
    Ok(surface)
}

fn load_picture(style: &PictureStyle) -> Result<ImageSurface, ProcessingError> {
    if !style.path.is_file() {
        return Err(ProcessingError::Watermark(format!(
            "image not found: {}",
            style.path.display()
        )));
    }

    let picture = image::open(&style.path)?.to_rgba8();
    let picture = if style.scale_percent == 100 {
        picture
    } else {
        let scale = |v: u32| ((v as u64 * style.scale_percent as u64) / 100).max(1) as u32;
        imageops::resize(
            &picture,
            scale(picture.width()),
            scale(picture.height()),
            FilterType::Lanczos3,
        )
    };
    to_surface(&picture)
}

/// Upside-down copy of `surface`, two thirds as tall, fading out towards the bottom.
fn reflect(surface: &ImageSurface) -> Result<ImageSurface, ProcessingError> {
    let source = from_surface(surface)?;
    let height = ((source.height() as f64 / 1.5) as u32).max(1);
    let flipped = imageops::flip_vertical(&source);
    let mut reflection = imageops::crop_imm(&flipped, 0, 0, source.width(), height).to_image();

    for (_, y, pixel) in reflection.enumerate_pixels_mut() {
        let cap = (REFLECTION_ALPHA - REFLECTION_ALPHA * (y + 1) as f64 / height as f64).max(0.0);
        pixel.0[3] = pixel.0[3].min(cap as u8);
    }

    to_surface(&reflection)
}
