//! Conversion between decoded RGBA buffers and cairo image surfaces.
//!
//! Cairo stores ARGB32 as native-endian `u32` words with premultiplied alpha,
//! while `image::RgbaImage` keeps straight alpha in byte order.

use super::ProcessingError;
use cairo::{Format, ImageSurface};
use image::{Rgba, RgbaImage};

fn premultiply(channel: u8, alpha: u8) -> u32 {
    (channel as u32 * alpha as u32 + 127) / 255
}

fn unpremultiply(channel: u32, alpha: u32) -> u8 {
    if alpha == 0 {
        0
    } else {
        ((channel * 255 + alpha / 2) / alpha).min(255) as u8
    }
}

/// Copies `image` into a new ARGB32 surface.
pub fn to_surface(image: &RgbaImage) -> Result<ImageSurface, ProcessingError> {
    let (width, height) = image.dimensions();
    let mut surface = ImageSurface::create(Format::ARgb32, width as i32, height as i32)?;
    let stride = surface.stride() as usize;

    {
        let mut data = surface
            .data()
            .map_err(|e| ProcessingError::Surface(e.to_string()))?;
        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let word = ((a as u32) << 24)
                | (premultiply(r, a) << 16)
                | (premultiply(g, a) << 8)
                | premultiply(b, a);
            let offset = y as usize * stride + x as usize * 4;
            data[offset..offset + 4].copy_from_slice(&word.to_ne_bytes());
        }
    }

    Ok(surface)
}

/// Reads an ARGB32 surface back into a straight-alpha RGBA buffer.
///
/// Every `cairo::Context` drawing on the surface must be dropped first.
pub fn from_surface(surface: &ImageSurface) -> Result<RgbaImage, ProcessingError> {
    surface.flush();
    let width = surface.width().max(0) as u32;
    let height = surface.height().max(0) as u32;
    let stride = surface.stride() as usize;
    let mut image = RgbaImage::new(width, height);

    surface
        .with_data(|data| {
            for (x, y, pixel) in image.enumerate_pixels_mut() {
                let offset = y as usize * stride + x as usize * 4;
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&data[offset..offset + 4]);
                let word = u32::from_ne_bytes(bytes);
                let a = word >> 24;
                *pixel = Rgba([
                    unpremultiply((word >> 16) & 0xff, a),
                    unpremultiply((word >> 8) & 0xff, a),
                    unpremultiply(word & 0xff, a),
                    a as u8,
                ]);
            }
        })
        .map_err(|e| ProcessingError::Surface(e.to_string()))?;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_pixels_survive_a_round_trip() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(2, 1, Rgba([12, 34, 56, 255]));

        let surface = to_surface(&image).unwrap();
        let back = from_surface(&surface).unwrap();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(back.get_pixel(2, 1), &Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn transparent_pixels_stay_transparent() {
        let image = RgbaImage::new(2, 2);
        let back = from_surface(&to_surface(&image).unwrap()).unwrap();
        assert!(back.pixels().all(|p| p.0[3] == 0));
    }
}
