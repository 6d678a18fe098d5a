//! Placement math and path helpers shared by the watermark and effects stages.

use crate::config::Anchor;
use std::f64::consts::PI;

/// Top-left corner for an `item_w` x `item_h` box anchored inside a canvas.
///
/// `offset` is the margin from whichever edges the anchor touches; centered axes ignore it.
pub fn anchor_position(
    anchor: Anchor,
    offset: i32,
    canvas_w: i32,
    canvas_h: i32,
    item_w: i32,
    item_h: i32,
) -> (i32, i32) {
    let left = offset;
    let center_x = canvas_w / 2 - item_w / 2;
    let right = canvas_w - item_w - offset;
    let top = offset;
    let center_y = canvas_h / 2 - item_h / 2;
    let bottom = canvas_h - item_h - offset;

    match anchor {
        Anchor::TopLeft => (left, top),
        Anchor::Top => (center_x, top),
        Anchor::TopRight => (right, top),
        Anchor::Left => (left, center_y),
        Anchor::Center => (center_x, center_y),
        Anchor::Right => (right, center_y),
        Anchor::BottomLeft => (left, bottom),
        Anchor::Bottom => (center_x, bottom),
        Anchor::BottomRight => (right, bottom),
    }
}

/// Whether an item plus its offset fits inside the canvas on both axes.
pub fn fits_with_offset(canvas_w: i32, canvas_h: i32, item_w: i32, item_h: i32, offset: i32) -> bool {
    canvas_w >= item_w + offset && canvas_h >= item_h + offset
}

/// Adds a rounded rectangle to the current path.
///
/// A radius of zero gives a plain rectangle. A radius of at least half the shorter side
/// gives a capsule (or a circle for squares).
pub fn rounded_rectangle(ctx: &cairo::Context, x: f64, y: f64, w: f64, h: f64, radius: f64) {
    if radius <= 0.0 {
        ctx.rectangle(x, y, w, h);
        return;
    }

    if radius >= w.min(h) / 2.0 {
        capsule(ctx, x, y, w, h);
        return;
    }

    ctx.new_sub_path();
    ctx.arc(x + w - radius, y + radius, radius, -PI / 2.0, 0.0);
    ctx.arc(x + w - radius, y + h - radius, radius, 0.0, PI / 2.0);
    ctx.arc(x + radius, y + h - radius, radius, PI / 2.0, PI);
    ctx.arc(x + radius, y + radius, radius, PI, 1.5 * PI);
    ctx.close_path();
}

/// Adds a pill shape spanning the rectangle to the current path.
pub fn capsule(ctx: &cairo::Context, x: f64, y: f64, w: f64, h: f64) {
    ctx.new_sub_path();
    if w > h {
        let r = h / 2.0;
        ctx.arc(x + w - r, y + r, r, -PI / 2.0, PI / 2.0);
        ctx.arc(x + r, y + r, r, PI / 2.0, 1.5 * PI);
    } else if w < h {
        let r = w / 2.0;
        ctx.arc(x + r, y + r, r, PI, 2.0 * PI);
        ctx.arc(x + r, y + h - r, r, 0.0, PI);
    } else {
        ctx.arc(x + w / 2.0, y + h / 2.0, w / 2.0, 0.0, 2.0 * PI);
    }
    ctx.close_path();
}
