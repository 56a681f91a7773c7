// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pixel software kernels for each draw descriptor.
//!
//! Colors are straight (not premultiplied) alpha. Targets whose format has
//! no alpha channel are treated as opaque: their alpha is ignored on read
//! and written as 255.

use kurbo::{Affine, Point, Vec2};
use repaint_core::Area;
use repaint_core::color::{BlendMode, Color32};
use repaint_core::draw::{DrawDescriptor, LayerDescriptor, TaskJob};
use repaint_core::pixbuf::{PixelBuf, lock};
use repaint_core::tree::CompositeStyle;

/// Runs one job against its target buffer.
///
/// The source buffer, if any, is locked before the target. Locks are
/// released on return, so the caller may then hand the job back.
pub fn execute(job: &TaskJob) {
    let Some(bounds) = job.area.intersect(&job.clip) else {
        return;
    };
    let source = job.source.as_ref().map(lock);
    let mut target = lock(&job.target);
    let Some(bounds) = bounds.intersect(&target.area()) else {
        return;
    };
    match &*job.descriptor {
        DrawDescriptor::Fill { color, opa } => fill(&mut target, &bounds, color.with_opa(*opa)),
        DrawDescriptor::Image { pixels, size, opa } => image(
            &mut target,
            &bounds,
            (job.area.x1, job.area.y1),
            pixels,
            *size,
            *opa,
        ),
        DrawDescriptor::Mask { area, radius } => mask(&mut target, &bounds, area, *radius),
        DrawDescriptor::Layer(desc) => match &source {
            Some(source) => composite(&mut target, &bounds, source, desc),
            // Nothing was drawn into the source layer.
            None => log::trace!("empty source composited into {:?}", job.layer()),
        },
    }
}

// ---------------------------------------------------------------------------
// Blending
// ---------------------------------------------------------------------------

#[expect(
    clippy::cast_possible_truncation,
    reason = "the product of two u8 values divided by 255 fits in a u8"
)]
fn mul_channel(d: u8, s: u8) -> u8 {
    ((u32::from(d) * u32::from(s) + 127) / 255) as u8
}

/// Source-over of straight-alpha colors.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "weighted averages of u8 values stay below 256"
)]
pub fn over(dst: Color32, src: Color32) -> Color32 {
    let sa = u32::from(src.a);
    if sa == 255 || dst.a == 0 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = (u32::from(dst.a) * (255 - sa) + 127) / 255;
    let out = sa + da;
    let mix = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * da + out / 2) / out) as u8;
    Color32 {
        r: mix(src.r, dst.r),
        g: mix(src.g, dst.g),
        b: mix(src.b, dst.b),
        a: out as u8,
    }
}

/// Combines `src` onto `dst` with `mode`.
///
/// The mode decides the color the source contributes; its alpha then
/// weighs that color over the destination as in [`over`]. Against a fully
/// transparent destination every mode behaves like [`BlendMode::Normal`].
#[must_use]
pub fn blend(dst: Color32, src: Color32, mode: BlendMode) -> Color32 {
    if src.a == 0 {
        return dst;
    }
    if dst.a == 0 || mode == BlendMode::Normal {
        return over(dst, src);
    }
    let channel = |d: u8, s: u8| match mode {
        BlendMode::Normal => s,
        BlendMode::Additive => d.saturating_add(s),
        BlendMode::Subtractive => d.saturating_sub(s),
        BlendMode::Multiply => mul_channel(d, s),
    };
    let mixed = Color32 {
        r: channel(dst.r, src.r),
        g: channel(dst.g, src.g),
        b: channel(dst.b, src.b),
        a: src.a,
    };
    over(dst, mixed)
}

fn put(px: &mut Color32, src: Color32, mode: BlendMode, opaque: bool) {
    let dst = if opaque { Color32 { a: 255, ..*px } } else { *px };
    *px = blend(dst, src, mode);
}

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

/// Blends `color` over every pixel of `bounds`.
pub fn fill(target: &mut PixelBuf, bounds: &Area, color: Color32) {
    if color.a == 0 {
        return;
    }
    let opaque = !target.format().has_alpha();
    for y in bounds.y1..=bounds.y2 {
        for px in target.span_mut(y, bounds.x1, bounds.x2) {
            put(px, color, BlendMode::Normal, opaque);
        }
    }
}

/// Blends a row-major bitmap whose top-left pixel sits at `origin`.
///
/// Pixels of `bounds` outside the bitmap, or missing from a short pixel
/// slice, are left alone.
pub fn image(
    target: &mut PixelBuf,
    bounds: &Area,
    origin: (i32, i32),
    pixels: &[Color32],
    size: (u32, u32),
    opa: u8,
) {
    if size.0 == 0 || size.1 == 0 {
        return;
    }
    let bitmap = Area::from_origin_size(origin.0, origin.1, size.0, size.1);
    let Some(bounds) = bounds.intersect(&bitmap) else {
        return;
    };
    let opaque = !target.format().has_alpha();
    let w = size.0 as usize;
    for y in bounds.y1..=bounds.y2 {
        let row = (y - origin.1) as usize * w;
        let first = (bounds.x1 - origin.0) as usize;
        let span = target.span_mut(y, bounds.x1, bounds.x2);
        let Some(src) = pixels.get(row + first..row + first + span.len()) else {
            continue;
        };
        for (px, s) in span.iter_mut().zip(src) {
            put(px, s.with_opa(opa), BlendMode::Normal, opaque);
        }
    }
}

/// Whether `(x, y)` lies in `area` with corners rounded by `radius`.
#[must_use]
pub fn in_rounded_rect(area: &Area, radius: i32, x: i32, y: i32) -> bool {
    if !area.contains_point(x, y) {
        return false;
    }
    // Keeps the corner centres ordered on even sizes.
    let r = radius
        .min((area.width() as i32 - 1) / 2)
        .min((area.height() as i32 - 1) / 2)
        .max(0);
    let cx = x.clamp(area.x1 + r, area.x2 - r);
    let cy = y.clamp(area.y1 + r, area.y2 - r);
    let (dx, dy) = (i64::from(x - cx), i64::from(y - cy));
    dx * dx + dy * dy <= i64::from(r) * i64::from(r)
}

/// Clears every pixel of `bounds` outside the rounded rectangle.
pub fn mask(target: &mut PixelBuf, bounds: &Area, area: &Area, radius: i32) {
    for y in bounds.y1..=bounds.y2 {
        let span = target.span_mut(y, bounds.x1, bounds.x2);
        for (x, px) in (bounds.x1..).zip(span.iter_mut()) {
            if !in_rounded_rect(area, radius, x, y) {
                *px = Color32::TRANSPARENT;
            }
        }
    }
}

/// The forward transform of a layer composite, in display coordinates.
#[must_use]
pub fn layer_transform(desc: &LayerDescriptor) -> Affine {
    let pivot = Vec2::new(
        f64::from(desc.source_area.x1 + desc.pivot.0),
        f64::from(desc.source_area.y1 + desc.pivot.1),
    );
    let angle = (f64::from(desc.angle) / 10.0).to_radians();
    let scale = f64::from(desc.zoom) / f64::from(CompositeStyle::ZOOM_NONE);
    Affine::translate(pivot)
        * Affine::rotate(angle)
        * Affine::scale(scale)
        * Affine::translate(-pivot)
}

/// Blends the source layer into `bounds` of the target.
///
/// Untransformed layers are copied pixel for pixel. Transformed layers are
/// inverse-sampled at pixel centers, nearest neighbour, or bilinear when
/// the descriptor asks for antialiasing.
pub fn composite(
    target: &mut PixelBuf,
    bounds: &Area,
    source: &PixelBuf,
    desc: &LayerDescriptor,
) {
    let opaque = !target.format().has_alpha();
    if !desc.is_transformed() {
        let Some(bounds) = bounds.intersect(&source.area()) else {
            return;
        };
        for y in bounds.y1..=bounds.y2 {
            let span = target.span_mut(y, bounds.x1, bounds.x2);
            for (x, px) in (bounds.x1..).zip(span.iter_mut()) {
                if let Some(s) = source.get(x, y) {
                    put(px, s.with_opa(desc.opa), desc.blend_mode, opaque);
                }
            }
        }
        return;
    }

    if desc.zoom == 0 {
        return;
    }
    let inverse = layer_transform(desc).inverse();
    for y in bounds.y1..=bounds.y2 {
        let span = target.span_mut(y, bounds.x1, bounds.x2);
        for (x, px) in (bounds.x1..).zip(span.iter_mut()) {
            let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let s = if desc.antialias {
                sample_bilinear(source, p)
            } else {
                sample_nearest(source, p)
            };
            put(px, s.with_opa(desc.opa), desc.blend_mode, opaque);
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "out-of-range coordinates saturate and miss the buffer"
)]
fn texel(source: &PixelBuf, x: f64, y: f64) -> Color32 {
    source
        .get(x.floor() as i32, y.floor() as i32)
        .unwrap_or(Color32::TRANSPARENT)
}

fn sample_nearest(source: &PixelBuf, p: Point) -> Color32 {
    texel(source, p.x, p.y)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "weighted averages of u8 values stay below 256"
)]
fn sample_bilinear(source: &PixelBuf, p: Point) -> Color32 {
    let (fx, fy) = (p.x - 0.5, p.y - 0.5);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (tx, ty) = (fx - x0, fy - y0);
    let taps = [
        (texel(source, x0, y0), (1.0 - tx) * (1.0 - ty)),
        (texel(source, x0 + 1.0, y0), tx * (1.0 - ty)),
        (texel(source, x0, y0 + 1.0), (1.0 - tx) * ty),
        (texel(source, x0 + 1.0, y0 + 1.0), tx * ty),
    ];
    // Colors are weighted by alpha so transparent texels do not darken edges.
    let (mut a, mut r, mut g, mut b) = (0.0, 0.0, 0.0, 0.0);
    for (c, w) in taps {
        let wa = w * f64::from(c.a);
        a += wa;
        r += wa * f64::from(c.r);
        g += wa * f64::from(c.g);
        b += wa * f64::from(c.b);
    }
    if a < 0.5 {
        return Color32::TRANSPARENT;
    }
    Color32 {
        r: (r / a).round() as u8,
        g: (g / a).round() as u8,
        b: (b / a).round() as u8,
        a: a.round().min(255.0) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repaint_core::color::ColorFormat;
    use repaint_core::draw::DrawPipeline;
    use std::sync::{Arc, Mutex};

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    fn buf(a: Area, format: ColorFormat) -> PixelBuf {
        PixelBuf::try_new(a, format).unwrap()
    }

    const GREY: Color32 = Color32::opaque(100, 100, 100);

    #[test]
    fn half_white_over_black_is_mid_grey() {
        let c = over(Color32::BLACK, Color32::WHITE.with_opa(128));
        assert_eq!(c, Color32::opaque(128, 128, 128));
    }

    #[test]
    fn over_transparent_keeps_the_source() {
        let src = Color32::new(10, 20, 30, 40);
        assert_eq!(over(Color32::TRANSPARENT, src), src);
    }

    #[test]
    fn translucent_over_translucent_accumulates_alpha() {
        let c = over(Color32::new(0, 0, 0, 128), Color32::new(255, 255, 255, 128));
        assert_eq!(c.a, 192);
        assert!(c.r > 128, "source dominates: {c:?}");
    }

    #[test]
    fn blend_modes_combine_channels() {
        let src = Color32::opaque(50, 200, 100);
        assert_eq!(
            blend(GREY, src, BlendMode::Additive),
            Color32::opaque(150, 255, 200)
        );
        assert_eq!(
            blend(GREY, src, BlendMode::Subtractive),
            Color32::opaque(50, 0, 0)
        );
        assert_eq!(
            blend(GREY, src, BlendMode::Multiply),
            Color32::opaque(20, 78, 39)
        );
    }

    #[test]
    fn blend_modes_are_normal_on_transparent_pixels() {
        let src = Color32::opaque(50, 200, 100);
        assert_eq!(blend(Color32::TRANSPARENT, src, BlendMode::Subtractive), src);
    }

    #[test]
    fn fill_on_opaque_format_ignores_stored_alpha() {
        let mut b = buf(area(0, 0, 9, 9), ColorFormat::Xrgb8888);
        fill(&mut b, &area(0, 0, 9, 9), Color32::WHITE.with_opa(128));
        assert_eq!(b.get(5, 5), Some(Color32::opaque(128, 128, 128)));
    }

    #[test]
    fn fill_stays_inside_bounds() {
        let mut b = buf(area(0, 0, 9, 9), ColorFormat::Argb8888);
        fill(&mut b, &area(2, 2, 4, 4), Color32::WHITE);
        assert_eq!(b.get(2, 2), Some(Color32::WHITE));
        assert_eq!(b.get(5, 5), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn image_is_addressed_from_its_origin() {
        let mut b = buf(area(0, 0, 9, 9), ColorFormat::Argb8888);
        let red = Color32::opaque(255, 0, 0);
        let blue = Color32::opaque(0, 0, 255);
        let pixels = [red, blue, blue, red];
        image(&mut b, &area(0, 0, 9, 9), (3, 4), &pixels, (2, 2), 255);
        assert_eq!(b.get(3, 4), Some(red));
        assert_eq!(b.get(4, 4), Some(blue));
        assert_eq!(b.get(3, 5), Some(blue));
        assert_eq!(b.get(4, 5), Some(red));
        assert_eq!(b.get(5, 5), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn short_image_slice_is_skipped() {
        let mut b = buf(area(0, 0, 9, 9), ColorFormat::Argb8888);
        image(&mut b, &area(0, 0, 9, 9), (0, 0), &[Color32::WHITE], (2, 2), 255);
        assert_eq!(b.get(0, 0), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn mask_clears_rounded_corners() {
        let a = area(0, 0, 19, 19);
        let mut b = buf(a, ColorFormat::Argb8888);
        b.clear(Color32::WHITE);
        mask(&mut b, &a, &a, 5);
        assert_eq!(b.get(0, 0), Some(Color32::TRANSPARENT));
        assert_eq!(b.get(19, 19), Some(Color32::TRANSPARENT));
        assert_eq!(b.get(10, 0), Some(Color32::WHITE));
        assert_eq!(b.get(5, 5), Some(Color32::WHITE));
    }

    #[test]
    fn oversized_radius_is_clamped_to_a_circle() {
        let a = area(0, 0, 9, 9);
        assert!(in_rounded_rect(&a, 100, 5, 5));
        assert!(!in_rounded_rect(&a, 100, 0, 0));
        assert!(in_rounded_rect(&a, 0, 0, 0));
        // Half the size of an even box.
        assert!(in_rounded_rect(&a, 5, 4, 0));
        assert!(!in_rounded_rect(&a, 5, 9, 9));
        let odd = area(0, 0, 8, 8);
        assert!(in_rounded_rect(&odd, 100, 4, 0));
        assert!(!in_rounded_rect(&odd, 100, 0, 0));
        // Single pixel and single row.
        assert!(in_rounded_rect(&area(3, 3, 3, 3), 10, 3, 3));
        assert!(in_rounded_rect(&area(0, 0, 9, 0), 10, 0, 0));
    }

    fn layer_desc(source_area: Area) -> LayerDescriptor {
        let pipeline = DrawPipeline::new(source_area, Vec::new());
        let shared = Arc::new(Mutex::new(buf(source_area, ColorFormat::Argb8888)));
        LayerDescriptor {
            source: pipeline.create_root(shared, source_area, ColorFormat::Argb8888),
            source_area,
            opa: 255,
            angle: 0,
            zoom: CompositeStyle::ZOOM_NONE,
            pivot: (0, 0),
            blend_mode: BlendMode::Normal,
            antialias: false,
        }
    }

    #[test]
    fn plain_composite_applies_opacity() {
        let a = area(0, 0, 9, 9);
        let mut src = buf(a, ColorFormat::Argb8888);
        src.fill(&area(0, 0, 4, 9), Color32::WHITE);
        let mut dst = buf(a, ColorFormat::Xrgb8888);
        dst.clear(Color32::BLACK);
        let desc = LayerDescriptor {
            opa: 128,
            ..layer_desc(a)
        };
        composite(&mut dst, &a, &src, &desc);
        assert_eq!(dst.get(2, 2), Some(Color32::opaque(128, 128, 128)));
        assert_eq!(dst.get(7, 2), Some(Color32::BLACK));
    }

    #[test]
    fn half_turn_composite_mirrors_the_source() {
        let a = area(0, 0, 9, 9);
        let mut src = buf(a, ColorFormat::Argb8888);
        src.set(1, 2, Color32::WHITE);
        let mut dst = buf(a, ColorFormat::Xrgb8888);
        dst.clear(Color32::BLACK);
        let desc = LayerDescriptor {
            angle: 1800,
            pivot: (5, 5),
            ..layer_desc(a)
        };
        composite(&mut dst, &a, &src, &desc);
        assert_eq!(dst.get(8, 7), Some(Color32::WHITE));
        assert_eq!(dst.get(1, 2), Some(Color32::BLACK));
    }

    #[test]
    fn double_zoom_scales_about_the_pivot() {
        let a = area(0, 0, 19, 19);
        let mut src = buf(a, ColorFormat::Argb8888);
        src.set(2, 2, Color32::WHITE);
        let mut dst = buf(a, ColorFormat::Argb8888);
        let desc = LayerDescriptor {
            zoom: 512,
            ..layer_desc(a)
        };
        composite(&mut dst, &a, &src, &desc);
        for (x, y) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert_eq!(dst.get(x, y), Some(Color32::WHITE), "({x}, {y})");
        }
        assert_eq!(dst.get(6, 6), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn bilinear_sampling_of_a_uniform_layer_is_exact() {
        let a = area(0, 0, 19, 19);
        let mut src = buf(a, ColorFormat::Argb8888);
        src.clear(GREY);
        let mut dst = buf(a, ColorFormat::Argb8888);
        let desc = LayerDescriptor {
            angle: 300,
            pivot: (10, 10),
            antialias: true,
            ..layer_desc(a)
        };
        composite(&mut dst, &area(8, 8, 12, 12), &src, &desc);
        assert_eq!(dst.get(10, 10), Some(GREY));
    }

    #[test]
    fn zero_zoom_draws_nothing() {
        let a = area(0, 0, 9, 9);
        let mut src = buf(a, ColorFormat::Argb8888);
        src.clear(Color32::WHITE);
        let mut dst = buf(a, ColorFormat::Argb8888);
        let desc = LayerDescriptor {
            zoom: 0,
            ..layer_desc(a)
        };
        composite(&mut dst, &a, &src, &desc);
        assert_eq!(dst.get(5, 5), Some(Color32::TRANSPARENT));
    }
}
