// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing objects through offscreen layers.
//!
//! An isolated object is drawn into one or more layers and composited into
//! its parent with its opacity, blend mode and transform:
//!
//! ```text
//!   full = area of the object needed to cover the clip
//!   for band in full, top to bottom:
//!       rows  = budget without alpha
//!       alpha = object does not cover the band?  ──► rows = budget with alpha
//!       layer = new layer(band, alpha ? Argb8888 : display format)
//!       redraw object into layer
//!       composite layer into parent
//! ```
//!
//! Transformed objects always use a single band: the transform needs the
//! whole source.

use kurbo::{Affine, Point};

use crate::area::Area;
use crate::color::{ColorFormat, OPA_MIN};
use crate::compose::Composer;
use crate::draw::{LayerDescriptor, LayerId};
use crate::tree::{CompositeStyle, CoverResult, Isolation, ObjectTree};

/// The transform of a style: rotation and zoom about the pivot, which is
/// given relative to `coords`.
#[must_use]
pub(crate) fn style_transform(style: &CompositeStyle, coords: Area) -> Affine {
    let pivot = Point::new(
        f64::from(coords.x1 + style.pivot.0),
        f64::from(coords.y1 + style.pivot.1),
    )
    .to_vec2();
    let angle = f64::from(style.angle).to_radians() / 10.0;
    let scale = f64::from(style.zoom) / f64::from(CompositeStyle::ZOOM_NONE);
    Affine::translate(pivot)
        * Affine::rotate(angle)
        * Affine::scale(scale)
        * Affine::translate(-pivot)
}

/// Bounding area of `area` after `transform`.
fn transformed(area: Area, transform: Affine) -> Option<Area> {
    Area::cover_rect(transform.transform_rect_bbox(area.to_rect()))
}

/// The part of the object's extended box that has to be drawn for the
/// result to cover `clip`.
pub(crate) fn layer_area(
    kind: Isolation,
    clip: Area,
    ext: Area,
    transform: Affine,
) -> Option<Area> {
    match kind {
        Isolation::None => None,
        Isolation::Simple => clip.intersect(&ext),
        Isolation::Transform => {
            let on_screen = transformed(ext, transform)?.intersect(&clip)?;
            let source = transformed(on_screen, transform.inverse())?.intersect(&ext)?;
            // Absorbs rounding in the inverse transform.
            source.increase(1, 1)
        }
    }
}

/// Whether a band of the object may contain translucent pixels.
pub(crate) fn needs_alpha<T: ObjectTree + ?Sized>(tree: &T, obj: T::Obj, band: &Area) -> bool {
    if !band.is_on(&tree.coords(obj)) {
        return false;
    }
    tree.cover_check(obj, band) != CoverResult::Cover
}

/// Rows per band without and with alpha for a band `width` wide.
fn band_budget(layer_buf_bytes: usize, width: u32, format: ColorFormat) -> (u32, u32) {
    let row = |px: u32| {
        let rows = layer_buf_bytes / (width as usize * px as usize).max(1);
        u32::try_from(rows).unwrap_or(u32::MAX).max(1)
    };
    (
        row(format.bytes_per_pixel()),
        row(ColorFormat::Argb8888.bytes_per_pixel()),
    )
}

impl<T: ObjectTree + ?Sized> Composer<'_, T> {
    /// Draws `obj` into offscreen layers composited into `layer`.
    pub(crate) fn draw_isolated(
        &mut self,
        layer: LayerId,
        clip: Area,
        obj: T::Obj,
        kind: Isolation,
    ) {
        let style = self.tree.composite_style(obj);
        if style.opa < OPA_MIN {
            return;
        }
        let coords = self.tree.coords(obj);
        let ext = self.tree.ext_coords(obj);
        let transform = style_transform(&style, coords);
        let Some(full) = layer_area(kind, clip, ext, transform) else {
            return;
        };

        let (rgb_rows, argb_rows) = match kind {
            Isolation::Simple => band_budget(
                self.params.layer_buf_bytes,
                full.width(),
                self.params.format,
            ),
            _ => (full.height(), full.height()),
        };

        let mut y1 = full.y1;
        while y1 <= full.y2 {
            let rows_to =
                |rows: u32| y1.saturating_add(i32::try_from(rows).unwrap_or(i32::MAX) - 1);
            let Some(mut band) = full.rows(y1, rows_to(rgb_rows)) else {
                break;
            };
            let alpha = needs_alpha(&*self.tree, obj, &band);
            if alpha && let Some(narrow) = full.rows(y1, rows_to(argb_rows)) {
                band = narrow;
            }
            let format = if alpha {
                ColorFormat::Argb8888
            } else {
                self.params.format
            };

            let child = match self.pipeline.create_layer(layer, band, format) {
                Ok(child) => child,
                Err(err) => {
                    log::warn!("isolated {obj:?} not drawn: {err}");
                    return;
                }
            };
            self.redraw(child, band, obj);

            let transformed_kind = kind == Isolation::Transform;
            #[expect(
                clippy::cast_possible_truncation,
                reason = "rem_euclid(3600) is below u16::MAX"
            )]
            let desc = LayerDescriptor {
                source: child,
                source_area: band,
                opa: style.opa,
                angle: if transformed_kind {
                    style.angle.rem_euclid(3600) as u16
                } else {
                    0
                },
                zoom: if transformed_kind {
                    style.zoom
                } else {
                    CompositeStyle::ZOOM_NONE
                },
                pivot: (
                    coords.x1 + style.pivot.0 - band.x1,
                    coords.y1 + style.pivot.1 - band.y1,
                ),
                blend_mode: style.blend_mode,
                antialias: self.params.antialias,
            };
            let area = if transformed_kind {
                transformed(band, transform).unwrap_or(band)
            } else {
                band
            };
            if let Err(err) = self.pipeline.add_composite(layer, area, clip, desc) {
                log::warn!("isolated {obj:?} not composited: {err}");
            }

            y1 = band.y2 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color32, OPA_50};
    use crate::compose::ComposeParams;
    use crate::config::{DisplayConfig, RenderMode};
    use crate::draw::DrawPipeline;
    use crate::invalidate::InvalidationTracker;
    use crate::pixbuf::{PixelBuf, lock};
    use crate::testing::{ImmediateUnit, MockTree};
    use std::sync::{Arc, Mutex};

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn identity_style_does_not_move_anything() {
        let coords = area(10, 10, 29, 19);
        let t = style_transform(&CompositeStyle::IDENTITY, coords);
        assert_eq!(transformed(coords, t), Some(coords));
    }

    #[test]
    fn quarter_turn_about_the_centre_swaps_extents() {
        let coords = area(0, 0, 39, 19);
        let style = CompositeStyle {
            angle: 900,
            pivot: (20, 10),
            ..CompositeStyle::IDENTITY
        };
        let t = style_transform(&style, coords);
        assert_eq!(transformed(coords, t), Some(area(10, -10, 29, 29)));
    }

    #[test]
    fn simple_layer_area_is_the_visible_part_of_the_box() {
        let ext = area(50, 50, 149, 149);
        let clip = area(0, 0, 99, 99);
        assert_eq!(
            layer_area(Isolation::Simple, clip, ext, Affine::IDENTITY),
            Some(area(50, 50, 99, 99))
        );
        assert_eq!(
            layer_area(Isolation::Simple, area(0, 0, 9, 9), ext, Affine::IDENTITY),
            None
        );
    }

    #[test]
    fn transform_layer_area_is_inverse_mapped_and_padded() {
        let ext = area(0, 0, 99, 99);
        // Zoom 2x about the origin: only the top-left quarter is visible.
        let style = CompositeStyle {
            zoom: 512,
            ..CompositeStyle::IDENTITY
        };
        let t = style_transform(&style, ext);
        assert_eq!(
            layer_area(Isolation::Transform, ext, ext, t),
            Some(area(-1, -1, 50, 50))
        );
    }

    #[test]
    fn budgets_never_drop_below_one_row() {
        assert_eq!(band_budget(24 * 1024, 100, ColorFormat::Rgb565), (122, 61));
        assert_eq!(band_budget(16, 100, ColorFormat::Xrgb8888), (1, 1));
    }

    const SCREEN: Area = Area {
        x1: 0,
        y1: 0,
        x2: 99,
        y2: 99,
    };

    fn run(
        tree: &mut MockTree,
        top: crate::testing::MockId,
        config: &DisplayConfig,
    ) -> (Arc<DrawPipeline>, Arc<Mutex<PixelBuf>>) {
        let pipeline = DrawPipeline::new(SCREEN, vec![Box::new(ImmediateUnit::default())]);
        let buf = Arc::new(Mutex::new(
            PixelBuf::try_new(SCREEN, ColorFormat::Xrgb8888).unwrap(),
        ));
        let root = pipeline.create_root(buf.clone(), SCREEN, ColorFormat::Xrgb8888);
        let mut tracker = InvalidationTracker::new(SCREEN, RenderMode::Partial, 8);
        let mut composer = Composer {
            tree,
            pipeline: &pipeline,
            tracker: &mut tracker,
            params: ComposeParams::from_config(config),
        };
        composer.draw_from(root, SCREEN, top);
        pipeline.finish(root);
        (pipeline, buf)
    }

    #[test]
    fn half_opacity_object_is_blended_through_an_alpha_layer() {
        let mut tree = MockTree::new();
        let screen = tree.add_root(SCREEN, Some(Color32::BLACK));
        let obj = tree.add(screen, area(20, 20, 39, 39), Some(Color32::WHITE));
        tree.node_mut(obj).isolation = Isolation::Simple;
        tree.node_mut(obj).style.opa = OPA_50;

        let (pipeline, buf) = run(&mut tree, screen, &DisplayConfig::partial(100, 100));
        let stats = pipeline.stats();
        assert_eq!(stats.layers_created, 1, "fits one band");
        assert_eq!(stats.alpha_layers_created, 1);
        assert_eq!(stats.layers_freed, 1);
        let px = lock(&buf).get(30, 30).unwrap();
        assert!((127..=129).contains(&px.r), "about half white: {px:?}");
        assert_eq!(lock(&buf).get(10, 10), Some(Color32::BLACK));
    }

    #[test]
    fn invisible_object_is_skipped() {
        let mut tree = MockTree::new();
        let screen = tree.add_root(SCREEN, Some(Color32::BLACK));
        let obj = tree.add(screen, area(20, 20, 39, 39), Some(Color32::WHITE));
        tree.node_mut(obj).isolation = Isolation::Simple;
        tree.node_mut(obj).style.opa = 1;

        let (pipeline, _) = run(&mut tree, screen, &DisplayConfig::partial(100, 100));
        assert_eq!(pipeline.stats().layers_created, 0);
        assert!(!tree.main_draws().any(|o| o == obj));
    }

    #[test]
    fn tall_simple_layer_is_split_into_bands() {
        let mut tree = MockTree::new();
        let screen = tree.add_root(SCREEN, Some(Color32::BLACK));
        let obj = tree.add(screen, area(0, 0, 99, 99), Some(Color32::WHITE));
        tree.node_mut(obj).isolation = Isolation::Simple;

        // 100 px wide rows of 4 bytes: 10 rows per band.
        let mut config = DisplayConfig::partial(100, 100);
        config.simple_layer_buf_bytes = 4000;
        let (pipeline, buf) = run(&mut tree, screen, &config);
        let stats = pipeline.stats();
        assert_eq!(stats.layers_created, 10);
        assert_eq!(stats.alpha_layers_created, 0, "opaque object needs no alpha");
        assert_eq!(stats.layers_freed, 10);
        assert_eq!(pipeline.layer_count(), 1);
        assert_eq!(lock(&buf).get(50, 95), Some(Color32::WHITE));
    }
}
