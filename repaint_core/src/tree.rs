// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interface the refresh scheduler consumes from the object tree.
//!
//! The tree, its styles and its layout engine live outside this crate. The
//! scheduler only needs the queries in [`ObjectTree`]: geometry, z-order,
//! occlusion answers, isolation styles and the six draw hooks.

use crate::area::Area;
use crate::color::{BlendMode, OPA_COVER, Opa};
use crate::draw::DrawCtx;
use crate::invalidate::InvalidationTracker;

/// Answer to "does this object fully cover the area with opaque pixels?".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoverResult {
    /// The object covers the whole area.
    Cover,
    /// The object or a descendant masks what is behind; nothing below it
    /// can be trusted to be hidden.
    Masked,
    /// The object does not cover the area.
    NotCover,
}

/// Why an object must be drawn into its own offscreen layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Isolation {
    /// Drawn straight into the current layer.
    #[default]
    None,
    /// Needs opacity, blending or clipping applied as a whole; the layer can
    /// be split into bands.
    Simple,
    /// Rotated or zoomed; the layer covers the whole inverse-transformed
    /// area in one band.
    Transform,
}

/// The six draw hooks of an object, in the order they fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawPhase {
    /// Before the main draw.
    MainBegin,
    /// Draw the object itself.
    Main,
    /// After the main draw.
    MainEnd,
    /// Before drawing over the children.
    PostBegin,
    /// Draw over the children.
    Post,
    /// After the post draw.
    PostEnd,
}

impl DrawPhase {
    /// Main phases, in order.
    pub const MAIN: [Self; 3] = [Self::MainBegin, Self::Main, Self::MainEnd];
    /// Post phases, in order.
    pub const POST: [Self; 3] = [Self::PostBegin, Self::Post, Self::PostEnd];
}

/// Style values applied when an isolated object is composited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeStyle {
    /// Whole-object opacity.
    pub opa: Opa,
    /// Rotation in tenths of a degree, any sign.
    pub angle: i32,
    /// Zoom with 256 meaning 100%.
    pub zoom: u16,
    /// Transform pivot relative to the object's top-left corner.
    pub pivot: (i32, i32),
    /// Blend mode.
    pub blend_mode: BlendMode,
}

impl CompositeStyle {
    /// Zoom value for no scaling.
    pub const ZOOM_NONE: u16 = 256;

    /// An opaque, untransformed style.
    pub const IDENTITY: Self = Self {
        opa: OPA_COVER,
        angle: 0,
        zoom: Self::ZOOM_NONE,
        pivot: (0, 0),
        blend_mode: BlendMode::Normal,
    };

    /// Whether the style rotates or scales.
    #[inline]
    #[must_use]
    pub const fn is_transformed(&self) -> bool {
        self.angle % 3600 != 0 || self.zoom != Self::ZOOM_NONE
    }
}

impl Default for CompositeStyle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The queries the scheduler makes against the object tree.
///
/// Children are indexed back to front: child `0` is painted first and the
/// last child is on top.
pub trait ObjectTree {
    /// Object handle.
    type Obj: Copy + Eq + core::fmt::Debug;

    /// Resolves pending layout below `root`.
    ///
    /// Called before the render pass starts, so geometry changes may
    /// invalidate through `tracker`.
    fn update_layout(&mut self, root: Self::Obj, tracker: &mut InvalidationTracker);

    /// The object's box in display coordinates.
    fn coords(&self, obj: Self::Obj) -> Area;

    /// Extra margin drawn outside the box (shadow, outline).
    fn ext_draw_size(&self, obj: Self::Obj) -> i32 {
        _ = obj;
        0
    }

    /// The object's parent, `None` for a root.
    fn parent(&self, obj: Self::Obj) -> Option<Self::Obj>;

    /// Number of children.
    fn child_count(&self, obj: Self::Obj) -> usize;

    /// The `index`-th child, back to front.
    fn child(&self, obj: Self::Obj, index: usize) -> Self::Obj;

    /// Whether the object and its subtree are hidden.
    fn is_hidden(&self, obj: Self::Obj) -> bool;

    /// Whether and how the object is isolated into its own layer.
    fn isolation(&self, obj: Self::Obj) -> Isolation {
        _ = obj;
        Isolation::None
    }

    /// Whether the object covers `area` with opaque pixels.
    fn cover_check(&self, obj: Self::Obj, area: &Area) -> CoverResult;

    /// Style used to composite an isolated object.
    fn composite_style(&self, obj: Self::Obj) -> CompositeStyle {
        _ = obj;
        CompositeStyle::IDENTITY
    }

    /// Corner radius the object clips its children to; zero for none.
    fn clip_corner_radius(&self, obj: Self::Obj) -> i32 {
        _ = obj;
        0
    }

    /// Whether children may draw outside the object's box.
    fn overflow_visible(&self, obj: Self::Obj) -> bool {
        _ = obj;
        false
    }

    /// Fires one draw hook. Drawing goes through `ctx`.
    fn draw(&mut self, obj: Self::Obj, phase: DrawPhase, ctx: &mut DrawCtx<'_>);

    /// The extended box: [`coords`](Self::coords) grown by
    /// [`ext_draw_size`](Self::ext_draw_size).
    fn ext_coords(&self, obj: Self::Obj) -> Area {
        let coords = self.coords(obj);
        let ext = self.ext_draw_size(obj);
        coords.increase(ext, ext).unwrap_or(coords)
    }
}

/// The roots one display draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screens<O> {
    /// The screen being shown.
    pub active: Option<O>,
    /// The screen being transitioned away from, if any.
    pub previous: Option<O>,
    /// Drawn below the screens when nothing covers an area.
    pub bottom: Option<O>,
    /// Overlay drawn above the screens.
    pub top: Option<O>,
    /// System overlay drawn above everything.
    pub sys: Option<O>,
}

impl<O> Default for Screens<O> {
    fn default() -> Self {
        Self {
            active: None,
            previous: None,
            bottom: None,
            top: None,
            sys: None,
        }
    }
}

impl<O: Copy> Screens<O> {
    /// Only an active screen.
    #[must_use]
    pub fn with_active(active: O) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    /// Every root that needs layout, in layout order.
    pub fn layout_roots(&self) -> impl Iterator<Item = O> {
        [self.active, self.previous, self.bottom, self.top, self.sys]
            .into_iter()
            .flatten()
    }
}
