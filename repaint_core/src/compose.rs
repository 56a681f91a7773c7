// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Z-order compositing of the object tree into a layer.
//!
//! Drawing an area starts at the object found by occlusion culling rather
//! than at the screen root. Everything painted after that object in a full
//! back-to-front walk is then drawn by climbing the ancestor chain:
//!
//! ```text
//!   draw(top)
//!   border = top
//!   for parent in ancestors(top):
//!       draw each child of parent after border
//!       fire parent's post hooks
//!       border = parent
//! ```
//!
//! Clips are values: every call receives the clip it may draw into and
//! hands a narrowed copy to its children.

use crate::area::Area;
use crate::color::{BlendMode, ColorFormat, OPA_COVER};
use crate::config::DisplayConfig;
use crate::draw::{DrawCtx, DrawDescriptor, DrawPipeline, LayerDescriptor, LayerId};
use crate::invalidate::InvalidationTracker;
use crate::tree::{DrawPhase, Isolation, ObjectTree};

/// Display settings the compositor needs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ComposeParams {
    /// Format of layers that need no alpha.
    pub(crate) format: ColorFormat,
    pub(crate) antialias: bool,
    /// Memory budget of one simple isolation band.
    pub(crate) layer_buf_bytes: usize,
}

impl ComposeParams {
    pub(crate) fn from_config(config: &DisplayConfig) -> Self {
        Self {
            format: config.color_format,
            antialias: config.antialiasing,
            layer_buf_bytes: config.simple_layer_buf_bytes,
        }
    }
}

/// Walks the tree, turning draw hooks into tasks on the pipeline.
pub(crate) struct Composer<'a, T: ObjectTree + ?Sized> {
    pub(crate) tree: &'a mut T,
    pub(crate) pipeline: &'a DrawPipeline,
    pub(crate) tracker: &'a mut InvalidationTracker,
    pub(crate) params: ComposeParams,
}

impl<T: ObjectTree + ?Sized> core::fmt::Debug for Composer<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Composer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<T: ObjectTree + ?Sized> Composer<'_, T> {
    /// Draws `top` and everything painted after it below its root.
    pub(crate) fn draw_from(&mut self, layer: LayerId, clip: Area, top: T::Obj) {
        self.draw_object(layer, clip, top);

        let mut border = top;
        while let Some(parent) = self.tree.parent(border) {
            let count = self.tree.child_count(parent);
            let after = (0..count)
                .position(|i| self.tree.child(parent, i) == border)
                .map_or(count, |i| i + 1);
            for i in after..count {
                let child = self.tree.child(parent, i);
                self.draw_object(layer, clip, child);
            }
            self.fire(parent, &DrawPhase::POST, layer, clip);
            border = parent;
        }
    }

    /// Draws an object and its subtree, isolating it when it asks for it.
    pub(crate) fn draw_object(&mut self, layer: LayerId, clip: Area, obj: T::Obj) {
        if self.tree.is_hidden(obj) {
            return;
        }
        match self.tree.isolation(obj) {
            Isolation::None => self.redraw(layer, clip, obj),
            kind => self.draw_isolated(layer, clip, obj, kind),
        }
    }

    /// Fires the object's hooks and draws its children straight into
    /// `layer`.
    pub(crate) fn redraw(&mut self, layer: LayerId, clip: Area, obj: T::Obj) {
        let obj_clip = clip.intersect(&self.tree.ext_coords(obj));
        if let Some(obj_clip) = obj_clip {
            self.fire(obj, &DrawPhase::MAIN, layer, obj_clip);
        }

        let coords = self.tree.coords(obj);
        let children_clip = if self.tree.overflow_visible(obj) {
            Some(clip)
        } else {
            clip.intersect(&coords)
        };
        if let Some(children_clip) = children_clip
            && self.tree.child_count(obj) > 0
        {
            let radius = self.tree.clip_corner_radius(obj);
            if radius > 0 {
                self.draw_children_rounded(layer, clip, children_clip, obj, radius);
            } else {
                self.draw_children(layer, children_clip, obj);
            }
        }

        if let Some(obj_clip) = obj_clip {
            self.fire(obj, &DrawPhase::POST, layer, obj_clip);
        }
    }

    fn draw_children(&mut self, layer: LayerId, clip: Area, obj: T::Obj) {
        for i in 0..self.tree.child_count(obj) {
            let child = self.tree.child(obj, i);
            self.draw_object(layer, clip, child);
        }
    }

    /// Draws the children into their own layer, masks its corners and
    /// composites it back.
    fn draw_children_rounded(
        &mut self,
        layer: LayerId,
        clip: Area,
        children_clip: Area,
        obj: T::Obj,
        radius: i32,
    ) {
        let child_layer =
            match self
                .pipeline
                .create_layer(layer, children_clip, ColorFormat::Argb8888)
            {
                Ok(l) => l,
                Err(err) => {
                    log::warn!("children of {obj:?} not drawn: {err}");
                    return;
                }
            };
        self.draw_children(child_layer, children_clip, obj);

        let mask = DrawDescriptor::Mask {
            area: self.tree.coords(obj),
            radius,
        };
        if let Err(err) = self
            .pipeline
            .add_task(child_layer, children_clip, children_clip, mask)
        {
            log::warn!("corner mask of {obj:?} dropped: {err}");
        }

        let composite = LayerDescriptor {
            source: child_layer,
            source_area: children_clip,
            opa: OPA_COVER,
            angle: 0,
            zoom: 256,
            pivot: (0, 0),
            blend_mode: BlendMode::Normal,
            antialias: self.params.antialias,
        };
        if let Err(err) = self
            .pipeline
            .add_composite(layer, children_clip, clip, composite)
        {
            log::warn!("children of {obj:?} not composited: {err}");
        }
    }

    fn fire(&mut self, obj: T::Obj, phases: &[DrawPhase], layer: LayerId, clip: Area) {
        let mut ctx = DrawCtx::new(self.pipeline, layer, clip, self.tracker);
        for phase in phases {
            self.tree.draw(obj, *phase, &mut ctx);
        }
    }
}
