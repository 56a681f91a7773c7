// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing surface handed to object draw hooks.

use std::sync::Arc;

use crate::area::Area;
use crate::color::{Color32, Opa};
use crate::error::InvalidateError;
use crate::invalidate::InvalidationTracker;

use super::id::{LayerId, TaskId};
use super::pipeline::DrawPipeline;
use super::task::DrawDescriptor;

/// A layer and the clip an object may draw into.
///
/// The clip is fixed for the lifetime of the context; the scheduler builds
/// a new context for each object instead of narrowing a shared one.
#[derive(Debug)]
pub struct DrawCtx<'a> {
    pipeline: &'a DrawPipeline,
    layer: LayerId,
    clip: Area,
    tracker: &'a mut InvalidationTracker,
}

impl<'a> DrawCtx<'a> {
    pub(crate) fn new(
        pipeline: &'a DrawPipeline,
        layer: LayerId,
        clip: Area,
        tracker: &'a mut InvalidationTracker,
    ) -> Self {
        Self {
            pipeline,
            layer,
            clip,
            tracker,
        }
    }

    /// The layer drawn into.
    #[inline]
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Pixels outside this area are not touched.
    #[inline]
    #[must_use]
    pub fn clip(&self) -> Area {
        self.clip
    }

    /// Queues an arbitrary draw task over `area`.
    ///
    /// Returns `None` if the area is clipped away or the layer is gone.
    pub fn add_task(&mut self, area: Area, descriptor: DrawDescriptor) -> Option<TaskId> {
        match self
            .pipeline
            .add_task(self.layer, area, self.clip, descriptor)
        {
            Ok(id) => id,
            Err(err) => {
                log::warn!("draw task dropped: {err}");
                None
            }
        }
    }

    /// Fills `area` with a color.
    pub fn fill(&mut self, area: Area, color: Color32, opa: Opa) -> Option<TaskId> {
        self.add_task(area, DrawDescriptor::Fill { color, opa })
    }

    /// Draws a bitmap with its top-left corner at `(x, y)`.
    ///
    /// Returns `None` without drawing if `pixels` does not hold
    /// `width * height` values or either dimension is zero.
    pub fn image(
        &mut self,
        (x, y): (i32, i32),
        (width, height): (u32, u32),
        pixels: Arc<[Color32]>,
        opa: Opa,
    ) -> Option<TaskId> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize {
            log::warn!(
                "image dropped: {} pixels for a {width}x{height} bitmap",
                pixels.len()
            );
            return None;
        }
        let area = Area::from_origin_size(x, y, width, height);
        self.add_task(
            area,
            DrawDescriptor::Image {
                pixels,
                size: (width, height),
                opa,
            },
        )
    }

    /// Requests a redraw. Always rejected while the frame renders; the
    /// request has to be repeated after the frame.
    pub fn invalidate(&mut self, area: Option<Area>) -> Result<(), InvalidateError> {
        self.tracker.invalidate(area)
    }
}
