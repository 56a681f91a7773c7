// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test fixtures: an in-memory object tree, a recording panel and an inline
//! draw unit.
//!
//! Enabled by the `test-helpers` feature.

use std::sync::{Arc, Mutex};

use crate::area::Area;
use crate::color::{Color32, OPA_COVER};
use crate::draw::{
    DispatchOutcome, DrawCtx, DrawDescriptor, DrawUnit, LayerId, TaskJob, TaskQueue,
};
use crate::error::InvalidateError;
use crate::flush::{FlushChunk, FlushHandle, Panel};
use crate::invalidate::InvalidationTracker;
use crate::pixbuf::{PixelBuf, lock};
use crate::tree::{CompositeStyle, CoverResult, DrawPhase, Isolation, ObjectTree};

// ---------------------------------------------------------------------------
// MockTree
// ---------------------------------------------------------------------------

/// Handle of a [`MockTree`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockId(pub usize);

/// One node of a [`MockTree`]. Every field may be changed between frames.
#[derive(Clone, Debug)]
pub struct MockNode {
    /// Box in display coordinates.
    pub coords: Area,
    /// Parent node.
    pub parent: Option<MockId>,
    /// Children, back to front.
    pub children: Vec<MockId>,
    /// Color the main hook fills the box with.
    pub fill: Option<Color32>,
    /// Forced cover answer; derived from `fill` and `style` when `None`.
    pub cover: Option<CoverResult>,
    /// Hidden flag.
    pub hidden: bool,
    /// Isolation kind.
    pub isolation: Isolation,
    /// Composite style used when isolated.
    pub style: CompositeStyle,
    /// Corner radius children are clipped to.
    pub clip_radius: i32,
    /// Whether children may draw outside the box.
    pub overflow_visible: bool,
    /// Extra draw margin.
    pub ext_draw: i32,
    /// Area the main hook tries to invalidate.
    pub invalidate_on_draw: Option<Area>,
}

/// An object tree held in a vector, recording every hook it receives.
#[derive(Clone, Debug, Default)]
pub struct MockTree {
    nodes: Vec<MockNode>,
    draws: Vec<(MockId, DrawPhase)>,
    layouts: Vec<MockId>,
    layout_dirty: Vec<Area>,
    invalidations: Vec<Result<(), InvalidateError>>,
}

impl MockTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parentless node, such as a screen or an overlay root.
    pub fn add_root(&mut self, coords: Area, fill: Option<Color32>) -> MockId {
        self.push(None, coords, fill)
    }

    /// Adds a node on top of `parent`'s existing children.
    pub fn add(&mut self, parent: MockId, coords: Area, fill: Option<Color32>) -> MockId {
        let id = self.push(Some(parent), coords, fill);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, parent: Option<MockId>, coords: Area, fill: Option<Color32>) -> MockId {
        let id = MockId(self.nodes.len());
        self.nodes.push(MockNode {
            coords,
            parent,
            children: Vec::new(),
            fill,
            cover: None,
            hidden: false,
            isolation: Isolation::None,
            style: CompositeStyle::IDENTITY,
            clip_radius: 0,
            overflow_visible: false,
            ext_draw: 0,
            invalidate_on_draw: None,
        });
        id
    }

    /// Replaces the child order of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `order` is not a permutation of the current children.
    pub fn reorder(&mut self, parent: MockId, order: &[MockId]) {
        let children = &mut self.nodes[parent.0].children;
        let mut sorted = order.to_vec();
        sorted.sort_by_key(|c| c.0);
        let mut current = children.clone();
        current.sort_by_key(|c| c.0);
        assert_eq!(sorted, current, "reorder must keep the same children");
        *children = order.to_vec();
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: MockId) -> &mut MockNode {
        &mut self.nodes[id.0]
    }

    /// Every hook fired so far.
    #[must_use]
    pub fn draws(&self) -> &[(MockId, DrawPhase)] {
        &self.draws
    }

    /// Objects whose main hook fired, in order.
    pub fn main_draws(&self) -> impl Iterator<Item = MockId> + '_ {
        self.phase_draws(DrawPhase::Main)
    }

    /// Objects whose post hook fired, in order.
    pub fn post_draws(&self) -> impl Iterator<Item = MockId> + '_ {
        self.phase_draws(DrawPhase::Post)
    }

    fn phase_draws(&self, phase: DrawPhase) -> impl Iterator<Item = MockId> + '_ {
        self.draws
            .iter()
            .filter(move |(_, p)| *p == phase)
            .map(|(id, _)| *id)
    }

    /// Forgets recorded hooks.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    /// Roots passed to `update_layout`, in order.
    #[must_use]
    pub fn layouts(&self) -> &[MockId] {
        &self.layouts
    }

    /// Makes the next layout pass invalidate `area`.
    pub fn dirty_on_layout(&mut self, area: Area) {
        self.layout_dirty.push(area);
    }

    /// Results of invalidations attempted from draw hooks.
    #[must_use]
    pub fn invalidations(&self) -> &[Result<(), InvalidateError>] {
        &self.invalidations
    }
}

impl ObjectTree for MockTree {
    type Obj = MockId;

    fn update_layout(&mut self, root: MockId, tracker: &mut InvalidationTracker) {
        self.layouts.push(root);
        for area in core::mem::take(&mut self.layout_dirty) {
            if let Err(err) = tracker.invalidate(Some(area)) {
                self.invalidations.push(Err(err));
            }
        }
    }

    fn coords(&self, obj: MockId) -> Area {
        self.nodes[obj.0].coords
    }

    fn ext_draw_size(&self, obj: MockId) -> i32 {
        self.nodes[obj.0].ext_draw
    }

    fn parent(&self, obj: MockId) -> Option<MockId> {
        self.nodes[obj.0].parent
    }

    fn child_count(&self, obj: MockId) -> usize {
        self.nodes[obj.0].children.len()
    }

    fn child(&self, obj: MockId, index: usize) -> MockId {
        self.nodes[obj.0].children[index]
    }

    fn is_hidden(&self, obj: MockId) -> bool {
        self.nodes[obj.0].hidden
    }

    fn isolation(&self, obj: MockId) -> Isolation {
        self.nodes[obj.0].isolation
    }

    fn cover_check(&self, obj: MockId, area: &Area) -> CoverResult {
        let node = &self.nodes[obj.0];
        if let Some(cover) = node.cover {
            return cover;
        }
        let opaque = node.fill.is_some_and(|c| c.a == OPA_COVER) && node.style.opa == OPA_COVER;
        if opaque && area.is_in(&node.coords) {
            CoverResult::Cover
        } else {
            CoverResult::NotCover
        }
    }

    fn composite_style(&self, obj: MockId) -> CompositeStyle {
        self.nodes[obj.0].style
    }

    fn clip_corner_radius(&self, obj: MockId) -> i32 {
        self.nodes[obj.0].clip_radius
    }

    fn overflow_visible(&self, obj: MockId) -> bool {
        self.nodes[obj.0].overflow_visible
    }

    fn draw(&mut self, obj: MockId, phase: DrawPhase, ctx: &mut DrawCtx<'_>) {
        self.draws.push((obj, phase));
        if phase != DrawPhase::Main {
            return;
        }
        let node = &self.nodes[obj.0];
        if let Some(color) = node.fill {
            ctx.fill(node.coords, color, OPA_COVER);
        }
        if let Some(area) = node.invalidate_on_draw {
            self.invalidations.push(ctx.invalidate(Some(area)));
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingPanel
// ---------------------------------------------------------------------------

/// One flush received by a [`RecordingPanel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlushRecord {
    /// Target area.
    pub area: Area,
    /// End-of-frame flag.
    pub last: bool,
    /// The pushed pixels, row by row.
    pub pixels: Vec<Color32>,
}

/// A panel that keeps everything it is sent.
#[derive(Debug, Default)]
pub struct RecordingPanel {
    /// Flushes in arrival order.
    pub flushes: Vec<FlushRecord>,
    /// Number of calls to [`Panel::wait`].
    pub waits: usize,
    /// Whether a flush arrived before the previous one was waited on.
    pub overlapped: bool,
    deferred: bool,
    pending: bool,
    frame: Option<PixelBuf>,
}

impl RecordingPanel {
    /// A panel that completes every flush before returning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A panel that completes a flush only once it is waited on.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    /// Also assembles flushed pixels into a `screen`-sized frame.
    ///
    /// # Panics
    ///
    /// Panics if the frame cannot be allocated.
    #[must_use]
    pub fn with_frame(mut self, screen: Area) -> Self {
        let frame = PixelBuf::try_new(screen, crate::color::ColorFormat::Argb8888)
            .expect("test frame allocation");
        self.frame = Some(frame);
        self
    }

    /// A pixel of the assembled frame.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color32> {
        self.frame.as_ref()?.get(x, y)
    }

    /// Areas of all flushes.
    #[must_use]
    pub fn areas(&self) -> Vec<Area> {
        self.flushes.iter().map(|f| f.area).collect()
    }
}

impl Panel for RecordingPanel {
    fn flush(&mut self, chunk: &FlushChunk<'_>, done: &FlushHandle) {
        let area = chunk.area();
        let mut pixels = Vec::with_capacity(usize::try_from(area.size()).unwrap_or(0));
        for (row, line) in chunk.rows().enumerate() {
            pixels.extend_from_slice(line);
            if let Some(frame) = &mut self.frame {
                let y = area.y1 + i32::try_from(row).unwrap_or(i32::MAX);
                frame.span_mut(y, area.x1, area.x2).copy_from_slice(line);
            }
        }
        self.flushes.push(FlushRecord {
            area,
            last: chunk.is_last(),
            pixels,
        });
        if self.deferred {
            self.overlapped |= self.pending;
            self.pending = true;
        } else {
            done.ready();
        }
    }

    fn wait(&mut self, done: &FlushHandle) {
        self.waits += 1;
        self.pending = false;
        done.ready();
    }
}

// ---------------------------------------------------------------------------
// ImmediateUnit
// ---------------------------------------------------------------------------

/// A task run by an [`ImmediateUnit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedTask {
    /// Target layer.
    pub layer: LayerId,
    /// Task area.
    pub area: Area,
    /// `"fill"`, `"image"`, `"mask"` or `"layer"`.
    pub kind: &'static str,
}

/// A draw unit running every available task inline during dispatch.
///
/// Its kernels are plain source-over loops; layer transforms are ignored.
#[derive(Debug, Default)]
pub struct ImmediateUnit {
    executed: Arc<Mutex<Vec<ExecutedTask>>>,
}

impl ImmediateUnit {
    /// The shared log of executed tasks.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<Vec<ExecutedTask>>> {
        self.executed.clone()
    }
}

impl DrawUnit for ImmediateUnit {
    fn name(&self) -> &'static str {
        "immediate"
    }

    fn dispatch(&mut self, queue: &mut TaskQueue<'_>) -> DispatchOutcome {
        let mut taken = 0;
        while let Some(job) = queue.next_available() {
            let kind = run(&job);
            self.executed
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(ExecutedTask {
                    layer: job.layer(),
                    area: job.area,
                    kind,
                });
            queue.complete(job);
            taken += 1;
        }
        if taken == 0 {
            DispatchOutcome::Idle
        } else {
            DispatchOutcome::Taken(taken)
        }
    }
}

/// Source-over of `src` onto `dst`.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "weighted averages of u8 values stay below 256"
)]
pub fn blend_over(dst: Color32, src: Color32) -> Color32 {
    let a = u32::from(src.a);
    match a {
        0 => dst,
        255 => src,
        _ => {
            let inv = 255 - a;
            let mix = |s: u8, d: u8| ((u32::from(s) * a + u32::from(d) * inv + 127) / 255) as u8;
            Color32 {
                r: mix(src.r, dst.r),
                g: mix(src.g, dst.g),
                b: mix(src.b, dst.b),
                a: (a + (u32::from(dst.a) * inv + 127) / 255) as u8,
            }
        }
    }
}

/// Whether `(x, y)` lies in `area` with corners rounded by `radius`.
#[must_use]
pub fn in_rounded_rect(area: &Area, radius: i32, x: i32, y: i32) -> bool {
    if !area.contains_point(x, y) {
        return false;
    }
    let r = radius.min(area.width() as i32 / 2).min(area.height() as i32 / 2);
    let cx = x.clamp(area.x1 + r, area.x2 - r);
    let cy = y.clamp(area.y1 + r, area.y2 - r);
    let (dx, dy) = (i64::from(x - cx), i64::from(y - cy));
    dx * dx + dy * dy <= i64::from(r) * i64::from(r)
}

fn run(job: &TaskJob) -> &'static str {
    let Some(bounds) = job.area.intersect(&job.clip) else {
        return "none";
    };
    let source = job.source.as_ref().map(lock);
    let mut target = lock(&job.target);
    let Some(bounds) = bounds.intersect(&target.area()) else {
        return "none";
    };
    let pixels = (bounds.y1..=bounds.y2).flat_map(|y| (bounds.x1..=bounds.x2).map(move |x| (x, y)));
    match &*job.descriptor {
        DrawDescriptor::Fill { color, opa } => {
            let src = color.with_opa(*opa);
            for (x, y) in pixels {
                if let Some(d) = target.get(x, y) {
                    target.set(x, y, blend_over(d, src));
                }
            }
            "fill"
        }
        DrawDescriptor::Image { pixels: img, size, opa } => {
            let w = size.0 as usize;
            for (x, y) in pixels {
                let i = (y - job.area.y1) as usize * w + (x - job.area.x1) as usize;
                if let (Some(d), Some(s)) = (target.get(x, y), img.get(i)) {
                    target.set(x, y, blend_over(d, s.with_opa(*opa)));
                }
            }
            "image"
        }
        DrawDescriptor::Mask { area, radius } => {
            for (x, y) in pixels {
                if !in_rounded_rect(area, *radius, x, y) {
                    target.set(x, y, Color32::TRANSPARENT);
                }
            }
            "mask"
        }
        DrawDescriptor::Layer(desc) => {
            if let Some(source) = &source {
                for (x, y) in pixels {
                    if let (Some(d), Some(s)) = (target.get(x, y), source.get(x, y)) {
                        target.set(x, y, blend_over(d, s.with_opa(desc.opa)));
                    }
                }
            }
            "layer"
        }
    }
}
