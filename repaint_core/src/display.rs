// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-display refresh driver.
//!
//! A [`Display`] owns everything one panel needs between frames: its
//! configuration, the dirty-area tracker, the render buffers, the draw
//! pipeline with its root layer and the refresh timer. It borrows the
//! object tree and the panel only for the duration of a refresh, so the
//! same tree can feed several displays.
//!
//! ```text
//!   poll(now) ──► timer due? ──► refresh
//!
//!   refresh:
//!     layout every screen root
//!     join dirty areas
//!     for each area (last flagged):
//!         for each band of the area:
//!             wait for the panel (single buffer)
//!             occlusion search ──► draw from the top object
//!             finish the root layer
//!             wait for the panel (double buffer)
//!             flush ──► swap buffers
//!     sync buffers (direct mode, double buffer)
//! ```

use std::sync::Arc;

use crate::area::Area;
use crate::buffer::{FrameBuffers, band_rows, row_bands};
use crate::color::Color32;
use crate::compose::{ComposeParams, Composer};
use crate::config::{DisplayConfig, RenderMode, Rotation};
use crate::draw::{DrawPipeline, DrawUnit, LayerId};
use crate::error::{ConfigError, InvalidateError};
use crate::flush::{FlushHandle, FlushTarget, Panel, flush_area, wait_idle};
use crate::invalidate::{InvalidationTracker, RoundFn};
use crate::occlusion::top_object;
use crate::pixbuf::lock;
use crate::time::{HostTime, RefreshTimer};
use crate::trace::{
    AreaEvent, BandEvent, FlushEvent, FrameSummary, FrameSummaryBuilder, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RefreshStartEvent, SkipReason, Tracer,
};
use crate::tree::{ObjectTree, Screens};

/// What one refresh did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Refresh counter of the display.
    pub frame_index: u64,
    /// The merged dirty areas that were rendered, in order.
    pub areas: Vec<Area>,
    /// Bands drawn.
    pub bands: u32,
    /// Bands handed to the panel.
    pub flushes: u32,
    /// Set when the refresh drew nothing.
    pub skipped: Option<SkipReason>,
}

impl FrameReport {
    fn new(summary: &FrameSummary, areas: Vec<Area>) -> Self {
        Self {
            frame_index: summary.frame_index,
            areas,
            bands: summary.bands,
            flushes: summary.flushes,
            skipped: summary.skipped,
        }
    }
}

/// One display and its refresh state.
pub struct Display<O> {
    config: DisplayConfig,
    tracker: InvalidationTracker,
    buffers: FrameBuffers,
    pipeline: Arc<DrawPipeline>,
    root: LayerId,
    timer: RefreshTimer,
    flushing: FlushHandle,
    scratch: Vec<Color32>,
    screens: Screens<O>,
    frame_index: u64,
}

impl<O: core::fmt::Debug> core::fmt::Debug for Display<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Display")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .field("buffers", &self.buffers)
            .field("root", &self.root)
            .field("timer", &self.timer)
            .field("flushing", &self.flushing.is_flushing())
            .field("screens", &self.screens)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<O: Copy + Eq + core::fmt::Debug> Display<O> {
    /// Builds a display rendering into `buffers` with the given draw units.
    ///
    /// The configuration is validated against the buffers, which must be
    /// allocated for the configured color format. At least one draw unit
    /// is required.
    pub fn new(
        config: DisplayConfig,
        buffers: FrameBuffers,
        units: Vec<Box<dyn DrawUnit>>,
    ) -> Result<Self, ConfigError> {
        config.validate(buffers.size_bytes())?;
        if buffers.format() != config.color_format {
            return Err(ConfigError::BufferFormatMismatch {
                config: config.color_format,
                buffers: buffers.format(),
            });
        }
        if units.is_empty() {
            return Err(ConfigError::NoDrawUnits);
        }
        let screen = config.screen();
        let pipeline = DrawPipeline::new(screen, units);
        let root = pipeline.create_root(buffers.active().clone(), screen, config.color_format);
        log::debug!(
            "display {}x{} in {:?} mode, {} buffer(s) of {} bytes",
            config.hor_res,
            config.ver_res,
            config.render_mode,
            if buffers.is_double() { 2 } else { 1 },
            buffers.size_bytes()
        );
        Ok(Self {
            tracker: InvalidationTracker::new(screen, config.render_mode, config.dirty_capacity),
            timer: RefreshTimer::new(config.refresh_period_ms),
            config,
            buffers,
            pipeline,
            root,
            flushing: FlushHandle::new(),
            scratch: Vec::new(),
            screens: Screens::default(),
            frame_index: 0,
        })
    }

    /// The configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// The dirty-area tracker.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    /// Mutable access to the dirty-area tracker.
    #[inline]
    pub fn tracker_mut(&mut self) -> &mut InvalidationTracker {
        &mut self.tracker
    }

    /// Marks `area` dirty, or drops every dirty area when given `None`.
    ///
    /// An accepted invalidation resumes the refresh timer.
    pub fn invalidate(&mut self, area: Option<Area>) -> Result<(), InvalidateError> {
        self.tracker.invalidate(area)?;
        if self.tracker.take_resume_request() {
            self.timer.resume();
        }
        Ok(())
    }

    /// Installs the panel's rounding hook.
    pub fn set_rounder(&mut self, rounder: Option<RoundFn>) {
        self.tracker.set_rounder(rounder);
    }

    /// Enables or disables invalidation.
    pub fn set_invalidation_enabled(&mut self, enabled: bool) {
        self.tracker.set_enabled(enabled);
    }

    /// The screens drawn by this display.
    #[inline]
    #[must_use]
    pub fn screens(&self) -> &Screens<O> {
        &self.screens
    }

    /// Mutable access to the screens. Invalidate what changed afterwards.
    #[inline]
    pub fn screens_mut(&mut self) -> &mut Screens<O> {
        &mut self.screens
    }

    /// The flag the panel driver clears when a flush completes.
    #[must_use]
    pub fn flush_handle(&self) -> FlushHandle {
        self.flushing.clone()
    }

    /// The draw pipeline.
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &Arc<DrawPipeline> {
        &self.pipeline
    }

    /// The refresh timer.
    #[inline]
    #[must_use]
    pub fn timer(&self) -> &RefreshTimer {
        &self.timer
    }

    /// The render buffers.
    #[inline]
    #[must_use]
    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Refreshes if the timer is due at `now`.
    pub fn poll<T: ObjectTree<Obj = O> + ?Sized>(
        &mut self,
        now: HostTime,
        tree: &mut T,
        panel: &mut dyn Panel,
        tracer: &mut Tracer<'_>,
    ) -> Option<FrameReport> {
        if self.tracker.take_resume_request() {
            self.timer.resume();
        }
        if !self.timer.is_due(now) {
            return None;
        }
        Some(self.refresh_now(now, tree, panel, tracer))
    }

    /// Refreshes regardless of the timer.
    pub fn refresh_now<T: ObjectTree<Obj = O> + ?Sized>(
        &mut self,
        now: HostTime,
        tree: &mut T,
        panel: &mut dyn Panel,
        tracer: &mut Tracer<'_>,
    ) -> FrameReport {
        self.timer.mark_run(now);
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let mut summary = FrameSummaryBuilder::new(frame_index, now);
        tracer.refresh_start(&RefreshStartEvent {
            frame_index,
            now,
            dirty_areas: self.tracker.areas().len(),
        });

        let areas = self.refresh(frame_index, tree, panel, tracer, &mut summary);

        let summary = summary.finish();
        tracer.frame_summary(&summary);
        FrameReport::new(&summary, areas)
    }

    fn refresh<T: ObjectTree<Obj = O> + ?Sized>(
        &mut self,
        frame_index: u64,
        tree: &mut T,
        panel: &mut dyn Panel,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) -> Vec<Area> {
        let Some(active) = self.screens.active else {
            log::warn!(
                "no active screen, dropping {} dirty areas",
                self.tracker.areas().len()
            );
            self.tracker.clear();
            summary.skip(SkipReason::NoActiveScreen);
            return Vec::new();
        };

        phase_begin(tracer, frame_index, PhaseKind::Layout);
        for root in self.screens.layout_roots() {
            tree.update_layout(root, &mut self.tracker);
        }
        // Areas invalidated by layout are drawn now.
        _ = self.tracker.take_resume_request();
        phase_end(tracer, frame_index, PhaseKind::Layout);

        phase_begin(tracer, frame_index, PhaseKind::Join);
        self.tracker.join();
        let areas: Vec<Area> = self.tracker.unjoined().collect();
        phase_end(tracer, frame_index, PhaseKind::Join);

        if areas.is_empty() {
            summary.skip(SkipReason::NothingDirty);
            return areas;
        }

        phase_begin(tracer, frame_index, PhaseKind::Render);
        self.tracker.set_in_progress(true);
        for (i, &area) in areas.iter().enumerate() {
            let last = i + 1 == areas.len();
            tracer.area(&AreaEvent {
                frame_index,
                area,
                last,
            });
            summary.area();
            self.render_area(frame_index, tree, panel, tracer, summary, active, area, last);
        }
        self.tracker.set_in_progress(false);
        phase_end(tracer, frame_index, PhaseKind::Render);

        if self.config.render_mode == RenderMode::Direct && self.buffers.is_double() {
            phase_begin(tracer, frame_index, PhaseKind::Sync);
            self.sync_buffers(panel, &areas);
            phase_end(tracer, frame_index, PhaseKind::Sync);
        }

        self.tracker.clear();
        if self.tracker.take_resume_request() {
            self.timer.resume();
        }
        areas
    }

    fn render_area<T: ObjectTree<Obj = O> + ?Sized>(
        &mut self,
        frame_index: u64,
        tree: &mut T,
        panel: &mut dyn Panel,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
        active: O,
        area: Area,
        last: bool,
    ) {
        let screen = self.config.screen();
        match self.config.render_mode {
            RenderMode::Full => {
                let band = Band {
                    buf_area: screen,
                    clip: screen,
                    last,
                };
                self.render_band(frame_index, tree, panel, tracer, summary, active, band);
            }
            RenderMode::Direct => {
                let band = Band {
                    buf_area: screen,
                    clip: area,
                    last,
                };
                self.render_band(frame_index, tree, panel, tracer, summary, active, band);
            }
            RenderMode::Partial => {
                let Some(area) = area.rows(area.y1, area.y2.min(screen.y2)) else {
                    return;
                };
                let buf_px = self.buffers.size_bytes() / self.config.render_px_bytes();
                let rows = band_rows(buf_px, area.width(), area.height(), self.tracker.rounder());
                if rows == 0 {
                    log::error!("{area:?} not rendered: no band height fits the render buffer");
                    return;
                }
                for rows in row_bands(area, rows) {
                    let band = Band {
                        buf_area: rows,
                        clip: rows,
                        last: last && rows.y2 == area.y2,
                    };
                    self.render_band(frame_index, tree, panel, tracer, summary, active, band);
                }
            }
        }
    }

    fn render_band<T: ObjectTree<Obj = O> + ?Sized>(
        &mut self,
        frame_index: u64,
        tree: &mut T,
        panel: &mut dyn Panel,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
        active: O,
        band: Band,
    ) {
        let double = self.buffers.is_double();
        if !double {
            wait_idle(panel, &self.flushing);
        }

        let target = self.buffers.active().clone();
        {
            let mut buf = lock(&target);
            if !buf.remap(band.buf_area) {
                log::error!("{:?} does not fit the render buffer", band.buf_area);
                return;
            }
            if self.config.color_format.has_alpha() {
                buf.fill(&band.clip, Color32::TRANSPARENT);
            }
        }
        if let Err(err) = self
            .pipeline
            .set_target(self.root, target.clone(), band.buf_area)
        {
            log::error!("root layer lost: {err}");
            return;
        }
        tracer.band(&BandEvent {
            frame_index,
            band: band.buf_area,
            clip: band.clip,
        });
        summary.band();

        let mut composer = Composer {
            tree,
            pipeline: &self.pipeline,
            tracker: &mut self.tracker,
            params: ComposeParams::from_config(&self.config),
        };
        draw_screens(
            &mut composer,
            self.root,
            band.clip,
            &self.screens,
            active,
            self.config.draw_prev_over_act,
        );
        self.pipeline.finish(self.root);

        if double {
            wait_idle(panel, &self.flushing);
        }
        let flush_target = self.flush_target();
        self.flushing.begin();
        {
            let mut buf = lock(&target);
            flush_area(
                panel,
                &self.flushing,
                &mut buf,
                band.clip,
                &flush_target,
                &mut self.scratch,
                band.last,
            );
        }
        tracer.flush(&FlushEvent {
            frame_index,
            area: band.clip,
            last: band.last,
        });
        summary.flush();

        if double && (self.config.render_mode != RenderMode::Direct || band.last) {
            self.buffers.swap();
        }
    }

    /// Copies the areas of the frame just flushed into the buffer rendered
    /// next.
    fn sync_buffers(&mut self, panel: &mut dyn Panel, areas: &[Area]) {
        let Some(flushed) = self.buffers.inactive() else {
            return;
        };
        wait_idle(panel, &self.flushing);
        let src = lock(flushed);
        let mut dst = lock(self.buffers.active());
        if !dst.remap(self.config.screen()) {
            log::error!("render buffer cannot hold the screen");
            return;
        }
        for area in areas {
            dst.copy_from(&src, area);
        }
    }

    fn flush_target(&self) -> FlushTarget {
        FlushTarget {
            screen: self.config.screen(),
            format: self.config.color_format,
            offset: self.config.offset,
            sw_rotation: if self.config.sw_rotate {
                self.config.rotation
            } else {
                Rotation::Deg0
            },
            scratch_px: self.config.rotation_scratch_bytes / self.config.render_px_bytes(),
        }
    }
}

/// A region rendered and flushed in one go.
#[derive(Clone, Copy, Debug)]
struct Band {
    /// Area the render buffer is mapped onto.
    buf_area: Area,
    /// Part of it that is redrawn and flushed.
    clip: Area,
    last: bool,
}

/// Draws every screen of the display over `clip`, starting each one at the
/// topmost object that covers the clip.
fn draw_screens<T: ObjectTree + ?Sized>(
    composer: &mut Composer<'_, T>,
    layer: LayerId,
    clip: Area,
    screens: &Screens<T::Obj>,
    active: T::Obj,
    prev_over_act: bool,
) {
    let top_act = top_object(&*composer.tree, &clip, active);
    let top_prev = screens
        .previous
        .and_then(|prev| top_object(&*composer.tree, &clip, prev));

    if top_act.is_none()
        && top_prev.is_none()
        && let Some(bottom) = screens.bottom
    {
        composer.draw_from(layer, clip, bottom);
    }

    let act = Some(top_act.unwrap_or(active));
    let prev = screens.previous.map(|prev| top_prev.unwrap_or(prev));
    let order = if prev_over_act {
        [act, prev]
    } else {
        [prev, act]
    };
    let overlays = [screens.top, screens.sys];
    for start in order.into_iter().chain(overlays).flatten() {
        composer.draw_from(layer, clip, start);
    }
}

fn phase_begin(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
}

fn phase_end(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_end(&PhaseEndEvent { frame_index, phase });
}
