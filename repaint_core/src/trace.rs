// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the refresh loop.
//!
//! A [`TraceSink`] receives one call per event of a refresh. All methods
//! default to no-ops, so a sink implements only what it cares about.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. Without the `trace`
//! feature every `Tracer` method compiles to nothing; with it each method
//! is a single `Option` branch before dispatching.
//!
//! Events carry no timestamps beyond the host time of the refresh: sinks
//! that want durations stamp events themselves.
//!
//! ```text
//!   refresh_start
//!   phase Layout ... phase Join
//!   phase Render
//!     area ─┬─ band ── flush
//!           └─ band ── flush (last)
//!   phase Render end
//!   frame_summary
//! ```

use crate::area::Area;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a refresh is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Layout of every screen root.
    Layout,
    /// Merging of dirty areas.
    Join,
    /// Drawing and flushing of the dirty areas.
    Render,
    /// Bringing the render buffers back in sync after a frame.
    Sync,
}

impl PhaseKind {
    /// A short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Join => "join",
            Self::Render => "render",
            Self::Sync => "sync",
        }
    }
}

/// Why a refresh drew nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The display has no active screen.
    NoActiveScreen,
    /// No area was dirty after layout.
    NothingDirty,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a refresh starts.
#[derive(Clone, Copy, Debug)]
pub struct RefreshStartEvent {
    /// Refresh counter of the display.
    pub frame_index: u64,
    /// Host time the refresh was started at.
    pub now: HostTime,
    /// Stored dirty areas before layout.
    pub dirty_areas: usize,
}

/// Marks the beginning of a refresh phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Refresh counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a refresh phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Refresh counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted before a dirty area is rendered.
#[derive(Clone, Copy, Debug)]
pub struct AreaEvent {
    /// Refresh counter.
    pub frame_index: u64,
    /// The merged dirty area.
    pub area: Area,
    /// Whether this is the last area of the frame.
    pub last: bool,
}

/// Emitted before a band is drawn.
#[derive(Clone, Copy, Debug)]
pub struct BandEvent {
    /// Refresh counter.
    pub frame_index: u64,
    /// The area the render buffer is mapped onto.
    pub band: Area,
    /// The part of it that is redrawn.
    pub clip: Area,
}

/// Emitted when a band is handed to the panel.
#[derive(Clone, Copy, Debug)]
pub struct FlushEvent {
    /// Refresh counter.
    pub frame_index: u64,
    /// Flushed area before rotation and offset.
    pub area: Area,
    /// End-of-frame flag.
    pub last: bool,
}

/// Per-refresh counts produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Refresh counter.
    pub frame_index: u64,
    /// Host time the refresh was started at.
    pub now: HostTime,
    /// Dirty areas rendered.
    pub areas: u32,
    /// Bands drawn.
    pub bands: u32,
    /// Bands handed to the panel.
    pub flushes: u32,
    /// Set when the refresh drew nothing.
    pub skipped: Option<SkipReason>,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the refresh loop.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a refresh starts.
    fn on_refresh_start(&mut self, e: &RefreshStartEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called before a dirty area is rendered.
    fn on_area(&mut self, e: &AreaEvent) {
        _ = e;
    }

    /// Called before a band is drawn.
    fn on_band(&mut self, e: &BandEvent) {
        _ = e;
    }

    /// Called when a band is flushed.
    fn on_flush(&mut self, e: &FlushEvent) {
        _ = e;
    }

    /// Called with the summary at the end of every refresh.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`RefreshStartEvent`].
    #[inline]
    pub fn refresh_start(&mut self, e: &RefreshStartEvent) {
        emit!(self, on_refresh_start, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        emit!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        emit!(self, on_phase_end, e);
    }

    /// Emits an [`AreaEvent`].
    #[inline]
    pub fn area(&mut self, e: &AreaEvent) {
        emit!(self, on_area, e);
    }

    /// Emits a [`BandEvent`].
    #[inline]
    pub fn band(&mut self, e: &BandEvent) {
        emit!(self, on_band, e);
    }

    /// Emits a [`FlushEvent`].
    #[inline]
    pub fn flush(&mut self, e: &FlushEvent) {
        emit!(self, on_flush, e);
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        emit!(self, on_frame_summary, s);
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Counts what a refresh did and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    summary: FrameSummary,
}

impl FrameSummaryBuilder {
    /// Starts a summary for the refresh `frame_index` started at `now`.
    #[must_use]
    pub fn new(frame_index: u64, now: HostTime) -> Self {
        Self {
            summary: FrameSummary {
                frame_index,
                now,
                areas: 0,
                bands: 0,
                flushes: 0,
                skipped: None,
            },
        }
    }

    /// Counts a rendered area.
    pub fn area(&mut self) {
        self.summary.areas += 1;
    }

    /// Counts a drawn band.
    pub fn band(&mut self) {
        self.summary.bands += 1;
    }

    /// Counts a flushed band.
    pub fn flush(&mut self) {
        self.summary.flushes += 1;
    }

    /// Marks the refresh as skipped.
    pub fn skip(&mut self, reason: SkipReason) {
        self.summary.skipped = Some(reason);
    }

    /// The summary so far.
    #[must_use]
    pub fn finish(&self) -> FrameSummary {
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
