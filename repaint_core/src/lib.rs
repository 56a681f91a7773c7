// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental redraw for embedded displays.
//!
//! `repaint_core` decides what to redraw, in what order, into which buffer,
//! and when pixels are handed to the panel. It does not rasterize: drawing
//! is done by [`DrawUnit`](draw::DrawUnit)s plugged into the pipeline, and
//! the widget tree lives behind the [`ObjectTree`](tree::ObjectTree) trait.
//!
//! # Architecture
//!
//! ```text
//!   invalidate(area) ──► InvalidationTracker
//!                              │ join
//!                              ▼
//!   Display::poll(now) ──► dirty areas ──► row bands
//!                                              │
//!                      occlusion culling ◄─────┘
//!                              │ top object
//!                              ▼
//!                      z-order compositing ──► DrawPipeline ──► DrawUnits
//!                              │                   (layers, tasks)
//!                              ▼
//!                       render buffer ──► Panel::flush
//! ```
//!
//! **[`invalidate`]**: Bounded dirty-area store with merging.
//!
//! **[`display`]**: The refresh driver: layout, join, banding, occlusion,
//! compositing and flushing of one display.
//!
//! **[`draw`]**: Layer arena, per-layer task lists and the dispatcher
//! that hands independent tasks to draw units.
//!
//! **[`buffer`]** and **[`flush`]**: Render buffers, row banding, software
//! rotation and the hand-off to the panel.
//!
//! **[`tree`]**: The queries the scheduler makes against the object tree.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types
//! for refresh instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `test-helpers` (disabled by default): Exposes [`testing`], a mock
//!   object tree, a recording panel and an inline draw unit.

pub mod area;
pub mod buffer;
pub mod color;
pub mod config;
pub mod display;
pub mod draw;
pub mod error;
pub mod flush;
pub mod invalidate;
pub mod pixbuf;
pub mod time;
pub mod trace;
pub mod tree;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

mod compose;
mod isolate;
mod occlusion;
mod rotate;

pub use area::Area;
pub use display::{Display, FrameReport};
pub use error::{ConfigError, DrawError, InvalidateError};
