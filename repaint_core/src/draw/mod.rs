// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen layers, draw tasks and their dispatch to draw units.
//!
//! - [`DrawPipeline`] owns the layers of one display and hands tasks to
//!   [`DrawUnit`]s.
//! - [`DrawCtx`] is what object draw hooks see: a layer and a fixed clip.
//! - [`TaskJob`] is a task taken by a unit, carrying the buffers it needs.

mod ctx;
mod id;
mod layer;
mod pipeline;
mod signal;
mod task;

pub use ctx::DrawCtx;
pub use id::{LayerId, TaskId};
pub use pipeline::{DispatchOutcome, DrawPipeline, DrawUnit, PipelineStats, TaskJob, TaskQueue};
pub use task::{DrawDescriptor, LayerDescriptor, TaskState};
