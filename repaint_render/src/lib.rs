// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software draw units for [`repaint_core`].
//!
//! The core scheduler decides what is drawn where; this crate provides
//! units that actually touch pixels:
//!
//! - [`SoftwareUnit`]: runs tasks inline on the thread driving the
//!   refresh
//! - [`ThreadedUnit`]: hands tasks to a pool of worker threads, so that
//!   independent tasks of a layer are drawn in parallel
//! - [`kernel`]: the per-pixel fill, image, mask and layer-composite
//!   kernels both units share
//!
//! The kernels favour clarity over speed: they are the reference output a
//! hardware unit can be checked against.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod kernel;
mod software;
mod threaded;

#[cfg(test)]
mod tests;

pub use software::SoftwareUnit;
pub use threaded::ThreadedUnit;
