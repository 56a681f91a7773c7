// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! None of these are fatal to the runtime: they either describe a
//! misconfiguration the integrator must fix, or a condition that heals on
//! the next frame.

use thiserror::Error;

use crate::color::ColorFormat;
use crate::config::RenderMode;
use crate::draw::LayerId;

/// A display configuration that cannot be refreshed.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Horizontal or vertical resolution is zero.
    #[error("display resolution must be non-zero, got {hor_res}x{ver_res}")]
    ZeroResolution {
        /// Configured width.
        hor_res: u32,
        /// Configured height.
        ver_res: u32,
    },
    /// The render buffer has no room for a single row.
    #[error("render buffer of {bytes} bytes cannot hold one row of {row_bytes} bytes")]
    BufferTooSmallForRow {
        /// Buffer size.
        bytes: usize,
        /// Bytes needed by one display row.
        row_bytes: usize,
    },
    /// Full and direct modes need a buffer the size of the screen.
    #[error("{mode:?} mode needs a {needed} byte buffer, got {bytes}")]
    BufferSmallerThanScreen {
        /// Configured render mode.
        mode: RenderMode,
        /// Buffer size.
        bytes: usize,
        /// Bytes needed for the whole screen.
        needed: usize,
    },
    /// Software rotation works band by band and needs partial mode.
    #[error("software rotation requires partial render mode, got {0:?}")]
    SoftwareRotationNeedsPartial(RenderMode),
    /// The dirty-area store cannot hold anything.
    #[error("dirty area capacity must be at least 1")]
    ZeroDirtyCapacity,
    /// The rotation scratch buffer has no room for one display row.
    #[error("rotation scratch of {bytes} bytes cannot hold one row of {row_bytes} bytes")]
    RotationScratchTooSmall {
        /// Scratch budget.
        bytes: usize,
        /// Bytes needed by one display row.
        row_bytes: usize,
    },
    /// The render buffers were allocated for another color format.
    #[error("render buffers hold {buffers:?} pixels, the display renders {config:?}")]
    BufferFormatMismatch {
        /// Configured render format.
        config: ColorFormat,
        /// Format the buffers were allocated for.
        buffers: ColorFormat,
    },
    /// A display needs at least one draw unit to execute its tasks.
    #[error("no draw units")]
    NoDrawUnits,
}

/// An invalidation that was not recorded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvalidateError {
    /// The display is being rendered; invalidate again after the frame.
    #[error("cannot invalidate while a render pass is in progress")]
    RenderInProgress,
    /// Invalidation was switched off for this display.
    #[error("invalidation is disabled")]
    Disabled,
}

/// A draw operation that was dropped.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    /// A layer buffer could not be allocated.
    #[error("out of memory allocating a {bytes} byte layer buffer")]
    OutOfMemory {
        /// Requested size.
        bytes: usize,
    },
    /// The layer handle no longer refers to a live layer.
    #[error("stale layer handle {0:?}")]
    StaleLayer(LayerId),
}
