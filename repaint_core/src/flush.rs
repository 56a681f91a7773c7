// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handing rendered pixels to the panel.
//!
//! The display calls [`Panel::flush`] once per rendered band (or several
//! times per band with software rotation). The driver clears the
//! [`FlushHandle`] when the transfer is done, possibly from another thread
//! or an interrupt handler. Until then the display spins on
//! [`Panel::wait`] before touching the buffer again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::area::Area;
use crate::color::{Color32, ColorFormat};
use crate::config::Rotation;
use crate::pixbuf::PixelBuf;
use crate::rotate;

/// Shared "transfer in progress" flag.
#[derive(Clone, Debug, Default)]
pub struct FlushHandle(Arc<AtomicBool>);

impl FlushHandle {
    /// Creates an idle handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the last flush as finished.
    pub fn ready(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether a flush is still in progress.
    #[inline]
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn begin(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Pixels to push to the panel.
#[derive(Clone, Copy, Debug)]
pub struct FlushChunk<'a> {
    area: Area,
    pixels: &'a [Color32],
    stride: usize,
    format: ColorFormat,
    last: bool,
}

impl<'a> FlushChunk<'a> {
    /// Wraps pixels for `area`. `pixels` starts at the area's top-left
    /// corner; rows are `stride` pixels apart.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is too short for the area at that stride.
    #[must_use]
    pub fn new(
        area: Area,
        pixels: &'a [Color32],
        stride: usize,
        format: ColorFormat,
        last: bool,
    ) -> Self {
        let w = area.width() as usize;
        let h = area.height() as usize;
        assert!(stride >= w, "stride {stride} is narrower than {area:?}");
        assert!(
            pixels.len() >= (h - 1) * stride + w,
            "{} pixels do not cover {area:?} at stride {stride}",
            pixels.len()
        );
        Self {
            area,
            pixels,
            stride,
            format,
            last,
        }
    }

    /// Target area in panel coordinates, offset and rotation applied.
    #[inline]
    #[must_use]
    pub fn area(&self) -> Area {
        self.area
    }

    /// The raw pixels, starting at the area's top-left corner.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &'a [Color32] {
        self.pixels
    }

    /// Distance between rows in pixels.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The panel's color format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Set on the final chunk of a frame.
    #[inline]
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.last
    }

    /// The area's rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [Color32]> + 'a {
        let (pixels, stride) = (self.pixels, self.stride);
        let w = self.area.width() as usize;
        (0..self.area.height() as usize).map(move |r| &pixels[r * stride..r * stride + w])
    }
}

/// The physical display.
pub trait Panel {
    /// Starts pushing `chunk` to the display.
    ///
    /// Call [`FlushHandle::ready`] on `done` when the pixels have been
    /// consumed; until then the buffer is not written.
    fn flush(&mut self, chunk: &FlushChunk<'_>, done: &FlushHandle);

    /// Called repeatedly while a flush is in progress.
    fn wait(&mut self, done: &FlushHandle) {
        _ = done;
        std::thread::yield_now();
    }
}

/// Spins on [`Panel::wait`] until the handle is idle.
pub(crate) fn wait_idle(panel: &mut dyn Panel, done: &FlushHandle) {
    while done.is_flushing() {
        panel.wait(done);
    }
}

/// How rendered areas are turned into flush chunks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FlushTarget {
    pub(crate) screen: Area,
    pub(crate) format: ColorFormat,
    pub(crate) offset: (i32, i32),
    /// Rotation done in software; `Deg0` when the panel rotates itself.
    pub(crate) sw_rotation: Rotation,
    pub(crate) scratch_px: usize,
}

/// Pushes `area` of `buf` to the panel.
///
/// With software rotation the pixels are rotated first; 90 and 270 degree
/// rotation goes through `scratch` in chunks, waiting for each one.
pub(crate) fn flush_area(
    panel: &mut dyn Panel,
    done: &FlushHandle,
    buf: &mut PixelBuf,
    area: Area,
    target: &FlushTarget,
    scratch: &mut Vec<Color32>,
    last: bool,
) {
    let (dx, dy) = target.offset;
    match target.sw_rotation {
        Rotation::Deg0 => {
            let Some(start) = buf.index(area.x1, area.y1) else {
                log::error!("flushed {area:?} is outside the buffer at {:?}", buf.area());
                done.ready();
                return;
            };
            let stride = buf.stride();
            let chunk = FlushChunk::new(
                area.translate(dx, dy),
                &buf.pixels()[start..],
                stride,
                target.format,
                last,
            );
            panel.flush(&chunk, done);
        }
        Rotation::Deg180 => {
            debug_assert_eq!(buf.area(), area, "software rotation renders whole bands");
            rotate::reverse_in_place(buf.pixels_mut());
            let rotated = rotate::rotate_area(area, Rotation::Deg180, target.screen);
            let chunk = FlushChunk::new(
                rotated.translate(dx, dy),
                buf.pixels(),
                area.width() as usize,
                target.format,
                last,
            );
            panel.flush(&chunk, done);
        }
        rotation @ (Rotation::Deg90 | Rotation::Deg270) => {
            rotate::flush_transposed(panel, done, buf, area, target, rotation, scratch, last);
        }
    }
}
