// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render buffers and row banding.
//!
//! A display renders into one or two [`FrameBuffers`]. Each buffer is
//! allocated once from a byte budget and re-mapped onto whatever area the
//! current band or frame covers.
//!
//! In partial mode a dirty area taller than the buffer is split into row
//! bands:
//!
//! ```text
//!   ┌──────────────┐ y1
//!   │   band 0     │  band_rows(...) rows
//!   ├──────────────┤
//!   │   band 1     │
//!   ├──────────────┤
//!   │   tail       │  whatever is left
//!   └──────────────┘ y2
//! ```

use std::sync::{Arc, Mutex};

use crate::area::Area;
use crate::color::ColorFormat;
use crate::error::DrawError;
use crate::invalidate::RoundFn;
use crate::pixbuf::{PixelBuf, SharedBuffer};

/// Which of the two buffers is meant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferRole {
    /// The first buffer; the only one when single-buffered.
    #[default]
    First,
    /// The second buffer of a double-buffered display.
    Second,
}

/// The render buffers of one display.
#[derive(Debug)]
pub struct FrameBuffers {
    first: SharedBuffer,
    second: Option<SharedBuffer>,
    active: BufferRole,
    size_bytes: usize,
    format: ColorFormat,
}

impl FrameBuffers {
    /// Allocates one render buffer of `size_bytes`.
    pub fn single(size_bytes: usize, format: ColorFormat) -> Result<Self, DrawError> {
        Ok(Self {
            first: allocate(size_bytes, format)?,
            second: None,
            active: BufferRole::First,
            size_bytes,
            format,
        })
    }

    /// Allocates two render buffers of `size_bytes` each.
    pub fn double(size_bytes: usize, format: ColorFormat) -> Result<Self, DrawError> {
        Ok(Self {
            first: allocate(size_bytes, format)?,
            second: Some(allocate(size_bytes, format)?),
            active: BufferRole::First,
            size_bytes,
            format,
        })
    }

    /// Whether a second buffer exists.
    #[inline]
    #[must_use]
    pub fn is_double(&self) -> bool {
        self.second.is_some()
    }

    /// Size of one buffer in bytes.
    #[inline]
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Pixel format the buffers were allocated for.
    #[inline]
    #[must_use]
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Which buffer is rendered into next.
    #[inline]
    #[must_use]
    pub fn active_role(&self) -> BufferRole {
        self.active
    }

    /// The buffer rendered into next.
    #[must_use]
    pub fn active(&self) -> &SharedBuffer {
        match (self.active, &self.second) {
            (BufferRole::Second, Some(second)) => second,
            _ => &self.first,
        }
    }

    /// The buffer not rendered into; `None` when single-buffered.
    #[must_use]
    pub fn inactive(&self) -> Option<&SharedBuffer> {
        let second = self.second.as_ref()?;
        Some(match self.active {
            BufferRole::First => second,
            BufferRole::Second => &self.first,
        })
    }

    /// Makes the other buffer active. No-op when single-buffered.
    pub fn swap(&mut self) {
        if self.second.is_some() {
            self.active = match self.active {
                BufferRole::First => BufferRole::Second,
                BufferRole::Second => BufferRole::First,
            };
        }
    }
}

fn allocate(size_bytes: usize, format: ColorFormat) -> Result<SharedBuffer, DrawError> {
    let capacity = (size_bytes / format.bytes_per_pixel() as usize).max(1);
    let buf = PixelBuf::try_with_capacity(Area::from_origin_size(0, 0, 1, 1), format, capacity)?;
    Ok(Arc::new(Mutex::new(buf)))
}

/// Largest band height for an area `width` by `height` in a buffer of
/// `buf_px` pixels, honouring the rounding hook.
///
/// When the rounded height does not fit, the band shrinks one row at a
/// time. Returns `0` if no height fits; the caller must treat that as a
/// misconfiguration.
#[must_use]
pub fn band_rows(buf_px: usize, width: u32, height: u32, rounder: Option<RoundFn>) -> u32 {
    let per_row = (width as usize).max(1);
    let max_row = u32::try_from(buf_px / per_row)
        .unwrap_or(u32::MAX)
        .min(height);
    let Some(round) = rounder else {
        return max_row;
    };
    for h in (1..=max_row).rev() {
        let rounded = round(Area::from_origin_size(0, 0, 1, h));
        if rounded.height() <= max_row {
            return rounded.y2.saturating_add(1).max(1).unsigned_abs();
        }
    }
    log::warn!(
        "no band height fits {buf_px} pixels after rounding (width {width}); \
         check the rounding hook or grow the buffer"
    );
    0
}

/// Splits `area` into consecutive bands of at most `rows` rows, top to
/// bottom.
///
/// # Panics
///
/// Panics if `rows` is zero.
pub fn row_bands(area: Area, rows: u32) -> impl Iterator<Item = Area> {
    assert!(rows > 0, "bands must have at least one row");
    let step = i32::try_from(rows).unwrap_or(i32::MAX);
    let mut next = Some(area.y1);
    core::iter::from_fn(move || {
        let y1 = next?;
        let y2 = y1.saturating_add(step - 1).min(area.y2);
        next = (y2 < area.y2).then_some(y2 + 1);
        area.rows(y1, y2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixbuf::lock;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn bands_cover_the_area_top_to_bottom() {
        let screen = area(0, 0, 319, 239);
        let rows = band_rows(320 * 64, 320, 240, None);
        assert_eq!(rows, 64);
        let bands: Vec<_> = row_bands(screen, rows).collect();
        assert_eq!(
            bands,
            [
                area(0, 0, 319, 63),
                area(0, 64, 319, 127),
                area(0, 128, 319, 191),
                area(0, 192, 319, 239),
            ]
        );
    }

    #[test]
    fn band_height_is_capped_by_the_area() {
        assert_eq!(band_rows(10_000, 10, 7, None), 7);
        let one: Vec<_> = row_bands(area(5, 5, 5, 5), 3).collect();
        assert_eq!(one, [area(5, 5, 5, 5)]);
    }

    fn round_to_8(a: Area) -> Area {
        Area {
            y1: a.y1 & !7,
            y2: a.y2 | 7,
            ..a
        }
    }

    fn always_too_tall(a: Area) -> Area {
        Area {
            y2: a.y1 + 1000,
            ..a
        }
    }

    #[test]
    fn rounding_shrinks_bands_to_a_multiple() {
        // 20 rows fit; rounding to 8 gives 16.
        assert_eq!(band_rows(100 * 20, 100, 240, Some(round_to_8 as RoundFn)), 16);
        // Fewer than 8 rows can never be satisfied.
        assert_eq!(band_rows(100 * 5, 100, 240, Some(round_to_8 as RoundFn)), 0);
        assert_eq!(band_rows(100 * 5, 100, 240, Some(always_too_tall as RoundFn)), 0);
    }

    #[test]
    fn double_buffers_alternate() {
        let mut bufs = FrameBuffers::double(4 * 100, ColorFormat::Xrgb8888).unwrap();
        let first = bufs.active().clone();
        assert!(bufs.is_double());
        bufs.swap();
        assert!(Arc::ptr_eq(bufs.inactive().unwrap(), &first));
        assert_eq!(bufs.active_role(), BufferRole::Second);
        assert_eq!(lock(bufs.active()).capacity(), 100);
    }

    #[test]
    fn single_buffer_does_not_swap() {
        let mut bufs = FrameBuffers::single(64, ColorFormat::Rgb565).unwrap();
        bufs.swap();
        assert_eq!(bufs.active_role(), BufferRole::First);
        assert!(bufs.inactive().is_none());
        assert_eq!(lock(bufs.active()).capacity(), 32);
    }
}
