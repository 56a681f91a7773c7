// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel storage shared between the scheduler and draw units.
//!
//! A [`PixelBuf`] is a block of [`Color32`] pixels mapped onto an [`Area`]
//! of display coordinates. Render buffers keep their allocation and are
//! re-mapped onto each band; layer buffers are sized to their layer.
//!
//! Buffers are shared as [`SharedBuffer`]. When a task needs two buffers
//! (a layer composite), the source is locked before the target.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::area::Area;
use crate::color::{Color32, ColorFormat};
use crate::error::DrawError;

/// A pixel buffer behind a lock.
pub type SharedBuffer = Arc<Mutex<PixelBuf>>;

/// Locks a shared buffer, recovering the data if a draw unit panicked
/// while holding it.
pub fn lock(buf: &SharedBuffer) -> MutexGuard<'_, PixelBuf> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pixels covering an area.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuf {
    area: Area,
    format: ColorFormat,
    pixels: Vec<Color32>,
}

impl core::fmt::Debug for PixelBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelBuf")
            .field("area", &self.area)
            .field("format", &self.format)
            .field("capacity", &self.pixels.len())
            .finish()
    }
}

impl PixelBuf {
    /// Allocates a transparent buffer for `area`.
    ///
    /// Allocation failure is reported instead of aborting.
    pub fn try_new(area: Area, format: ColorFormat) -> Result<Self, DrawError> {
        Self::try_with_capacity(area, format, pixel_count(&area))
    }

    /// Allocates room for `capacity` pixels, initially mapped onto `area`.
    ///
    /// # Panics
    ///
    /// Panics if `area` has more pixels than `capacity`.
    pub fn try_with_capacity(
        area: Area,
        format: ColorFormat,
        capacity: usize,
    ) -> Result<Self, DrawError> {
        assert!(
            pixel_count(&area) <= capacity,
            "{area:?} does not fit in {capacity} pixels"
        );
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(capacity)
            .map_err(|_| DrawError::OutOfMemory {
                bytes: capacity * format.bytes_per_pixel() as usize,
            })?;
        pixels.resize(capacity, Color32::TRANSPARENT);
        Ok(Self {
            area,
            format,
            pixels,
        })
    }

    /// The area the pixels are mapped onto.
    #[inline]
    #[must_use]
    pub fn area(&self) -> Area {
        self.area
    }

    /// The declared color format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Pixels per row.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.area.width() as usize
    }

    /// Number of pixels the allocation can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pixels.len()
    }

    /// Maps the buffer onto a new area. Returns `false`, leaving the buffer
    /// unchanged, if the area does not fit.
    pub fn remap(&mut self, area: Area) -> bool {
        if pixel_count(&area) > self.pixels.len() {
            return false;
        }
        self.area = area;
        true
    }

    /// The pixels of the mapped area, row by row.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[Color32] {
        &self.pixels[..pixel_count(&self.area)]
    }

    /// Mutable pixels of the mapped area, row by row.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Color32] {
        let n = pixel_count(&self.area);
        &mut self.pixels[..n]
    }

    /// Index of the display pixel `(x, y)`, if it is mapped.
    #[inline]
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.area.contains_point(x, y) {
            return None;
        }
        let col = (x - self.area.x1) as usize;
        let row = (y - self.area.y1) as usize;
        Some(row * self.stride() + col)
    }

    /// Reads the display pixel `(x, y)`.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Color32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Writes the display pixel `(x, y)`; ignored when unmapped.
    pub fn set(&mut self, x: i32, y: i32, color: Color32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// The pixels of display row `y` within `x1..=x2`, clamped to the
    /// mapped area.
    pub fn span_mut(&mut self, y: i32, x1: i32, x2: i32) -> &mut [Color32] {
        let Some(cols) = Area::new(x1, y, x2, y).and_then(|a| a.intersect(&self.area)) else {
            return &mut [];
        };
        let (Some(start), Some(end)) = (self.index(cols.x1, y), self.index(cols.x2, y)) else {
            return &mut [];
        };
        &mut self.pixels[start..=end]
    }

    /// Sets every pixel of `area` that is mapped.
    pub fn fill(&mut self, area: &Area, color: Color32) {
        let Some(area) = area.intersect(&self.area) else {
            return;
        };
        for y in area.y1..=area.y2 {
            self.span_mut(y, area.x1, area.x2).fill(color);
        }
    }

    /// Sets every mapped pixel.
    pub fn clear(&mut self, color: Color32) {
        self.pixels_mut().fill(color);
    }

    /// Copies the pixels of `area` mapped in both buffers from `src`.
    pub fn copy_from(&mut self, src: &Self, area: &Area) {
        let Some(area) = area
            .intersect(&self.area)
            .and_then(|a| a.intersect(&src.area))
        else {
            return;
        };
        for y in area.y1..=area.y2 {
            let (Some(from), Some(to)) = (src.index(area.x1, y), self.index(area.x1, y)) else {
                continue;
            };
            let w = area.width() as usize;
            self.pixels[to..to + w].copy_from_slice(&src.pixels[from..from + w]);
        }
    }
}

fn pixel_count(area: &Area) -> usize {
    usize::try_from(area.size()).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn indices_are_relative_to_the_mapped_area() {
        let mut buf = PixelBuf::try_new(area(10, 20, 19, 29), ColorFormat::Argb8888).unwrap();
        assert_eq!(buf.index(10, 20), Some(0));
        assert_eq!(buf.index(19, 21), Some(19));
        assert_eq!(buf.index(9, 20), None);
        buf.set(12, 22, Color32::WHITE);
        assert_eq!(buf.get(12, 22), Some(Color32::WHITE));
        assert_eq!(buf.get(13, 22), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn remap_reuses_the_allocation() {
        let mut buf =
            PixelBuf::try_with_capacity(area(0, 0, 9, 0), ColorFormat::Xrgb8888, 100).unwrap();
        assert!(buf.remap(area(0, 40, 9, 49)));
        assert_eq!(buf.pixels().len(), 100);
        assert!(!buf.remap(area(0, 0, 10, 9)), "110 pixels do not fit");
        assert_eq!(buf.area(), area(0, 40, 9, 49));
    }

    #[test]
    fn fill_is_clipped_to_the_mapped_area() {
        let mut buf = PixelBuf::try_new(area(0, 0, 3, 3), ColorFormat::Xrgb8888).unwrap();
        buf.fill(&area(2, 2, 10, 10), Color32::BLACK);
        let painted = buf.pixels().iter().filter(|p| **p == Color32::BLACK).count();
        assert_eq!(painted, 4);
    }

    #[test]
    fn copy_from_moves_only_the_shared_area() {
        let mut src = PixelBuf::try_new(area(0, 0, 9, 9), ColorFormat::Xrgb8888).unwrap();
        src.clear(Color32::WHITE);
        let mut dst = PixelBuf::try_new(area(5, 5, 14, 14), ColorFormat::Xrgb8888).unwrap();
        dst.copy_from(&src, &area(0, 0, 6, 6));
        assert_eq!(dst.get(5, 5), Some(Color32::WHITE));
        assert_eq!(dst.get(6, 6), Some(Color32::WHITE));
        assert_eq!(dst.get(7, 7), Some(Color32::TRANSPARENT));
    }
}
