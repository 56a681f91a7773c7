// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel rectangles with inclusive corners.
//!
//! An [`Area`] names the pixels `x1..=x2` by `y1..=y2`, so an area always
//! covers at least one pixel. Operations that may produce nothing (such as
//! [`Area::intersect`]) return an `Option` instead of a degenerate area.
//!
//! Conversions to and from [`kurbo::Rect`] treat the area as the half-open
//! box `[x1, x2 + 1) × [y1, y2 + 1)`.

use core::fmt;

use kurbo::Rect;

/// An inclusive pixel rectangle in display coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Area {
    /// Left column (inclusive).
    pub x1: i32,
    /// Top row (inclusive).
    pub y1: i32,
    /// Right column (inclusive).
    pub x2: i32,
    /// Bottom row (inclusive).
    pub y2: i32,
}

impl Area {
    /// Creates an area from its inclusive corners.
    ///
    /// Returns `None` if the corners are inverted.
    #[inline]
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x2 < x1 || y2 < y1 {
            None
        } else {
            Some(Self { x1, y1, x2, y2 })
        }
    }

    /// Creates an area with its top-left corner at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub const fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "area must cover at least one pixel");
        Self {
            x1: x,
            y1: y,
            x2: x + width as i32 - 1,
            y2: y + height as i32 - 1,
        }
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        (self.x2 - self.x1 + 1) as u32
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        (self.y2 - self.y1 + 1) as u32
    }

    /// Number of pixels.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns the overlapping part of two areas, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Self::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        )
    }

    /// Returns the bounding box of both areas.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Whether the two areas share at least one pixel.
    #[inline]
    #[must_use]
    pub const fn is_on(&self, other: &Self) -> bool {
        self.x1 <= other.x2 && self.x2 >= other.x1 && self.y1 <= other.y2 && self.y2 >= other.y1
    }

    /// Whether `self` lies completely inside `outer`.
    #[inline]
    #[must_use]
    pub const fn is_in(&self, outer: &Self) -> bool {
        self.x1 >= outer.x1 && self.y1 >= outer.y1 && self.x2 <= outer.x2 && self.y2 <= outer.y2
    }

    /// Whether the pixel `(x, y)` lies inside the area.
    #[inline]
    #[must_use]
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Grows the area by `dx` columns on both sides and `dy` rows on both
    /// sides. Negative values shrink it; `None` if nothing remains.
    #[must_use]
    pub fn increase(&self, dx: i32, dy: i32) -> Option<Self> {
        Self::new(self.x1 - dx, self.y1 - dy, self.x2 + dx, self.y2 + dy)
    }

    /// Moves the area by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Returns the rows `y1..=y2` of this area, keeping its columns.
    ///
    /// The rows are clamped to the area; `None` if they miss it.
    #[must_use]
    pub fn rows(&self, y1: i32, y2: i32) -> Option<Self> {
        Self::new(self.x1, y1.max(self.y1), self.x2, y2.min(self.y2))
    }

    /// The half-open kurbo rectangle covering the same pixels.
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x1),
            f64::from(self.y1),
            f64::from(self.x2) + 1.0,
            f64::from(self.y2) + 1.0,
        )
    }

    /// The smallest area covering every pixel touched by `rect`.
    ///
    /// Returns `None` for empty or non-finite rectangles.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "coordinates are clamped to the i32 range before the cast"
    )]
    pub fn cover_rect(rect: Rect) -> Option<Self> {
        let rect = rect.abs();
        if !rect.is_finite() || rect.area() <= 0.0 {
            return None;
        }
        // Values within SNAP of an integer count as that integer.
        const SNAP: f64 = 1e-6;
        let clamp = |v: f64| v.clamp(f64::from(i32::MIN / 2), f64::from(i32::MAX / 2));
        Self::new(
            clamp((rect.x0 + SNAP).floor()) as i32,
            clamp((rect.y0 + SNAP).floor()) as i32,
            clamp((rect.x1 - SNAP).ceil()) as i32 - 1,
            clamp((rect.y1 - SNAP).ceil()) as i32 - 1,
        )
    }
}

impl fmt::Debug for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Area({},{} -> {},{})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}
