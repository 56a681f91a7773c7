// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-area tracking.
//!
//! [`InvalidationTracker`] records the screen regions that must be redrawn
//! and merges them before a frame renders:
//!
//! ```text
//!   invalidate(area) ──► clip to screen ──► round ──► contained? ──► store
//!                                                                    │
//!                             full? reset to [screen] ◄──────────────┘
//!
//!   join() ──► pairwise merge where the union is cheaper than both parts
//! ```
//!
//! The store is bounded: when it fills up, everything collapses into a
//! single whole-screen area.

use crate::area::Area;
use crate::config::RenderMode;
use crate::error::InvalidateError;

/// Hardware rounding hook applied to invalidated areas and band heights.
///
/// Panels that can only be written in aligned blocks grow the area to the
/// alignment they need. The result must contain the input.
pub type RoundFn = fn(Area) -> Area;

/// A stored dirty rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyArea {
    /// The rectangle, clipped to the screen.
    pub area: Area,
    /// Set when the area was absorbed into another one by [`join`].
    ///
    /// [`join`]: InvalidationTracker::join
    pub joined: bool,
}

/// Per-display store of dirty areas.
#[derive(Clone, Debug)]
pub struct InvalidationTracker {
    areas: Vec<DirtyArea>,
    capacity: usize,
    screen: Area,
    mode: RenderMode,
    rounder: Option<RoundFn>,
    in_progress: bool,
    enabled: bool,
    resume_requested: bool,
}

impl InvalidationTracker {
    /// Creates an empty tracker for a screen of the given size.
    #[must_use]
    pub fn new(screen: Area, mode: RenderMode, capacity: usize) -> Self {
        Self {
            areas: Vec::with_capacity(capacity),
            capacity,
            screen,
            mode,
            rounder: None,
            in_progress: false,
            enabled: true,
            resume_requested: false,
        }
    }

    /// Installs the hardware rounding hook.
    pub fn set_rounder(&mut self, rounder: Option<RoundFn>) {
        self.rounder = rounder;
    }

    /// The hardware rounding hook, if any.
    #[inline]
    #[must_use]
    pub fn rounder(&self) -> Option<RoundFn> {
        self.rounder
    }

    /// Records a dirty area, or clears all areas when given `None`.
    ///
    /// Areas are clipped to the screen; an area entirely off screen is
    /// ignored. An area inside an already stored one is dropped.
    pub fn invalidate(&mut self, area: Option<Area>) -> Result<(), InvalidateError> {
        if !self.enabled {
            return Err(InvalidateError::Disabled);
        }
        if self.in_progress {
            log::error!("invalidation of {area:?} rejected: render pass in progress");
            return Err(InvalidateError::RenderInProgress);
        }
        let Some(area) = area else {
            self.areas.clear();
            return Ok(());
        };
        let Some(clipped) = area.intersect(&self.screen) else {
            return Ok(());
        };

        if self.mode == RenderMode::Full {
            self.areas.clear();
            self.areas.push(DirtyArea {
                area: self.screen,
                joined: false,
            });
            self.resume_requested = true;
            return Ok(());
        }

        let rounded = match self.rounder {
            Some(round) => round(clipped),
            None => clipped,
        };

        if self.areas.iter().any(|d| rounded.is_in(&d.area)) {
            return Ok(());
        }

        let stored = if self.areas.len() >= self.capacity {
            log::debug!(
                "dirty area store full ({} areas), falling back to whole screen",
                self.capacity
            );
            self.areas.clear();
            self.screen
        } else {
            rounded
        };
        self.areas.push(DirtyArea {
            area: stored,
            joined: false,
        });
        self.resume_requested = true;
        Ok(())
    }

    /// Merges overlapping areas where the union is smaller than the sum of
    /// the two parts. Absorbed areas are marked `joined`.
    pub fn join(&mut self) {
        for into in 0..self.areas.len() {
            if self.areas[into].joined {
                continue;
            }
            for from in 0..self.areas.len() {
                if from == into || self.areas[from].joined {
                    continue;
                }
                let a = self.areas[into].area;
                let b = self.areas[from].area;
                if !a.is_on(&b) {
                    continue;
                }
                let union = a.join(&b);
                if union.size() < a.size() + b.size() {
                    self.areas[into].area = union;
                    self.areas[from].joined = true;
                }
            }
        }
    }

    /// Drops every stored area.
    pub fn clear(&mut self) {
        self.areas.clear();
    }

    /// All stored areas, joined ones included.
    #[inline]
    #[must_use]
    pub fn areas(&self) -> &[DirtyArea] {
        &self.areas
    }

    /// Iterates the areas that will be rendered.
    pub fn unjoined(&self) -> impl Iterator<Item = Area> + '_ {
        self.areas.iter().filter(|d| !d.joined).map(|d| d.area)
    }

    /// Whether anything is waiting to be redrawn.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.areas.is_empty()
    }

    /// The screen area.
    #[inline]
    #[must_use]
    pub fn screen(&self) -> Area {
        self.screen
    }

    /// Whether a render pass is running.
    #[inline]
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub(crate) fn set_in_progress(&mut self, in_progress: bool) {
        self.in_progress = in_progress;
    }

    /// Enables or disables invalidation.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether invalidation is enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns and clears the "refresh timer should resume" flag set by
    /// accepted invalidations.
    pub(crate) fn take_resume_request(&mut self) -> bool {
        core::mem::take(&mut self.resume_requested)
    }
}
