// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Millisecond host time and the display refresh timer.
//!
//! [`HostTime`] is a monotonic millisecond counter supplied by the platform
//! tick source (a `SysTick` handler, an RTOS tick hook, `Instant` on a
//! desktop simulator). The core never reads a clock on its own.
//!
//! [`RefreshTimer`] decides when a display is due for a refresh. It is
//! paused while nothing is dirty and resumed by any accepted invalidation.

use core::fmt;
use core::ops::Add;

/// A point in time in milliseconds since an arbitrary epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, or zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ms)", self.0)
    }
}

/// Periodic refresh trigger for one display.
#[derive(Clone, Copy, Debug)]
pub struct RefreshTimer {
    period_ms: u32,
    last_run: Option<HostTime>,
    paused: bool,
}

impl RefreshTimer {
    /// Creates a running timer that is due immediately.
    #[must_use]
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_run: None,
            paused: false,
        }
    }

    /// The period in milliseconds.
    #[inline]
    #[must_use]
    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Whether the timer is paused.
    #[inline]
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a refresh should run at `now`.
    #[must_use]
    pub fn is_due(&self, now: HostTime) -> bool {
        if self.paused {
            return false;
        }
        match self.last_run {
            None => true,
            Some(last) => now.saturating_millis_since(last) >= u64::from(self.period_ms),
        }
    }

    /// Records that a refresh started at `now` and pauses the timer.
    pub fn mark_run(&mut self, now: HostTime) {
        self.last_run = Some(now);
        self.paused = true;
    }

    /// Lets the timer fire again.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Milliseconds until the timer is due, or `None` while paused.
    #[must_use]
    pub fn time_until_due(&self, now: HostTime) -> Option<u64> {
        if self.paused {
            return None;
        }
        let Some(last) = self.last_run else {
            return Some(0);
        };
        let next = last + u64::from(self.period_ms);
        Some(next.saturating_millis_since(now))
    }
}
