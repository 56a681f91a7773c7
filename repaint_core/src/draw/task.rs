// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw tasks and their descriptors.

use std::sync::Arc;

use crate::area::Area;
use crate::color::{BlendMode, Color32, Opa};

use super::id::{LayerId, TaskId};

/// Where a task is in its lifecycle.
///
/// ```text
///   Queued ──► InProgress ──► Ready ──► (removed)
///     ▲
///   Waiting   (layer composites until their source layer is complete)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Can be taken by a draw unit once it is independent.
    Queued,
    /// A layer composite whose source layer still has work outstanding.
    Waiting,
    /// Taken by a draw unit.
    InProgress,
    /// Finished; removed by the next dispatch.
    Ready,
}

/// Parameters of a layer composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// The layer being composited. Owned by the task: it is freed when the
    /// task is removed.
    pub source: LayerId,
    /// Area of the source layer in display coordinates.
    pub source_area: Area,
    /// Opacity.
    pub opa: Opa,
    /// Rotation in tenths of a degree, `0..3600`.
    pub angle: u16,
    /// Zoom with 256 meaning 100%.
    pub zoom: u16,
    /// Transform pivot relative to the source layer's top-left corner.
    pub pivot: (i32, i32),
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Whether transformed edges are smoothed.
    pub antialias: bool,
}

impl LayerDescriptor {
    /// Whether the composite rotates or scales.
    #[inline]
    #[must_use]
    pub const fn is_transformed(&self) -> bool {
        self.angle != 0 || self.zoom != 256
    }
}

/// What a task draws.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawDescriptor {
    /// A solid rectangle over the task area.
    Fill {
        /// Color.
        color: Color32,
        /// Opacity applied on top of the color's alpha.
        opa: Opa,
    },
    /// A bitmap whose top-left corner is at the task area's corner.
    Image {
        /// Row-major pixels.
        pixels: Arc<[Color32]>,
        /// Width and height of the bitmap.
        size: (u32, u32),
        /// Opacity.
        opa: Opa,
    },
    /// Clears everything outside a rounded rectangle.
    Mask {
        /// The rectangle kept.
        area: Area,
        /// Corner radius.
        radius: i32,
    },
    /// Composites another layer into this one.
    Layer(LayerDescriptor),
}

impl DrawDescriptor {
    /// The source layer of a composite.
    #[inline]
    #[must_use]
    pub fn source_layer(&self) -> Option<LayerId> {
        match self {
            Self::Layer(l) => Some(l.source),
            _ => None,
        }
    }
}

/// One entry in a layer's task list.
#[derive(Clone, Debug)]
pub(crate) struct DrawTask {
    pub(crate) id: TaskId,
    /// Area the task draws to.
    pub(crate) area: Area,
    /// Clip of the layer when the task was created.
    pub(crate) clip: Area,
    /// Pixels the task may write; used for the dependency check.
    pub(crate) bounds: Area,
    pub(crate) state: TaskState,
    pub(crate) descriptor: Arc<DrawDescriptor>,
}

impl DrawTask {
    /// Whether the task covers the whole screen.
    pub(crate) fn is_screen_sized(&self, screen: &Area) -> bool {
        screen.is_in(&self.area)
    }
}

/// Finds the first queued task that does not overlap an unfinished earlier
/// task.
///
/// While the head task is taken and spans the whole screen, nothing behind
/// it can be independent and `None` is returned straight away.
pub(crate) fn next_available(tasks: &[DrawTask], screen: &Area) -> Option<usize> {
    let head = tasks.first()?;
    if head.state != TaskState::Queued && head.is_screen_sized(screen) {
        return None;
    }
    tasks.iter().enumerate().position(|(i, t)| {
        t.state == TaskState::Queued
            && tasks[..i].iter().all(|earlier| {
                earlier.state == TaskState::Ready || !earlier.bounds.is_on(&t.bounds)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    fn task(id: u64, a: Area, state: TaskState) -> DrawTask {
        DrawTask {
            id: TaskId(id),
            area: a,
            clip: a,
            bounds: a,
            state,
            descriptor: Arc::new(DrawDescriptor::Fill {
                color: Color32::BLACK,
                opa: 255,
            }),
        }
    }

    const SCREEN: Area = Area {
        x1: 0,
        y1: 0,
        x2: 99,
        y2: 99,
    };

    #[test]
    fn overlapping_task_waits_for_earlier_one() {
        let tasks = [
            task(0, area(0, 0, 10, 10), TaskState::InProgress),
            task(1, area(5, 5, 15, 15), TaskState::Queued),
            task(2, area(50, 50, 60, 60), TaskState::Queued),
        ];
        assert_eq!(next_available(&tasks, &SCREEN), Some(2));
    }

    #[test]
    fn ready_tasks_do_not_block() {
        let tasks = [
            task(0, area(0, 0, 10, 10), TaskState::Ready),
            task(1, area(5, 5, 15, 15), TaskState::Queued),
        ];
        assert_eq!(next_available(&tasks, &SCREEN), Some(1));
    }

    #[test]
    fn waiting_composite_blocks_what_it_overlaps() {
        let tasks = [
            task(0, area(0, 0, 10, 10), TaskState::Waiting),
            task(1, area(0, 0, 3, 3), TaskState::Queued),
        ];
        assert_eq!(next_available(&tasks, &SCREEN), None);
    }

    #[test]
    fn screen_sized_head_blocks_everything() {
        let tasks = [
            task(0, SCREEN, TaskState::InProgress),
            task(1, area(200, 200, 210, 210), TaskState::Queued),
        ];
        assert_eq!(next_available(&tasks, &SCREEN), None);

        let queued_head = [
            task(0, SCREEN, TaskState::Queued),
            task(1, area(10, 10, 20, 20), TaskState::Queued),
        ];
        assert_eq!(next_available(&queued_head, &SCREEN), Some(0));
    }
}
